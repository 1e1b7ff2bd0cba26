//! Fetches daily minimum temperatures for a city, forecasts the next year and
//! plots history, forecast band and threshold with `plotlars`.
//!
//! To run this example:
//! cargo run --example graph_forecast --features examples

use std::error::Error;

use chrono::NaiveDate;
use heatpump_counter::{Dashboard, ForecastView, RollingWindow, Selection, TrendMode};
use plotlars::{Legend, Line, Plot, Rgb, Text, TimeSeriesPlot};
use polars::prelude::*;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    println!("Fetching temperatures from Open-Meteo...");

    let dashboard = Dashboard::new().await?;
    let selection = Selection::builder()
        .city("Minneapolis,Minnesota")
        .start(NaiveDate::from_ymd_opt(2019, 1, 1).unwrap())
        .end(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap())
        .trend(TrendMode::Linear)
        .plot_threshold(5)
        .rolling(vec![RollingWindow::Monthly])
        .build();
    let view = dashboard.render(&selection).await?;

    println!("Generating temperature plot...");
    plot_history(&view.plot.to_frame()?, selection.city());

    match &view.forecast {
        ForecastView::Ready { forecast, .. } => {
            let mut forecast_frame = forecast.to_frame()?;
            let threshold = vec![view.plot.threshold; forecast_frame.height()];
            forecast_frame.with_column(Column::new("threshold".into(), threshold))?;
            plot_forecast(&forecast_frame, selection.city());
        }
        other => println!("{}", other.message().unwrap_or_default()),
    }
    println!("Plots shown in browser.");

    Ok(())
}

fn plot_history(data: &DataFrame, city: &str) {
    let title = format!("Daily minimum temperature, {}", city);
    TimeSeriesPlot::builder()
        .data(data)
        .x("date")
        .y("tmin")
        .additional_series(vec!["monthly_avg", "threshold"])
        .colors(vec![Rgb(69, 157, 230), Rgb(235, 117, 0), Rgb(200, 0, 0)])
        .lines(vec![Line::Solid, Line::Solid, Line::Dash])
        .plot_title(Text::from(title.as_str()).size(18))
        .legend(&Legend::new().x(0.05).y(0.9))
        .x_title("date")
        .y_title("temperature")
        .build()
        .plot();
}

fn plot_forecast(data: &DataFrame, city: &str) {
    let title = format!("Forecast, {}", city);
    TimeSeriesPlot::builder()
        .data(data)
        .x("date")
        .y("yhat")
        .additional_series(vec!["yhat_lower", "yhat_upper", "threshold"])
        .colors(vec![
            Rgb(69, 157, 230),
            Rgb(160, 160, 160),
            Rgb(160, 160, 160),
            Rgb(200, 0, 0),
        ])
        .lines(vec![Line::Solid, Line::Dot, Line::Dot, Line::Dash])
        .plot_title(Text::from(title.as_str()).size(18))
        .legend(&Legend::new().x(0.05).y(0.9))
        .x_title("date")
        .y_title("temperature")
        .build()
        .plot();
}
