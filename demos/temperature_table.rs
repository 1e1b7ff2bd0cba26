//! Prints the "days below threshold" tables for a city.
//!
//! To run this example:
//! cargo run --example temperature_table -- "Fargo,North Dakota" celsius

use std::error::Error;

use chrono::NaiveDate;
use heatpump_counter::{
    Dashboard, ForecastView, RollingWindow, Selection, TableView, TemperatureUnit, DEFAULT_CITY,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let mut args = std::env::args().skip(1);
    let city = args.next().unwrap_or_else(|| DEFAULT_CITY.to_string());
    let unit: TemperatureUnit = match args.next() {
        Some(unit) => unit.parse()?,
        None => TemperatureUnit::Fahrenheit,
    };

    // 1. Create a dashboard with the default cache directory and bundled cities
    let dashboard = Dashboard::new().await?;

    // 2. Describe what to show
    let selection = Selection::builder()
        .city(city)
        .start(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap())
        .end(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap())
        .unit(unit)
        .forecast_years(2)
        .rolling(vec![RollingWindow::Monthly])
        .build();

    // 3. Render every view at once
    let view = dashboard.render(&selection).await?;
    println!(
        "{} ({:.4}, {:.4}): {} days of data",
        selection.city(),
        view.location.0,
        view.location.1,
        view.series.len()
    );

    match &view.historical {
        TableView::Ready(table) => println!("Historical\n{}", table.to_frame()?),
        TableView::NoData => println!("No historical data for the selected range."),
    }

    println!(
        "{} days below {}{}",
        view.plot.days_below_threshold(),
        view.plot.threshold,
        unit.symbol()
    );
    println!("{}", view.plot.to_frame()?.tail(Some(5)));

    match &view.forecast {
        ForecastView::Ready { forecast, table } => {
            println!(
                "Forecast ({} trend, {} years)\n{}",
                forecast.settings().trend(),
                forecast.settings().years(),
                table.to_frame()?
            );
        }
        other => println!("{}", other.message().unwrap_or_default()),
    }

    Ok(())
}
