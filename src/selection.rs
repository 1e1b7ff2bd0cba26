//! The user's current choices, passed explicitly to every derived view.

use crate::forecast::error::ForecastError;
use crate::forecast::{ForecastSettings, TrendMode, MIN_HISTORY_DAYS};
use crate::rolling::RollingWindow;
use crate::types::threshold::ThresholdRange;
use crate::types::unit::TemperatureUnit;
use crate::weather_data::error::WeatherDataError;
use crate::weather_data::source::SeriesRequest;
use crate::LatLon;
use bon::Builder;
use chrono::{Local, NaiveDate};

pub const DEFAULT_CITY: &str = "New York,New York";

fn default_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default()
}

/// Everything the dashboard needs to render: city, date range, unit, forecast
/// controls, thresholds and plot options.
///
/// Thresholds left unset fall back to the defaults of the selected unit
/// (see [`TemperatureUnit::bounds`]).
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use heatpump_counter::{Selection, TemperatureUnit};
///
/// let selection = Selection::builder()
///     .city("Fargo,North Dakota")
///     .start(NaiveDate::from_ymd_opt(2022, 1, 1).unwrap())
///     .end(NaiveDate::from_ymd_opt(2023, 12, 31).unwrap())
///     .build();
///
/// assert_eq!(selection.unit(), TemperatureUnit::Fahrenheit);
/// assert_eq!(selection.plot_threshold(), 5);
/// assert!(selection.has_forecast_history());
/// ```
#[derive(Debug, Clone, PartialEq, Builder)]
pub struct Selection {
    #[builder(into, default = DEFAULT_CITY.to_string())]
    city: String,
    #[builder(default = default_start())]
    start: NaiveDate,
    #[builder(default = Local::now().date_naive())]
    end: NaiveDate,
    #[builder(default)]
    unit: TemperatureUnit,
    #[builder(default = 1)]
    forecast_years: u32,
    #[builder(default)]
    trend: TrendMode,
    plot_threshold: Option<i32>,
    table_range: Option<ThresholdRange>,
    #[builder(default)]
    rolling: Vec<RollingWindow>,
}

impl Selection {
    pub fn city(&self) -> &str {
        &self.city
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn unit(&self) -> TemperatureUnit {
        self.unit
    }

    pub fn trend(&self) -> TrendMode {
        self.trend
    }

    pub fn forecast_years(&self) -> u32 {
        self.forecast_years
    }

    pub fn rolling(&self) -> &[RollingWindow] {
        &self.rolling
    }

    /// Threshold drawn on the plot, clamped to the unit's slider limits.
    pub fn plot_threshold(&self) -> i32 {
        let bounds = self.unit.bounds();
        bounds.clamp_plot(self.plot_threshold.unwrap_or(bounds.default_plot))
    }

    /// Thresholds tabulated, clamped to the unit's slider limits.
    pub fn table_range(&self) -> ThresholdRange {
        let bounds = self.unit.bounds();
        bounds.clamp_table(self.table_range.unwrap_or_else(|| bounds.default_range()))
    }

    /// Days between the selected start and end date.
    pub fn span_days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    /// Whether the selected range is long enough to show a forecast.
    pub fn has_forecast_history(&self) -> bool {
        self.span_days() >= MIN_HISTORY_DAYS
    }

    pub fn forecast_settings(&self) -> Result<ForecastSettings, ForecastError> {
        ForecastSettings::new(self.trend, self.forecast_years)
    }

    pub fn series_request(&self, location: LatLon) -> Result<SeriesRequest, WeatherDataError> {
        SeriesRequest::new(location, self.start, self.end, self.unit)
    }

    /// The same selection in another unit.
    ///
    /// Thresholds the user picked are converted and clamped to the new unit's
    /// limits; thresholds left at their default stay at the default.
    pub fn switch_unit(&self, unit: TemperatureUnit) -> Selection {
        let bounds = unit.bounds();
        let convert = |t: i32| self.unit.convert(t as f64, unit).round() as i32;
        Selection {
            unit,
            plot_threshold: self.plot_threshold.map(|t| bounds.clamp_plot(convert(t))),
            table_range: self.table_range.map(|r| {
                bounds.clamp_table(ThresholdRange::spanning(convert(r.low()), convert(r.high())))
            }),
            ..self.clone()
        }
    }
}
