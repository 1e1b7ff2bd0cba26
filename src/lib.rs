mod aggregate;
mod dashboard;
mod error;
mod forecast;
mod locations;
mod rolling;
mod selection;
mod types;
mod utils;
mod weather_data;

pub use dashboard::*;
pub use error::CounterError;
pub use selection::{Selection, DEFAULT_CITY};

pub use aggregate::error::AggregateError;
pub use aggregate::threshold_table;
pub use rolling::{trailing_mean, RollingWindow};

pub use types::series::{TemperaturePoint, TemperatureSeries};
pub use types::threshold::{ThresholdRange, ThresholdRow, ThresholdTable};
pub use types::unit::{ParseUnitError, TemperatureUnit, ThresholdBounds};

pub use forecast::error::{ForecastError, ParseTrendError};
pub use forecast::{
    forecast, Forecast, ForecastPoint, ForecastSettings, TrendMode, MAX_HORIZON_YEARS,
    MIN_HISTORY_DAYS,
};

pub use locations::directory::{prepare_city_table, City, LocationDirectory};
pub use locations::error::LocationError;

pub use weather_data::data_loader::{ArchiveLoader, RetryPolicy};
pub use weather_data::error::WeatherDataError;
pub use weather_data::fetcher::{ArchiveFetcher, DEFAULT_MEMORY_CAPACITY};
pub use weather_data::source::{SeriesRequest, TemperatureSource};
