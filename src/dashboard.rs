//! The dashboard's recomputation chain: a [`Selection`] goes in, every table
//! and plot the page shows comes out.
//!
//! Views are recomputed from scratch on each call to [`Dashboard::render`];
//! the only state carried between calls is the series cache inside the
//! [`TemperatureSource`].

use crate::aggregate::error::AggregateError;
use crate::aggregate::threshold_table;
use crate::error::CounterError;
use crate::forecast::error::ForecastError;
use crate::forecast::{forecast, Forecast};
use crate::locations::directory::LocationDirectory;
use crate::rolling::RollingWindow;
use crate::selection::Selection;
use crate::types::series::TemperatureSeries;
use crate::types::threshold::{ThresholdRange, ThresholdTable};
use crate::utils::{ensure_cache_dir_exists, get_cache_dir};
use crate::weather_data::data_loader::RetryPolicy;
use crate::weather_data::fetcher::ArchiveFetcher;
use crate::weather_data::source::TemperatureSource;
use bon::bon;
use log::{debug, info};
use polars::prelude::*;
use std::path::PathBuf;

/// Represents a geographical coordinate using latitude and longitude.
///
/// Latitude is the first element (index 0), and longitude is the second (index 1).
///
/// # Examples
///
/// ```
/// use heatpump_counter::LatLon;
///
/// let fargo = LatLon(46.8651, -96.8292);
/// assert_eq!(fargo.0, 46.8651); // Latitude
/// assert_eq!(fargo.1, -96.8292); // Longitude
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLon(pub f64, pub f64);

/// A "days below threshold" table, or the explicit absence of one.
#[derive(Debug, Clone, PartialEq)]
pub enum TableView {
    Ready(ThresholdTable),
    /// The series had no points for the selected range.
    NoData,
}

impl TableView {
    fn build(series: &TemperatureSeries, range: ThresholdRange) -> Result<Self, CounterError> {
        match threshold_table(series, range) {
            Ok(table) => Ok(TableView::Ready(table)),
            Err(AggregateError::EmptySeries) => Ok(TableView::NoData),
            Err(e) => Err(e.into()),
        }
    }

    pub fn table(&self) -> Option<&ThresholdTable> {
        match self {
            TableView::Ready(table) => Some(table),
            TableView::NoData => None,
        }
    }
}

/// Forecast panel: the projection and its table, or why there is none.
#[derive(Debug, Clone, PartialEq)]
pub enum ForecastView {
    Ready {
        forecast: Forecast,
        /// Aggregated over the predicted values.
        table: ThresholdTable,
    },
    /// The selected range covers fewer than a year of days.
    InsufficientHistory { days: i64 },
    NoData,
}

impl ForecastView {
    /// Text shown in place of the forecast, if any.
    pub fn message(&self) -> Option<String> {
        match self {
            ForecastView::Ready { .. } => None,
            ForecastView::InsufficientHistory { days } => Some(format!(
                "Insufficient data for forecast: the selected range covers {} days, \
                 at least 365 are needed.",
                days
            )),
            ForecastView::NoData => Some("No data for the selected range.".to_string()),
        }
    }
}

/// What the time-series plot draws: the raw series, a horizontal threshold
/// line and any requested rolling averages.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotData {
    pub series: TemperatureSeries,
    pub threshold: i32,
    pub rolling: Vec<(RollingWindow, Vec<Option<f64>>)>,
}

impl PlotData {
    pub fn new(series: TemperatureSeries, threshold: i32, windows: &[RollingWindow]) -> Self {
        let rolling = windows
            .iter()
            .map(|w| (*w, series.rolling_average(*w)))
            .collect();
        Self {
            series,
            threshold,
            rolling,
        }
    }

    /// Days strictly below the plotted threshold.
    pub fn days_below_threshold(&self) -> usize {
        let threshold = self.threshold as f64;
        self.series.values().filter(|v| *v < threshold).count()
    }

    /// Frame with `date`, `tmin`, `threshold` and one column per rolling average.
    pub fn to_frame(&self) -> PolarsResult<DataFrame> {
        let mut df = self.series.to_frame()?;
        df.with_column(Column::new(
            "threshold".into(),
            vec![self.threshold; self.series.len()],
        ))?;
        for (window, values) in &self.rolling {
            df.with_column(Column::new(window.column_name().into(), values.clone()))?;
        }
        Ok(df)
    }
}

/// Everything derived from one [`Selection`].
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardView {
    pub location: LatLon,
    pub series: TemperatureSeries,
    pub historical: TableView,
    pub plot: PlotData,
    pub forecast: ForecastView,
}

/// Ties a [`TemperatureSource`] and a [`LocationDirectory`] together.
///
/// # Examples
///
/// ```rust,no_run
/// # use heatpump_counter::{CounterError, Dashboard, Selection};
/// # #[tokio::main]
/// # async fn main() -> Result<(), CounterError> {
/// let dashboard = Dashboard::new().await?;
/// let view = dashboard.render(&Selection::builder().build()).await?;
/// if let Some(table) = view.historical.table() {
///     println!("{}", table.to_frame()?);
/// }
/// # Ok(())
/// # }
/// ```
pub struct Dashboard<S = ArchiveFetcher> {
    source: S,
    locations: LocationDirectory,
}

#[bon]
impl Dashboard<ArchiveFetcher> {
    /// Creates a dashboard backed by the Open-Meteo archive, with every option spelled out.
    ///
    /// * `.cache_folder(PathBuf)`: where parquet files are cached. Defaults to the
    ///   system cache directory.
    /// * `.retry_policy(RetryPolicy)`: defaults to 5 retries with a 0.2s backoff factor.
    /// * `.cities_csv(PathBuf)`: a `city_state,lat,lng` file replacing the bundled cities.
    ///
    /// # Errors
    ///
    /// [`CounterError::CacheDirResolution`] / [`CounterError::CacheDirCreation`] when
    /// the cache directory is unusable, [`CounterError::Location`] when the city table
    /// cannot be loaded.
    #[builder]
    pub async fn configure(
        cache_folder: Option<PathBuf>,
        retry_policy: Option<RetryPolicy>,
        cities_csv: Option<PathBuf>,
    ) -> Result<Self, CounterError> {
        let cache_folder = match cache_folder {
            Some(folder) => folder,
            None => get_cache_dir().map_err(CounterError::CacheDirResolution)?,
        };
        ensure_cache_dir_exists(&cache_folder)
            .await
            .map_err(|e| CounterError::CacheDirCreation(cache_folder.clone(), e))?;

        let locations = match cities_csv {
            Some(path) => LocationDirectory::from_csv_path(&path)?,
            None => LocationDirectory::bundled()?,
        };
        let fetcher =
            ArchiveFetcher::with_retry_policy(&cache_folder, retry_policy.unwrap_or_default());
        info!(
            "Dashboard ready with {} cities, caching in {}",
            locations.len(),
            cache_folder.display()
        );
        Ok(Self::with_source(fetcher, locations))
    }

    /// Default cache directory, default retry policy, bundled cities.
    pub async fn new() -> Result<Self, CounterError> {
        Self::configure().call().await
    }

    pub async fn with_cache_folder(cache_folder: PathBuf) -> Result<Self, CounterError> {
        Self::configure().cache_folder(cache_folder).call().await
    }
}

impl<S: TemperatureSource> Dashboard<S> {
    pub fn with_source(source: S, locations: LocationDirectory) -> Self {
        Self { source, locations }
    }

    pub fn locations(&self) -> &LocationDirectory {
        &self.locations
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Resolves the selected city and fetches its series for the selected range and unit.
    pub async fn fetch_series(
        &self,
        selection: &Selection,
    ) -> Result<(LatLon, TemperatureSeries), CounterError> {
        let location = self
            .locations
            .lookup(selection.city())
            .ok_or_else(|| CounterError::UnknownCity(selection.city().to_string()))?;
        let request = selection.series_request(location)?;
        let series = self.source.daily_minimum(&request).await?;
        debug!(
            "Fetched {} days for {} ({} to {})",
            series.len(),
            selection.city(),
            selection.start(),
            selection.end()
        );
        Ok((location, series))
    }

    /// Recomputes every view for `selection`.
    ///
    /// An empty series is not an error: tables come back as `NoData`. A range
    /// shorter than a year yields [`ForecastView::InsufficientHistory`].
    ///
    /// # Errors
    ///
    /// [`CounterError::UnknownCity`] for a city missing from the directory,
    /// [`CounterError::Forecast`] for an invalid horizon and
    /// [`CounterError::WeatherData`] for invalid dates or when the series cannot
    /// be fetched. A failed fetch leaves nothing half-updated; render again to retry.
    pub async fn render(&self, selection: &Selection) -> Result<DashboardView, CounterError> {
        let settings = selection.forecast_settings()?;
        let (location, series) = self.fetch_series(selection).await?;

        let historical = TableView::build(&series, selection.table_range())?;
        let plot = PlotData::new(
            series.clone(),
            selection.plot_threshold(),
            selection.rolling(),
        );

        let forecast = if series.is_empty() {
            ForecastView::NoData
        } else if !selection.has_forecast_history() {
            info!(
                "Skipping forecast for {}: {} days selected",
                selection.city(),
                selection.span_days()
            );
            ForecastView::InsufficientHistory {
                days: selection.span_days(),
            }
        } else {
            match forecast(&series, settings) {
                Ok(forecast) => {
                    let table =
                        threshold_table(&forecast.predicted_series(), selection.table_range())?;
                    ForecastView::Ready { forecast, table }
                }
                // Observations with gaps may cover less than the selected range.
                Err(ForecastError::InsufficientHistory { days, .. }) => {
                    ForecastView::InsufficientHistory { days }
                }
                Err(e) => return Err(e.into()),
            }
        };

        Ok(DashboardView {
            location,
            series,
            historical,
            plot,
            forecast,
        })
    }
}
