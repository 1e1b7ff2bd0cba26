//! Projects a daily minimum temperature series into the future.
//!
//! The model is deliberately simple: a flat or linear trend, a smoothed
//! day-of-year seasonal profile fitted on what the trend leaves over, and a
//! constant-width 80% band derived from the in-sample error. The output is a
//! plain [`TemperatureSeries`] away from the threshold aggregator.

pub mod error;
mod model;

use crate::forecast::error::{ForecastError, ParseTrendError};
use crate::forecast::model::{SeasonalProfile, Trend};
use crate::types::series::{unix_epoch, TemperaturePoint, TemperatureSeries};
use crate::types::unit::TemperatureUnit;
use chrono::{Duration, NaiveDate};
use log::debug;
use polars::prelude::*;
use std::fmt;
use std::str::FromStr;

/// A forecast needs at least this many days between first and last observation.
pub const MIN_HISTORY_DAYS: i64 = 365;
pub const MAX_HORIZON_YEARS: u32 = 5;
const DAYS_PER_YEAR: i64 = 365;
/// Two-sided 80% interval of a normal distribution.
const INTERVAL_Z: f64 = 1.281_551_565_544_600_4;

/// Growth assumption for the forecast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TrendMode {
    /// Constant level.
    #[default]
    Flat,
    /// Straight-line growth fitted by least squares.
    Linear,
}

impl fmt::Display for TrendMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrendMode::Flat => write!(f, "flat"),
            TrendMode::Linear => write!(f, "linear"),
        }
    }
}

impl FromStr for TrendMode {
    type Err = ParseTrendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "flat" => Ok(TrendMode::Flat),
            "linear" => Ok(TrendMode::Linear),
            _ => Err(ParseTrendError(s.to_string())),
        }
    }
}

/// Trend mode and horizon chosen by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForecastSettings {
    trend: TrendMode,
    years: u32,
}

impl ForecastSettings {
    /// Rejects horizons outside `1..=5` years.
    pub fn new(trend: TrendMode, years: u32) -> Result<Self, ForecastError> {
        if !(1..=MAX_HORIZON_YEARS).contains(&years) {
            return Err(ForecastError::InvalidHorizon {
                years,
                max: MAX_HORIZON_YEARS,
            });
        }
        Ok(Self { trend, years })
    }

    pub fn trend(&self) -> TrendMode {
        self.trend
    }

    pub fn years(&self) -> u32 {
        self.years
    }

    pub fn horizon_days(&self) -> i64 {
        DAYS_PER_YEAR * self.years as i64
    }
}

/// One forecast day: point estimate and the bounds of its 80% interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub predicted: f64,
    pub lower: f64,
    pub upper: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Forecast {
    unit: TemperatureUnit,
    settings: ForecastSettings,
    points: Vec<ForecastPoint>,
}

impl Forecast {
    pub fn unit(&self) -> TemperatureUnit {
        self.unit
    }

    pub fn settings(&self) -> ForecastSettings {
        self.settings
    }

    pub fn points(&self) -> &[ForecastPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The point estimates as a series, ready for [`crate::threshold_table`].
    pub fn predicted_series(&self) -> TemperatureSeries {
        self.series_of(|p| p.predicted)
    }

    pub fn lower_series(&self) -> TemperatureSeries {
        self.series_of(|p| p.lower)
    }

    pub fn upper_series(&self) -> TemperatureSeries {
        self.series_of(|p| p.upper)
    }

    fn series_of(&self, value: impl Fn(&ForecastPoint) -> f64) -> TemperatureSeries {
        TemperatureSeries::new(
            self.unit,
            self.points
                .iter()
                .map(|p| TemperaturePoint::new(p.date, value(p)))
                .collect(),
        )
    }

    /// Frame with `date`, `yhat`, `yhat_lower` and `yhat_upper` columns.
    pub fn to_frame(&self) -> PolarsResult<DataFrame> {
        let epoch = unix_epoch();
        let days: Vec<i32> = self
            .points
            .iter()
            .map(|p| (p.date - epoch).num_days() as i32)
            .collect();
        DataFrame::new(vec![
            Column::new("date".into(), days).cast(&DataType::Date)?,
            Column::new(
                "yhat".into(),
                self.points.iter().map(|p| p.predicted).collect::<Vec<_>>(),
            ),
            Column::new(
                "yhat_lower".into(),
                self.points.iter().map(|p| p.lower).collect::<Vec<_>>(),
            ),
            Column::new(
                "yhat_upper".into(),
                self.points.iter().map(|p| p.upper).collect::<Vec<_>>(),
            ),
        ])
    }
}

/// Fits the model on `history` and predicts `settings.years() * 365` days
/// starting the day after the last observation.
///
/// NaN observations are ignored.
///
/// # Errors
///
/// [`ForecastError::InsufficientHistory`] when the usable observations span
/// fewer than [`MIN_HISTORY_DAYS`] days.
pub fn forecast(
    history: &TemperatureSeries,
    settings: ForecastSettings,
) -> Result<Forecast, ForecastError> {
    let observed: Vec<&TemperaturePoint> =
        history.points().iter().filter(|p| p.value.is_finite()).collect();
    let (first, last) = match (observed.first(), observed.last()) {
        (Some(first), Some(last)) => (first.date, last.date),
        _ => {
            return Err(ForecastError::InsufficientHistory {
                days: 0,
                required: MIN_HISTORY_DAYS,
            })
        }
    };
    let span = (last - first).num_days();
    if span < MIN_HISTORY_DAYS {
        return Err(ForecastError::InsufficientHistory {
            days: span,
            required: MIN_HISTORY_DAYS,
        });
    }

    let days_since = |date: NaiveDate| (date - first).num_days() as f64;
    let dates: Vec<NaiveDate> = observed.iter().map(|p| p.date).collect();
    let values: Vec<f64> = observed.iter().map(|p| p.value).collect();
    let t: Vec<f64> = dates.iter().map(|d| days_since(*d)).collect();

    let trend = Trend::fit(settings.trend, &t, &values);
    let detrended: Vec<f64> = values
        .iter()
        .zip(&t)
        .map(|(v, t)| v - trend.at(*t))
        .collect();
    let season = SeasonalProfile::fit(&dates, &detrended);

    let squared_error: f64 = detrended
        .iter()
        .zip(&dates)
        .map(|(r, d)| (r - season.at(*d)).powi(2))
        .sum();
    let sigma = (squared_error / (values.len() - 1).max(1) as f64).sqrt();
    let half_band = INTERVAL_Z * sigma;
    debug!(
        "Fitted {} trend (level {:.3}, slope {:.5}/day), residual sigma {:.3}",
        settings.trend, trend.level, trend.slope, sigma
    );

    let points = (1..=settings.horizon_days())
        .map(|offset| {
            let date = last + Duration::days(offset);
            let predicted = trend.at(days_since(date)) + season.at(date);
            ForecastPoint {
                date,
                predicted,
                lower: predicted - half_band,
                upper: predicted + half_band,
            }
        })
        .collect();

    Ok(Forecast {
        unit: history.unit(),
        settings,
        points,
    })
}
