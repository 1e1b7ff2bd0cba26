use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ForecastError {
    /// Forecasting needs at least a year of history to see a full seasonal cycle.
    #[error("Insufficient history for a forecast: {days} days of data, at least {required} needed")]
    InsufficientHistory { days: i64, required: i64 },

    #[error("Forecast horizon must be between 1 and {max} years, got {years}")]
    InvalidHorizon { years: u32, max: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown trend '{0}', expected 'flat' or 'linear'")]
pub struct ParseTrendError(pub String);
