use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LocationError {
    #[error("Failed to read city table '{0}'")]
    CsvRead(PathBuf, #[source] PolarsError),

    #[error("Failed to create city table '{0}'")]
    CsvCreate(PathBuf, #[source] std::io::Error),

    #[error("Failed to write city table '{0}'")]
    CsvWrite(PathBuf, #[source] PolarsError),

    #[error("Required column '{0}' not found or has the wrong type")]
    ColumnNotFound(String, #[source] PolarsError),

    #[error("Failed processing DataFrame: {0}")]
    DataFrameProcessing(#[from] PolarsError),

    #[error("City table contains no usable rows")]
    Empty,
}
