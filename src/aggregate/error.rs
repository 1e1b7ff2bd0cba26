use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregateError {
    /// The series has no points, so no proportion can be computed.
    #[error("Insufficient data: the temperature series is empty")]
    EmptySeries,

    #[error("Invalid threshold range: low ({low}) is greater than high ({high})")]
    InvalidRange { low: i32, high: i32 },
}
