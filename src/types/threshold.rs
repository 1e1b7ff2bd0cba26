//! Threshold ranges and the "days below" summary table.

use crate::aggregate::error::AggregateError;
use polars::prelude::*;
use std::ops::RangeInclusive;

/// An inclusive span of integer thresholds, `low <= high`.
///
/// Both ends may be negative. The invariant is checked on construction, so an
/// inverted range can never reach the aggregator.
///
/// # Examples
///
/// ```
/// use heatpump_counter::ThresholdRange;
///
/// let range = ThresholdRange::new(0, 15).unwrap();
/// assert_eq!(range.len(), 16);
/// assert!(ThresholdRange::new(15, 0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ThresholdRange {
    low: i32,
    high: i32,
}

impl ThresholdRange {
    /// Creates a range, rejecting `low > high` with [`AggregateError::InvalidRange`].
    pub fn new(low: i32, high: i32) -> Result<Self, AggregateError> {
        if low > high {
            return Err(AggregateError::InvalidRange { low, high });
        }
        Ok(Self { low, high })
    }

    /// Creates a range from the two handles of a two-ended slider, in either order.
    pub fn spanning(a: i32, b: i32) -> Self {
        Self {
            low: a.min(b),
            high: a.max(b),
        }
    }

    pub fn low(&self) -> i32 {
        self.low
    }

    pub fn high(&self) -> i32 {
        self.high
    }

    /// Number of integer thresholds in the range.
    pub fn len(&self) -> usize {
        (self.high as i64 - self.low as i64 + 1) as usize
    }

    /// Always `false`; a valid range holds at least one threshold.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Thresholds from `high` down to `low`, the order rows are presented in.
    pub fn descending(&self) -> impl Iterator<Item = i32> {
        (self.low..=self.high).rev()
    }
}

impl TryFrom<RangeInclusive<i32>> for ThresholdRange {
    type Error = AggregateError;

    fn try_from(range: RangeInclusive<i32>) -> Result<Self, Self::Error> {
        ThresholdRange::new(*range.start(), *range.end())
    }
}

/// One row of a [`ThresholdTable`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdRow {
    pub threshold: i32,
    /// Number of days whose value is strictly below `threshold`.
    pub days_below: usize,
    /// `days_below / total`, rounded to 3 decimals.
    pub proportion_below: f64,
}

/// Rows ordered by threshold, highest first.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdTable {
    pub rows: Vec<ThresholdRow>,
    /// Number of points the proportions were computed against.
    pub total_days: usize,
}

impl ThresholdTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ThresholdRow> {
        self.rows.iter()
    }

    /// Looks up the row for a specific threshold.
    pub fn row(&self, threshold: i32) -> Option<&ThresholdRow> {
        self.rows.iter().find(|row| row.threshold == threshold)
    }

    /// Converts the table into a polars `DataFrame` with the columns
    /// `threshold`, `days_below` and `proportion_below`.
    pub fn to_frame(&self) -> PolarsResult<DataFrame> {
        let thresholds: Vec<i32> = self.rows.iter().map(|r| r.threshold).collect();
        let days: Vec<u32> = self.rows.iter().map(|r| r.days_below as u32).collect();
        let proportions: Vec<f64> = self.rows.iter().map(|r| r.proportion_below).collect();
        DataFrame::new(vec![
            Column::new("threshold".into(), thresholds),
            Column::new("days_below".into(), days),
            Column::new("proportion_below".into(), proportions),
        ])
    }
}

impl<'a> IntoIterator for &'a ThresholdTable {
    type Item = &'a ThresholdRow;
    type IntoIter = std::slice::Iter<'a, ThresholdRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
