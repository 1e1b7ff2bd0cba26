//! Turns a temperature series into a "days below threshold" table.
//!
//! The same routine is used for observed and forecast series. It never looks at
//! the series' unit: thresholds are compared against the values as they are.

pub mod error;

use crate::aggregate::error::AggregateError;
use crate::types::series::TemperatureSeries;
use crate::types::threshold::{ThresholdRange, ThresholdRow, ThresholdTable};

/// Counts, for every integer threshold in `range`, how many points of `series`
/// are strictly below it and which share of the series that is.
///
/// Rows are returned from `range.high()` down to `range.low()`. Proportions are
/// rounded to three decimals. A value equal to a threshold is not below it, and
/// NaN values are never below anything.
///
/// # Errors
///
/// Returns [`AggregateError::EmptySeries`] when `series` has no points.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use heatpump_counter::{threshold_table, TemperaturePoint, TemperatureSeries, TemperatureUnit, ThresholdRange};
///
/// let day = |d| NaiveDate::from_ymd_opt(2024, 1, d).unwrap();
/// let series = TemperatureSeries::new(
///     TemperatureUnit::Fahrenheit,
///     vec![
///         TemperaturePoint::new(day(1), 5.0),
///         TemperaturePoint::new(day(2), 10.0),
///         TemperaturePoint::new(day(3), 15.0),
///     ],
/// );
/// let table = threshold_table(&series, ThresholdRange::new(5, 15).unwrap()).unwrap();
///
/// assert_eq!(table.rows[0].threshold, 15);
/// assert_eq!(table.rows[0].days_below, 2);
/// assert_eq!(table.rows[0].proportion_below, 0.667);
/// ```
pub fn threshold_table(
    series: &TemperatureSeries,
    range: ThresholdRange,
) -> Result<ThresholdTable, AggregateError> {
    let total_days = series.len();
    if total_days == 0 {
        return Err(AggregateError::EmptySeries);
    }

    let mut sorted: Vec<f64> = series.values().filter(|v| !v.is_nan()).collect();
    sorted.sort_by(f64::total_cmp);

    let rows = range
        .descending()
        .map(|threshold| {
            let limit = threshold as f64;
            let days_below = sorted.partition_point(|v| *v < limit);
            ThresholdRow {
                threshold,
                days_below,
                proportion_below: round3(days_below as f64 / total_days as f64),
            }
        })
        .collect();

    Ok(ThresholdTable { rows, total_days })
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::series::TemperaturePoint;
    use crate::types::unit::TemperatureUnit;
    use chrono::NaiveDate;

    fn series_of(values: &[f64]) -> TemperatureSeries {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let points = values
            .iter()
            .enumerate()
            .map(|(i, v)| TemperaturePoint::new(start + chrono::Duration::days(i as i64), *v))
            .collect();
        TemperatureSeries::new(TemperatureUnit::Fahrenheit, points)
    }

    fn range(low: i32, high: i32) -> ThresholdRange {
        ThresholdRange::new(low, high).unwrap()
    }

    #[test]
    fn test_three_point_scenario() {
        let table = threshold_table(&series_of(&[5.0, 10.0, 15.0]), range(5, 15)).unwrap();

        let rows: Vec<(i32, usize, f64)> = table
            .iter()
            .map(|r| (r.threshold, r.days_below, r.proportion_below))
            .collect();
        let mut expected = Vec::new();
        for t in (11..=15).rev() {
            expected.push((t, 2, 0.667));
        }
        for t in (6..=10).rev() {
            expected.push((t, 1, 0.333));
        }
        expected.push((5, 0, 0.0));
        assert_eq!(rows, expected);
        assert_eq!(table.total_days, 3);
    }

    #[test]
    fn test_empty_series_is_an_explicit_error() {
        let result = threshold_table(&series_of(&[]), range(0, 5));
        assert_eq!(result, Err(AggregateError::EmptySeries));
    }

    #[test]
    fn test_value_equal_to_threshold_is_not_below() {
        let table = threshold_table(&series_of(&[3.0, 3.0, 2.999]), range(3, 3)).unwrap();
        assert_eq!(table.rows[0].days_below, 1);
    }

    #[test]
    fn test_row_count_and_order() {
        let series = series_of(&[-12.3, 0.5, 7.7, 31.0]);
        for (low, high) in [(-25, 60), (0, 0), (-3, -1), (10, 11)] {
            let table = threshold_table(&series, range(low, high)).unwrap();
            assert_eq!(table.len(), (high - low + 1) as usize);
            assert_eq!(table.rows.first().unwrap().threshold, high);
            assert_eq!(table.rows.last().unwrap().threshold, low);
            assert!(table.rows.windows(2).all(|w| w[0].threshold > w[1].threshold));
        }
    }

    #[test]
    fn test_days_below_is_monotonic_in_threshold() {
        let series = series_of(&[14.2, -3.0, 8.9, 8.9, 22.1, -0.5, 15.0, 3.3, 9.0]);
        let table = threshold_table(&series, range(-10, 30)).unwrap();
        // rows are descending, so counts must be non-increasing down the table
        assert!(table.rows.windows(2).all(|w| w[0].days_below >= w[1].days_below));
        assert_eq!(table.row(30).unwrap().days_below, series.len());
        assert_eq!(table.row(-10).unwrap().days_below, 0);
    }

    #[test]
    fn test_matches_naive_count() {
        let values = [1.5, -7.25, 0.0, 0.0, 4.999, 5.0, 12.75, -0.001];
        let series = series_of(&values);
        let table = threshold_table(&series, range(-8, 13)).unwrap();
        for row in &table {
            let expected = values.iter().filter(|v| **v < row.threshold as f64).count();
            assert_eq!(row.days_below, expected, "threshold {}", row.threshold);
        }
    }

    #[test]
    fn test_is_deterministic() {
        let series = series_of(&[3.2, 9.9, -1.0, 4.4]);
        let first = threshold_table(&series, range(-2, 10)).unwrap();
        let second = threshold_table(&series, range(-2, 10)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_unsorted_input_gives_same_counts() {
        let sorted = threshold_table(&series_of(&[1.0, 2.0, 3.0]), range(0, 4)).unwrap();
        let shuffled = threshold_table(&series_of(&[3.0, 1.0, 2.0]), range(0, 4)).unwrap();
        assert_eq!(sorted.rows, shuffled.rows);
    }

    #[test]
    fn test_nan_counts_toward_total_but_never_below() {
        let table = threshold_table(&series_of(&[f64::NAN, 1.0]), range(2, 2)).unwrap();
        assert_eq!(table.rows[0].days_below, 1);
        assert_eq!(table.rows[0].proportion_below, 0.5);
    }

    #[test]
    fn test_proportion_rounding() {
        let table = threshold_table(&series_of(&[0.0; 7]), range(1, 1)).unwrap();
        assert_eq!(table.rows[0].proportion_below, 1.0);

        let mut values = vec![10.0; 6];
        values.push(0.0);
        let table = threshold_table(&series_of(&values), range(1, 1)).unwrap();
        assert_eq!(table.rows[0].proportion_below, 0.143);
    }
}
