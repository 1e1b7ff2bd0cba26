//! Daily minimum temperature series.

use crate::rolling::{trailing_mean, RollingWindow};
use crate::types::unit::TemperatureUnit;
use chrono::NaiveDate;
use polars::prelude::*;

/// Column names used when a series is turned into a `DataFrame`.
pub(crate) const DATE_COLUMN: &str = "date";
pub(crate) const VALUE_COLUMN: &str = "tmin";

/// The minimum recorded (or forecast) temperature for one date.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemperaturePoint {
    pub date: NaiveDate,
    pub value: f64,
}

impl TemperaturePoint {
    pub fn new(date: NaiveDate, value: f64) -> Self {
        Self { date, value }
    }
}

/// A time-ordered sequence of daily temperatures in a single unit.
///
/// A series is produced fresh for every request and never edited in place;
/// conversions such as [`TemperatureSeries::to_unit`] return a new series.
#[derive(Debug, Clone, PartialEq)]
pub struct TemperatureSeries {
    unit: TemperatureUnit,
    points: Vec<TemperaturePoint>,
}

impl TemperatureSeries {
    /// Builds a series, sorting the points by date.
    pub fn new(unit: TemperatureUnit, mut points: Vec<TemperaturePoint>) -> Self {
        points.sort_by_key(|p| p.date);
        Self { unit, points }
    }

    pub fn empty(unit: TemperatureUnit) -> Self {
        Self {
            unit,
            points: Vec::new(),
        }
    }

    /// Builds a series from parallel date/value columns, dropping days whose value is missing.
    pub fn from_columns(
        unit: TemperatureUnit,
        dates: impl IntoIterator<Item = NaiveDate>,
        values: impl IntoIterator<Item = Option<f64>>,
    ) -> Self {
        let points = dates
            .into_iter()
            .zip(values)
            .filter_map(|(date, value)| value.map(|v| TemperaturePoint::new(date, v)))
            .collect();
        Self::new(unit, points)
    }

    pub fn unit(&self) -> TemperatureUnit {
        self.unit
    }

    pub fn points(&self) -> &[TemperaturePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|p| p.value)
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.points.iter().map(|p| p.date)
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }

    /// Number of days between the first and the last point, `0` for fewer than two points.
    pub fn span_days(&self) -> i64 {
        match (self.first_date(), self.last_date()) {
            (Some(first), Some(last)) => (last - first).num_days(),
            _ => 0,
        }
    }

    /// Returns the series expressed in another unit.
    pub fn to_unit(&self, unit: TemperatureUnit) -> TemperatureSeries {
        let points = self
            .points
            .iter()
            .map(|p| TemperaturePoint::new(p.date, self.unit.convert(p.value, unit)))
            .collect();
        TemperatureSeries { unit, points }
    }

    /// Trailing moving average over the series, aligned with [`TemperatureSeries::points`].
    pub fn rolling_average(&self, window: RollingWindow) -> Vec<Option<f64>> {
        let values: Vec<f64> = self.values().collect();
        trailing_mean(&values, window.size())
    }

    /// Converts the series into a `DataFrame` with a `date` (Date) and `tmin` (f64) column.
    pub fn to_frame(&self) -> PolarsResult<DataFrame> {
        let epoch = unix_epoch();
        let days: Vec<i32> = self
            .points
            .iter()
            .map(|p| (p.date - epoch).num_days() as i32)
            .collect();
        let values: Vec<f64> = self.values().collect();
        DataFrame::new(vec![
            Column::new(DATE_COLUMN.into(), days).cast(&DataType::Date)?,
            Column::new(VALUE_COLUMN.into(), values),
        ])
    }

    /// Reads a series back from a frame produced by [`TemperatureSeries::to_frame`].
    ///
    /// Null values are skipped.
    pub fn from_frame(unit: TemperatureUnit, df: &DataFrame) -> PolarsResult<Self> {
        let epoch = unix_epoch();
        let dates = df.column(DATE_COLUMN)?.cast(&DataType::Int32)?;
        let values = df.column(VALUE_COLUMN)?.cast(&DataType::Float64)?;
        let points = dates
            .i32()?
            .into_iter()
            .zip(values.f64()?)
            .filter_map(|(day, value)| match (day, value) {
                (Some(day), Some(value)) => Some(TemperaturePoint::new(
                    epoch + chrono::Duration::days(day as i64),
                    value,
                )),
                _ => None,
            })
            .collect();
        Ok(Self::new(unit, points))
    }
}

/// `NaiveDate::default()` is 1970-01-01, the origin of polars' Date type.
pub(crate) fn unix_epoch() -> NaiveDate {
    NaiveDate::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_new_sorts_by_date() {
        let series = TemperatureSeries::new(
            TemperatureUnit::Celsius,
            vec![
                TemperaturePoint::new(date(2024, 1, 3), 3.0),
                TemperaturePoint::new(date(2024, 1, 1), 1.0),
                TemperaturePoint::new(date(2024, 1, 2), 2.0),
            ],
        );
        assert_eq!(series.values().collect::<Vec<_>>(), vec![1.0, 2.0, 3.0]);
        assert_eq!(series.span_days(), 2);
    }

    #[test]
    fn test_from_columns_drops_missing_values() {
        let series = TemperatureSeries::from_columns(
            TemperatureUnit::Fahrenheit,
            vec![date(2024, 2, 14), date(2024, 2, 15), date(2024, 2, 16)],
            vec![Some(20.5), None, Some(18.0)],
        );
        assert_eq!(series.len(), 2);
        assert_eq!(series.last_date(), Some(date(2024, 2, 16)));
    }

    #[test]
    fn test_to_unit_converts_every_point() {
        let series = TemperatureSeries::new(
            TemperatureUnit::Fahrenheit,
            vec![
                TemperaturePoint::new(date(2024, 1, 1), 32.0),
                TemperaturePoint::new(date(2024, 1, 2), 212.0),
            ],
        );
        let celsius = series.to_unit(TemperatureUnit::Celsius);
        assert_eq!(celsius.unit(), TemperatureUnit::Celsius);
        assert_eq!(celsius.values().collect::<Vec<_>>(), vec![0.0, 100.0]);
        assert_eq!(series.unit(), TemperatureUnit::Fahrenheit);
    }

    #[test]
    fn test_frame_conversion_keeps_dates() -> Result<(), Box<dyn std::error::Error>> {
        let series = TemperatureSeries::new(
            TemperatureUnit::Celsius,
            vec![
                TemperaturePoint::new(date(1969, 12, 31), -4.5),
                TemperaturePoint::new(date(2024, 2, 29), 1.25),
            ],
        );
        let df = series.to_frame()?;
        assert_eq!(df.column("date")?.dtype(), &DataType::Date);
        assert_eq!(TemperatureSeries::from_frame(TemperatureUnit::Celsius, &df)?, series);
        Ok(())
    }

    #[test]
    fn test_empty_series() {
        let series = TemperatureSeries::empty(TemperatureUnit::Celsius);
        assert!(series.is_empty());
        assert_eq!(series.span_days(), 0);
        assert!(series.rolling_average(RollingWindow::Weekly).is_empty());
    }
}
