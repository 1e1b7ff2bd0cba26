use crate::types::series::TemperatureSeries;
use crate::types::unit::TemperatureUnit;
use crate::weather_data::error::WeatherDataError;
use crate::LatLon;
use chrono::NaiveDate;
use std::future::Future;

/// Coordinates closer than 10^-4 degrees (about 11 m) share cache entries.
const COORDINATE_SCALE: f64 = 10_000.0;

/// A coordinate in units of 10^-4 degrees, as used by both caches.
pub(crate) fn coordinate_key(degrees: f64) -> i64 {
    (degrees * COORDINATE_SCALE).round() as i64
}

/// What to fetch: daily minimum temperatures at `location` from `start` to `end`
/// (both inclusive), expressed in `unit`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesRequest {
    pub location: LatLon,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub unit: TemperatureUnit,
}

impl SeriesRequest {
    /// Creates a request, rejecting `start > end`.
    pub fn new(
        location: LatLon,
        start: NaiveDate,
        end: NaiveDate,
        unit: TemperatureUnit,
    ) -> Result<Self, WeatherDataError> {
        if start > end {
            return Err(WeatherDataError::InvalidDateRange { start, end });
        }
        Ok(Self {
            location,
            start,
            end,
            unit,
        })
    }

    pub(crate) fn query_params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("latitude", self.location.0.to_string()),
            ("longitude", self.location.1.to_string()),
            ("start_date", self.start.format("%Y-%m-%d").to_string()),
            ("end_date", self.end.format("%Y-%m-%d").to_string()),
            ("daily", "temperature_2m_min".to_string()),
            ("temperature_unit", self.unit.api_name().to_string()),
        ]
    }

    pub(crate) fn cache_file_name(&self) -> String {
        format!(
            "archive-{:.4}_{:.4}-{}-{}-{}.parquet",
            coordinate_key(self.location.0) as f64 / COORDINATE_SCALE,
            coordinate_key(self.location.1) as f64 / COORDINATE_SCALE,
            self.start.format("%Y%m%d"),
            self.end.format("%Y%m%d"),
            self.unit
        )
    }
}

/// Anything that can supply a daily minimum temperature series.
///
/// Fetching is slow and fallible; retries and caching are up to the implementor.
pub trait TemperatureSource {
    fn daily_minimum(
        &self,
        request: &SeriesRequest,
    ) -> impl Future<Output = Result<TemperatureSeries, WeatherDataError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_request_rejects_inverted_dates() {
        let result = SeriesRequest::new(
            LatLon(52.52, 13.41),
            date(2024, 2, 28),
            date(2024, 2, 14),
            TemperatureUnit::Fahrenheit,
        );
        assert!(matches!(result, Err(WeatherDataError::InvalidDateRange { .. })));
    }

    #[test]
    fn test_query_params() {
        let request = SeriesRequest::new(
            LatLon(52.52, 13.41),
            date(2024, 2, 14),
            date(2024, 2, 28),
            TemperatureUnit::Celsius,
        )
        .unwrap();
        let params = request.query_params();
        assert!(params.contains(&("start_date", "2024-02-14".to_string())));
        assert!(params.contains(&("end_date", "2024-02-28".to_string())));
        assert!(params.contains(&("daily", "temperature_2m_min".to_string())));
        assert!(params.contains(&("temperature_unit", "celsius".to_string())));
    }

    #[test]
    fn test_cache_file_name_distinguishes_units() {
        let f = SeriesRequest::new(
            LatLon(40.6943, -73.9249),
            date(2020, 1, 1),
            date(2024, 1, 1),
            TemperatureUnit::Fahrenheit,
        )
        .unwrap();
        let c = SeriesRequest {
            unit: TemperatureUnit::Celsius,
            ..f
        };
        assert_eq!(
            f.cache_file_name(),
            "archive-40.6943_-73.9249-20200101-20240101-fahrenheit.parquet"
        );
        assert_ne!(f.cache_file_name(), c.cache_file_name());
    }

    #[test]
    fn test_cache_file_name_rounds_coordinates() {
        let request = |lat: f64, lon: f64| {
            SeriesRequest::new(
                LatLon(lat, lon),
                date(2020, 1, 1),
                date(2020, 12, 31),
                TemperatureUnit::Celsius,
            )
            .unwrap()
        };
        let a = request(46.865_101, -96.829_249);
        let b = request(46.865_14, -96.829_21);
        assert_eq!(a.cache_file_name(), b.cache_file_name());
        assert_eq!(
            a.cache_file_name(),
            "archive-46.8651_-96.8292-20200101-20201231-celsius.parquet"
        );
        assert_ne!(a.cache_file_name(), request(46.8652, -96.8292).cache_file_name());
    }
}
