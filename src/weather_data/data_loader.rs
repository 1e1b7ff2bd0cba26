use crate::types::series::TemperatureSeries;
use crate::weather_data::error::WeatherDataError;
use crate::weather_data::source::SeriesRequest;
use bon::Builder;
use chrono::NaiveDate;
use log::{debug, info, warn};
use polars::frame::DataFrame;
use polars::prelude::*;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio::{fs, task};

const ARCHIVE_URL: &str = "https://archive-api.open-meteo.com/v1/archive";
const DAILY_VARIABLE: &str = "temperature_2m_min";

/// How often and how patiently a failed download is retried.
///
/// The delay before retry `n` (starting at 1) is `backoff_factor * 2^(n - 1)` seconds.
///
/// ```
/// use heatpump_counter::RetryPolicy;
///
/// let policy = RetryPolicy::builder().retries(3).build();
/// assert_eq!(policy.retries, 3);
/// assert_eq!(policy.backoff_factor, 0.2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Builder)]
pub struct RetryPolicy {
    #[builder(default = 5)]
    pub retries: u32,
    #[builder(default = 0.2)]
    pub backoff_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl RetryPolicy {
    pub(crate) fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16) as i32;
        Duration::from_secs_f64((self.backoff_factor * 2f64.powi(exponent)).max(0.0))
    }
}

#[derive(Debug, Deserialize)]
struct ArchiveResponse {
    latitude: f64,
    longitude: f64,
    #[serde(default)]
    elevation: Option<f64>,
    #[serde(default)]
    daily_units: HashMap<String, String>,
    daily: Option<DailyBlock>,
}

#[derive(Debug, Deserialize)]
struct DailyBlock {
    time: Vec<NaiveDate>,
    temperature_2m_min: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    reason: String,
}

/// Downloads daily minimum temperatures from the Open-Meteo archive and keeps
/// every answer as a parquet file in the cache directory.
///
/// Cached files never expire: archive data for a past date range does not change.
/// A cache file that cannot be read is discarded and downloaded again.
pub struct ArchiveLoader {
    cache_dir: PathBuf,
    archive_url: String,
    download_client: Client,
    retry: RetryPolicy,
}

impl ArchiveLoader {
    pub fn new(cache_dir: &Path, retry: RetryPolicy) -> ArchiveLoader {
        ArchiveLoader {
            cache_dir: cache_dir.to_path_buf(),
            archive_url: ARCHIVE_URL.to_string(),
            download_client: Client::new(),
            retry,
        }
    }

    /// Points the loader at another archive endpoint, e.g. a self-hosted Open-Meteo.
    pub fn with_archive_url(mut self, url: impl Into<String>) -> ArchiveLoader {
        self.archive_url = url.into();
        self
    }

    /// Loads the series for `request`, from the parquet cache when present.
    ///
    /// Failing to write the cache is logged; the downloaded series is still returned.
    pub async fn get_series(
        &self,
        request: &SeriesRequest,
    ) -> Result<TemperatureSeries, WeatherDataError> {
        let parquet_path = self.cache_dir.join(request.cache_file_name());

        if fs::metadata(&parquet_path).await.is_ok() {
            info!("Cache hit for {:?} at {:?}", request, parquet_path);
            match Self::read_cached(request, parquet_path.clone()).await {
                Ok(series) => return Ok(series),
                Err(e) => {
                    warn!("Discarding unreadable cache file {:?}: {}", parquet_path, e);
                    if let Err(e) = fs::remove_file(&parquet_path).await {
                        warn!("Failed to remove {:?}: {}", parquet_path, e);
                    }
                }
            }
        } else {
            warn!("Cache miss for {:?}. Downloading.", request);
        }

        let series = self.download(request).await?;

        match self.store(&series, &parquet_path).await {
            Ok(()) => info!("Cached {} days to {:?}", series.len(), parquet_path),
            Err(e) => warn!("Failed to cache {:?}: {}", parquet_path, e),
        }
        Ok(series)
    }

    async fn store(
        &self,
        series: &TemperatureSeries,
        parquet_path: &Path,
    ) -> Result<(), WeatherDataError> {
        fs::create_dir_all(&self.cache_dir)
            .await
            .map_err(|e| WeatherDataError::CacheDirCreation(self.cache_dir.clone(), e))?;
        Self::cache_dataframe(series.to_frame()?, &self.cache_dir, parquet_path).await
    }

    /// Downloads the series, retrying transient failures according to the retry policy.
    async fn download(
        &self,
        request: &SeriesRequest,
    ) -> Result<TemperatureSeries, WeatherDataError> {
        let mut attempt = 0;
        loop {
            match self.download_once(request).await {
                Ok(series) => return Ok(series),
                Err(e) if e.is_transient() && attempt < self.retry.retries => {
                    attempt += 1;
                    let delay = self.retry.delay(attempt);
                    warn!(
                        "Attempt {} of {} failed ({}), retrying in {:?}",
                        attempt,
                        self.retry.retries + 1,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn download_once(
        &self,
        request: &SeriesRequest,
    ) -> Result<TemperatureSeries, WeatherDataError> {
        let http_request = self
            .download_client
            .get(&self.archive_url)
            .query(&request.query_params())
            .build()
            .map_err(|e| WeatherDataError::NetworkRequest(self.archive_url.clone(), e))?;
        let url = http_request.url().to_string();
        info!("Downloading data from {}", url);

        let response = self
            .download_client
            .execute(http_request)
            .await
            .map_err(|e| WeatherDataError::NetworkRequest(url.clone(), e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let reason = serde_json::from_str::<ApiErrorBody>(&body)
                .map(|b| b.reason)
                .unwrap_or(body);
            warn!("HTTP error for {}: {} {}", url, status, reason);
            return Err(WeatherDataError::HttpStatus {
                url,
                status,
                reason,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| WeatherDataError::NetworkRequest(url.clone(), e))?;
        Self::parse_response(&bytes, request, &url)
    }

    fn parse_response(
        bytes: &[u8],
        request: &SeriesRequest,
        url: &str,
    ) -> Result<TemperatureSeries, WeatherDataError> {
        let response: ArchiveResponse = serde_json::from_slice(bytes)
            .map_err(|e| WeatherDataError::ResponseDecode(url.to_string(), e))?;
        debug!(
            "Coordinates {}°N {}°E, elevation {:?} m asl",
            response.latitude, response.longitude, response.elevation
        );

        let daily = response.daily.ok_or_else(|| WeatherDataError::UnexpectedData {
            url: url.to_string(),
            message: "response has no 'daily' block".to_string(),
        })?;
        if daily.time.len() != daily.temperature_2m_min.len() {
            return Err(WeatherDataError::UnexpectedData {
                url: url.to_string(),
                message: format!(
                    "{} dates but {} temperatures",
                    daily.time.len(),
                    daily.temperature_2m_min.len()
                ),
            });
        }
        if let Some(unit) = response.daily_units.get(DAILY_VARIABLE) {
            if unit != request.unit.symbol() {
                warn!(
                    "Archive returned {} values for a {} request",
                    unit, request.unit
                );
            }
        }

        Ok(TemperatureSeries::from_columns(
            request.unit,
            daily.time,
            daily.temperature_2m_min,
        ))
    }

    async fn read_cached(
        request: &SeriesRequest,
        path: PathBuf,
    ) -> Result<TemperatureSeries, WeatherDataError> {
        let unit = request.unit;
        task::spawn_blocking(move || {
            let df = LazyFrame::scan_parquet(&path, Default::default())
                .and_then(|lf| lf.collect())
                .map_err(|e| WeatherDataError::ParquetScan(path.clone(), e))?;
            TemperatureSeries::from_frame(unit, &df)
                .map_err(|e| WeatherDataError::ParquetScan(path, e))
        })
        .await?
    }

    /// Writes a DataFrame to a Parquet file using spawn_blocking.
    ///
    /// The file is written under a temporary name in `dir` and renamed into
    /// place, so an interrupted write never leaves a partial file at `path`.
    async fn cache_dataframe(
        mut df: DataFrame,
        dir: &Path,
        path: &Path,
    ) -> Result<(), WeatherDataError> {
        let dir = dir.to_path_buf();
        let path_buf = path.to_path_buf();
        task::spawn_blocking(move || {
            let mut file = NamedTempFile::new_in(&dir)
                .map_err(|e| WeatherDataError::ParquetWriteIo(path_buf.clone(), e))?;
            ParquetWriter::new(file.as_file_mut())
                .with_compression(ParquetCompression::Snappy)
                .finish(&mut df)
                .map_err(|e| WeatherDataError::ParquetWritePolars(path_buf.clone(), e))?;
            file.persist(&path_buf)
                .map_err(|e| WeatherDataError::ParquetWriteIo(path_buf, e.error))?;
            Ok::<(), WeatherDataError>(())
        })
        .await??;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::unit::TemperatureUnit;
    use crate::LatLon;

    fn request(unit: TemperatureUnit) -> SeriesRequest {
        SeriesRequest::new(
            LatLon(52.52, 13.41),
            NaiveDate::from_ymd_opt(2024, 2, 14).unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 16).unwrap(),
            unit,
        )
        .unwrap()
    }

    const SAMPLE: &str = r#"{
        "latitude": 52.52,
        "longitude": 13.419998,
        "generationtime_ms": 0.05,
        "utc_offset_seconds": 0,
        "timezone": "GMT",
        "timezone_abbreviation": "GMT",
        "elevation": 38.0,
        "daily_units": {"time": "iso8601", "temperature_2m_min": "°F"},
        "daily": {
            "time": ["2024-02-14", "2024-02-15", "2024-02-16"],
            "temperature_2m_min": [35.1, null, 41.3]
        }
    }"#;

    #[test]
    fn test_parse_response_drops_nulls() {
        let series =
            ArchiveLoader::parse_response(SAMPLE.as_bytes(), &request(TemperatureUnit::Fahrenheit), "test")
                .unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.unit(), TemperatureUnit::Fahrenheit);
        assert_eq!(series.values().collect::<Vec<_>>(), vec![35.1, 41.3]);
    }

    #[test]
    fn test_parse_response_length_mismatch() {
        let body = r#"{"latitude": 1.0, "longitude": 2.0,
            "daily": {"time": ["2024-02-14"], "temperature_2m_min": [1.0, 2.0]}}"#;
        let result =
            ArchiveLoader::parse_response(body.as_bytes(), &request(TemperatureUnit::Celsius), "test");
        assert!(matches!(result, Err(WeatherDataError::UnexpectedData { .. })));
    }

    #[test]
    fn test_parse_response_without_daily_block() {
        let body = r#"{"latitude": 1.0, "longitude": 2.0}"#;
        let result =
            ArchiveLoader::parse_response(body.as_bytes(), &request(TemperatureUnit::Celsius), "test");
        assert!(matches!(result, Err(WeatherDataError::UnexpectedData { .. })));
    }

    #[test]
    fn test_parse_response_invalid_json() {
        let result =
            ArchiveLoader::parse_response(b"not json", &request(TemperatureUnit::Celsius), "test");
        assert!(matches!(result, Err(WeatherDataError::ResponseDecode(..))));
    }

    #[test]
    fn test_retry_delays_grow_exponentially() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.retries, 5);
        assert_eq!(policy.delay(1), Duration::from_millis(200));
        assert_eq!(policy.delay(2), Duration::from_millis(400));
        assert_eq!(policy.delay(3), Duration::from_millis(800));
    }

    #[tokio::test]
    async fn test_cached_series_is_served_without_download() -> Result<(), Box<dyn std::error::Error>>
    {
        let cache = tempfile::tempdir()?;
        let request = request(TemperatureUnit::Fahrenheit);
        let series =
            ArchiveLoader::parse_response(SAMPLE.as_bytes(), &request, "test")?;
        let path = cache.path().join(request.cache_file_name());
        ArchiveLoader::cache_dataframe(series.to_frame()?, cache.path(), &path).await?;

        // no retries: a download attempt would surface as an error instead of the cached data
        let loader = ArchiveLoader::new(cache.path(), RetryPolicy::builder().retries(0).build());
        let loaded = loader.get_series(&request).await?;
        assert_eq!(loaded, series);
        Ok(())
    }

    /// Answers a single HTTP request on a local port with `body`, returning the archive URL.
    async fn serve_once(body: &'static str) -> std::io::Result<String> {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let url = format!("http://{}/v1/archive", listener.local_addr()?);
        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let response = format!(
                    "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });
        Ok(url)
    }

    /// A local URL nothing listens on.
    async fn refused_url() -> std::io::Result<String> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let url = format!("http://{}/v1/archive", listener.local_addr()?);
        drop(listener);
        Ok(url)
    }

    fn no_retries() -> RetryPolicy {
        RetryPolicy::builder().retries(0).build()
    }

    #[tokio::test]
    async fn test_unreadable_cache_file_is_downloaded_again() -> Result<(), Box<dyn std::error::Error>>
    {
        let cache = tempfile::tempdir()?;
        let request = request(TemperatureUnit::Fahrenheit);
        let path = cache.path().join(request.cache_file_name());
        std::fs::write(&path, b"")?;

        let loader = ArchiveLoader::new(cache.path(), no_retries())
            .with_archive_url(serve_once(SAMPLE).await?);
        let series = loader.get_series(&request).await?;
        assert_eq!(series.values().collect::<Vec<_>>(), vec![35.1, 41.3]);

        // the rewritten file is served without touching the network
        let offline = ArchiveLoader::new(cache.path(), no_retries())
            .with_archive_url(refused_url().await?);
        assert_eq!(offline.get_series(&request).await?, series);
        Ok(())
    }

    #[tokio::test]
    async fn test_unreadable_cache_file_is_removed_when_download_fails(
    ) -> Result<(), Box<dyn std::error::Error>> {
        let cache = tempfile::tempdir()?;
        let request = request(TemperatureUnit::Celsius);
        let path = cache.path().join(request.cache_file_name());
        std::fs::write(&path, b"PAR1 truncated")?;

        let loader =
            ArchiveLoader::new(cache.path(), no_retries()).with_archive_url(refused_url().await?);
        for _ in 0..2 {
            let result = loader.get_series(&request).await;
            assert!(
                matches!(result, Err(WeatherDataError::NetworkRequest(..))),
                "got {:?}",
                result
            );
        }
        assert!(!path.exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_cache_write_still_returns_series() -> Result<(), Box<dyn std::error::Error>>
    {
        let root = tempfile::tempdir()?;
        let blocker = root.path().join("not_a_dir");
        std::fs::write(&blocker, b"x")?;

        let loader = ArchiveLoader::new(&blocker.join("cache"), no_retries())
            .with_archive_url(serve_once(SAMPLE).await?);
        let series = loader.get_series(&request(TemperatureUnit::Fahrenheit)).await?;
        assert_eq!(series.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_cache_write_leaves_no_temporary_files() -> Result<(), Box<dyn std::error::Error>> {
        let cache = tempfile::tempdir()?;
        let request = request(TemperatureUnit::Fahrenheit);
        let series = ArchiveLoader::parse_response(SAMPLE.as_bytes(), &request, "test")?;
        let path = cache.path().join(request.cache_file_name());
        ArchiveLoader::cache_dataframe(series.to_frame()?, cache.path(), &path).await?;

        let files: Vec<_> = std::fs::read_dir(cache.path())?.collect::<Result<_, _>>()?;
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path(), path);
        Ok(())
    }

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_download_berlin_february() -> Result<(), Box<dyn std::error::Error>> {
        let cache = tempfile::tempdir()?;
        let loader = ArchiveLoader::new(cache.path(), RetryPolicy::default());
        let series = loader.get_series(&request(TemperatureUnit::Fahrenheit)).await?;
        assert_eq!(series.len(), 3);
        assert!(cache.path().join(request(TemperatureUnit::Fahrenheit).cache_file_name()).exists());
        Ok(())
    }
}
