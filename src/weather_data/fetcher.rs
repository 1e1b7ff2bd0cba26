use crate::types::series::TemperatureSeries;
use crate::types::unit::TemperatureUnit;
use crate::weather_data::data_loader::{ArchiveLoader, RetryPolicy};
use crate::weather_data::error::WeatherDataError;
use crate::weather_data::source::{coordinate_key, SeriesRequest, TemperatureSource};
use chrono::NaiveDate;
use log::debug;
use std::collections::{hash_map::Entry, HashMap, VecDeque};
use std::path::Path;
use tokio::sync::Mutex;

/// Series kept in memory before the oldest one is evicted.
pub const DEFAULT_MEMORY_CAPACITY: usize = 64;

/// Coordinates are keyed at the same 10^-4 degree precision as the parquet file names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct SeriesKey {
    latitude: i64,
    longitude: i64,
    start: NaiveDate,
    end: NaiveDate,
    unit: TemperatureUnit,
}

impl From<&SeriesRequest> for SeriesKey {
    fn from(request: &SeriesRequest) -> Self {
        Self {
            latitude: coordinate_key(request.location.0),
            longitude: coordinate_key(request.location.1),
            start: request.start,
            end: request.end,
            unit: request.unit,
        }
    }
}

/// Bounded map of loaded series, evicting in insertion order.
#[derive(Debug)]
struct SeriesCache {
    capacity: usize,
    entries: HashMap<SeriesKey, TemperatureSeries>,
    order: VecDeque<SeriesKey>,
}

impl SeriesCache {
    fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    fn get(&self, key: &SeriesKey) -> Option<&TemperatureSeries> {
        self.entries.get(key)
    }

    /// Inserts `series` unless the key is already present, returning the cached value.
    fn insert(&mut self, key: SeriesKey, series: TemperatureSeries) -> TemperatureSeries {
        if let Entry::Occupied(entry) = self.entries.entry(key) {
            return entry.get().clone();
        }
        while self.entries.len() >= self.capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            self.entries.remove(&oldest);
            debug!("Evicted {:?} from the in-memory cache", oldest);
        }
        self.order.push_back(key);
        self.entries.insert(key, series.clone());
        series
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// [`TemperatureSource`] backed by the Open-Meteo archive, with a bounded
/// in-memory cache keyed on location, date range and unit in front of the
/// parquet cache.
pub struct ArchiveFetcher {
    loader: ArchiveLoader,
    series_cache: Mutex<SeriesCache>,
}

impl ArchiveFetcher {
    pub fn new(cache_dir: &Path) -> Self {
        Self::with_retry_policy(cache_dir, RetryPolicy::default())
    }

    pub fn with_retry_policy(cache_dir: &Path, retry: RetryPolicy) -> Self {
        Self::with_loader(ArchiveLoader::new(cache_dir, retry), DEFAULT_MEMORY_CAPACITY)
    }

    /// Wraps `loader`, keeping at most `capacity` series in memory.
    pub fn with_loader(loader: ArchiveLoader, capacity: usize) -> Self {
        Self {
            loader,
            series_cache: Mutex::new(SeriesCache::new(capacity)),
        }
    }

    /// Gets the series for `request`, using the in-memory cache if possible.
    pub async fn get_cached_series(
        &self,
        request: &SeriesRequest,
    ) -> Result<TemperatureSeries, WeatherDataError> {
        let key = SeriesKey::from(request);

        {
            let cache = self.series_cache.lock().await;
            if let Some(series) = cache.get(&key) {
                debug!("In-memory cache hit for {:?}", request);
                return Ok(series.clone());
            }
        }

        // Loading may hit the network, so it runs without holding the lock.
        let loaded = self.loader.get_series(request).await?;

        // Someone else may have loaded it while we were downloading; theirs is kept.
        Ok(self.series_cache.lock().await.insert(key, loaded))
    }

    /// Number of series held in memory.
    pub async fn cached_len(&self) -> usize {
        self.series_cache.lock().await.len()
    }
}

impl TemperatureSource for ArchiveFetcher {
    async fn daily_minimum(
        &self,
        request: &SeriesRequest,
    ) -> Result<TemperatureSeries, WeatherDataError> {
        self.get_cached_series(request).await
    }
}
