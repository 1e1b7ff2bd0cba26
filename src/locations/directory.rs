//! The static `City,State` → coordinates table, plus a spatial index over it.

use crate::locations::error::LocationError;
use crate::LatLon;
use haversine::{distance, Location as HaversineLocation, Units};
use log::{info, warn};
use ordered_float::OrderedFloat;
use polars::prelude::*;
use rstar::{PointDistance, RTree, RTreeObject, AABB};
use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;

const BUNDLED_CITIES: &str = include_str!("../../data/cities.csv");

const LABEL_COLUMN: &str = "city_state";
const LAT_COLUMN: &str = "lat";
const LNG_COLUMN: &str = "lng";

/// One labelled city.
#[derive(Debug, Clone, PartialEq)]
pub struct City {
    /// `"City,State"`, e.g. `"New York,New York"`.
    pub label: String,
    pub location: LatLon,
}

impl RTreeObject for City {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.location.0, self.location.1])
    }
}

impl PointDistance for City {
    /// Squared planar distance in degrees; only used to order R-tree candidates.
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.location.0 - point[0];
        let dy = self.location.1 - point[1];
        dx * dx + dy * dy
    }
}

/// Read-only lookup table from city label to coordinates.
///
/// Loaded once, then shared by every render.
///
/// # Examples
///
/// ```
/// use heatpump_counter::LocationDirectory;
///
/// let directory = LocationDirectory::bundled().unwrap();
/// let nyc = directory.lookup("New York,New York").unwrap();
/// assert!((nyc.0 - 40.69).abs() < 0.01);
/// ```
#[derive(Debug, Clone)]
pub struct LocationDirectory {
    by_label: HashMap<String, LatLon>,
    rtree: RTree<City>,
}

impl LocationDirectory {
    /// The small US city table shipped with the crate.
    pub fn bundled() -> Result<Self, LocationError> {
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .into_reader_with_file_handle(Cursor::new(BUNDLED_CITIES.as_bytes()))
            .finish()?;
        Self::from_frame(&df)
    }

    /// Loads a `city_state,lat,lng` CSV file.
    pub fn from_csv_path(path: &Path) -> Result<Self, LocationError> {
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .try_into_reader_with_file_path(Some(path.to_path_buf()))
            .map_err(|e| LocationError::CsvRead(path.to_path_buf(), e))?
            .finish()
            .map_err(|e| LocationError::CsvRead(path.to_path_buf(), e))?;
        let directory = Self::from_frame(&df)?;
        info!("Loaded {} cities from {}", directory.len(), path.display());
        Ok(directory)
    }

    /// Builds the directory from a frame with `city_state`, `lat` and `lng` columns.
    ///
    /// Rows with a missing value are skipped. When a label appears twice the first row wins.
    pub fn from_frame(df: &DataFrame) -> Result<Self, LocationError> {
        let labels = string_column(df, LABEL_COLUMN)?;
        let lats = float_column(df, LAT_COLUMN)?;
        let lngs = float_column(df, LNG_COLUMN)?;

        let mut by_label = HashMap::with_capacity(df.height());
        let mut cities = Vec::with_capacity(df.height());
        let rows = labels
            .str()
            .map_err(|e| LocationError::ColumnNotFound(LABEL_COLUMN.to_string(), e))?
            .into_iter()
            .zip(lats.f64()?)
            .zip(lngs.f64()?);
        for ((label, lat), lng) in rows {
            let (Some(label), Some(lat), Some(lng)) = (label, lat, lng) else {
                continue;
            };
            if by_label.contains_key(label) {
                warn!("Duplicate city label '{}', keeping the first entry", label);
                continue;
            }
            let location = LatLon(lat, lng);
            by_label.insert(label.to_string(), location);
            cities.push(City {
                label: label.to_string(),
                location,
            });
        }

        if cities.is_empty() {
            return Err(LocationError::Empty);
        }
        Ok(Self {
            by_label,
            rtree: RTree::bulk_load(cities),
        })
    }

    /// Coordinates for a `"City,State"` label.
    pub fn lookup(&self, label: &str) -> Option<LatLon> {
        self.by_label.get(label).copied()
    }

    pub fn contains(&self, label: &str) -> bool {
        self.by_label.contains_key(label)
    }

    /// All labels, sorted alphabetically, as offered in a city selector.
    pub fn labels(&self) -> Vec<&str> {
        let mut labels: Vec<&str> = self.by_label.keys().map(String::as_str).collect();
        labels.sort_unstable();
        labels
    }

    pub fn len(&self) -> usize {
        self.by_label.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_label.is_empty()
    }

    /// The closest known city to `location` within `max_distance_km`, with its
    /// great-circle distance in kilometres.
    pub fn nearest(&self, location: LatLon, max_distance_km: f64) -> Option<(&City, f64)> {
        let query = [location.0, location.1];
        // Planar degree distance and great-circle distance disagree away from
        // the equator, so look at a handful of candidates.
        self.rtree
            .nearest_neighbor_iter(&query)
            .take(8)
            .map(|city| {
                let km = distance(
                    HaversineLocation {
                        latitude: location.0,
                        longitude: location.1,
                    },
                    HaversineLocation {
                        latitude: city.location.0,
                        longitude: city.location.1,
                    },
                    Units::Kilometers,
                );
                (city, km)
            })
            .filter(|(_, km)| *km <= max_distance_km)
            .min_by_key(|(_, km)| OrderedFloat(*km))
    }
}

/// Turns the raw `uscities.csv` dataset (with `city`, `state_name`, `lat` and
/// `lng` columns among others) into the `city_state,lat,lng` table the
/// directory loads.
pub fn prepare_city_table(raw_csv: &Path, out_csv: &Path) -> Result<usize, LocationError> {
    let raw = CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(raw_csv.to_path_buf()))
        .map_err(|e| LocationError::CsvRead(raw_csv.to_path_buf(), e))?
        .finish()
        .map_err(|e| LocationError::CsvRead(raw_csv.to_path_buf(), e))?;

    let mut table = city_table(&raw)?;

    let mut file = std::fs::File::create(out_csv)
        .map_err(|e| LocationError::CsvCreate(out_csv.to_path_buf(), e))?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut table)
        .map_err(|e| LocationError::CsvWrite(out_csv.to_path_buf(), e))?;
    info!(
        "Wrote {} cities from {} to {}",
        table.height(),
        raw_csv.display(),
        out_csv.display()
    );
    Ok(table.height())
}

fn city_table(raw: &DataFrame) -> Result<DataFrame, LocationError> {
    let cities = string_column(raw, "city")?;
    let states = string_column(raw, "state_name")?;
    let city_state: Vec<Option<String>> = cities
        .str()
        .map_err(|e| LocationError::ColumnNotFound("city".to_string(), e))?
        .into_iter()
        .zip(
            states
                .str()
                .map_err(|e| LocationError::ColumnNotFound("state_name".to_string(), e))?,
        )
        .map(|(city, state)| match (city, state) {
            (Some(city), Some(state)) => Some(format!("{},{}", city, state)),
            _ => None,
        })
        .collect();

    Ok(DataFrame::new(vec![
        Column::new(LABEL_COLUMN.into(), city_state),
        float_column(raw, LAT_COLUMN)?,
        float_column(raw, LNG_COLUMN)?,
    ])?)
}

fn string_column(df: &DataFrame, name: &str) -> Result<Column, LocationError> {
    df.column(name)
        .and_then(|c| c.cast(&DataType::String))
        .map_err(|e| LocationError::ColumnNotFound(name.to_string(), e))
}

fn float_column(df: &DataFrame, name: &str) -> Result<Column, LocationError> {
    df.column(name)
        .and_then(|c| c.cast(&DataType::Float64))
        .map_err(|e| LocationError::ColumnNotFound(name.to_string(), e))
}
