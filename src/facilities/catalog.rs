//! Local catalog reader
//!
//! Loads the static toilet dataset from a CSV file. The file carries a header
//! row with at least `name, category, latitude, longitude, address`; an `id`
//! column is used as the native identifier when present and any other column
//! is ignored.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::FinderError;
use crate::models::{Coordinate, DataSource, Facility};

/// Source of locally stored facilities
pub trait LocalCatalog: Send + Sync {
    /// Load every facility in the catalog. Ordering is unspecified.
    fn load_local_facilities(&self) -> Result<Vec<Facility>, FinderError>;
}

/// CSV-backed catalog
#[derive(Debug, Clone)]
pub struct CsvCatalog {
    path: PathBuf,
    default_category: String,
}

/// One CSV row before validation
#[derive(Debug, Deserialize)]
struct CatalogRow {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    category: Option<String>,
    latitude: String,
    longitude: String,
    #[serde(default)]
    address: Option<String>,
}

impl CatalogRow {
    fn into_facility(self, default_category: &str) -> Result<Facility, FinderError> {
        let latitude = parse_degrees(&self.latitude)?;
        let longitude = parse_degrees(&self.longitude)?;
        let coordinate = Coordinate::new(latitude, longitude)?;

        let category = self
            .category
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| default_category.to_string());

        Ok(Facility::new(self.name, coordinate, DataSource::Local, category)
            .with_address(self.address.map(|a| a.trim().to_string()))
            .with_source_id(self.id.map(|id| id.trim().to_string()).filter(|id| !id.is_empty())))
    }
}

fn parse_degrees(raw: &str) -> Result<f64, FinderError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| FinderError::catalog(format!("Invalid coordinate value: {raw:?}")))
}

impl CsvCatalog {
    pub fn new(path: impl Into<PathBuf>, default_category: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            default_category: default_category.into(),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse CSV content, skipping rows that cannot be turned into a facility
    pub fn parse_csv(&self, content: &str) -> Result<Vec<Facility>, FinderError> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::Headers)
            .from_reader(content.as_bytes());

        let headers = reader
            .headers()
            .map_err(|e| FinderError::catalog(format!("Failed to read catalog header: {e}")))?
            .clone();
        if !headers.iter().any(|h| h == "latitude") || !headers.iter().any(|h| h == "longitude") {
            return Err(FinderError::catalog(
                "Catalog header must contain latitude and longitude columns",
            ));
        }

        let mut facilities = Vec::new();
        let mut skipped = 0usize;

        for (line, record) in reader.deserialize::<CatalogRow>().enumerate() {
            let parsed = record
                .map_err(|e| FinderError::catalog(e.to_string()))
                .and_then(|row| row.into_facility(&self.default_category));

            match parsed {
                Ok(facility) => facilities.push(facility),
                Err(e) => {
                    // +2: header line and 1-based numbering
                    debug!("Skipping catalog row {}: {}", line + 2, e);
                    skipped += 1;
                }
            }
        }

        if skipped > 0 {
            warn!(
                "Skipped {} malformed rows in catalog {}",
                skipped,
                self.path.display()
            );
        }

        Ok(facilities)
    }
}

impl LocalCatalog for CsvCatalog {
    #[tracing::instrument(name = "load_local_catalog", level = "debug", skip(self), fields(path = %self.path.display()))]
    fn load_local_facilities(&self) -> Result<Vec<Facility>, FinderError> {
        if !self.path.exists() {
            return Err(FinderError::catalog(format!(
                "Catalog file not found: {}",
                self.path.display()
            )));
        }

        let content = fs::read_to_string(&self.path)
            .map_err(|e| FinderError::catalog(format!("Failed to read catalog file: {e}")))?;

        let facilities = self.parse_csv(&content)?;
        info!(
            "Loaded {} facilities from local catalog {}",
            facilities.len(),
            self.path.display()
        );
        Ok(facilities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const CSV: &str = "\
id,name,category,latitude,longitude,address,opening_hours
t1,Station A,toilets,25.0331,121.5655,Xinyi Rd,24/7
t2,,toilets,25.0400,121.5600,,
t3,Broken Row,toilets,not-a-number,121.5,Somewhere,
t4,Out Of Range,toilets,95.0,121.5,,
t5,Park B,,25.0360,121.5654,Park Ln,
";

    fn catalog() -> CsvCatalog {
        CsvCatalog::new("inline.csv", "toilets")
    }

    #[test]
    fn test_parse_skips_malformed_rows() {
        let facilities = catalog().parse_csv(CSV).unwrap();
        assert_eq!(facilities.len(), 3);

        let station = facilities.iter().find(|f| f.name == "Station A").unwrap();
        assert_eq!(station.coordinate.latitude, 25.0331);
        assert_eq!(station.coordinate.longitude, 121.5655);
        assert_eq!(station.address.as_deref(), Some("Xinyi Rd"));
        assert_eq!(station.source, DataSource::Local);
        assert_eq!(station.source_id.as_deref(), Some("t1"));
    }

    #[test]
    fn test_defaults_for_missing_fields() {
        let facilities = catalog().parse_csv(CSV).unwrap();

        let unnamed = facilities.iter().find(|f| f.source_id.as_deref() == Some("t2")).unwrap();
        assert!(!unnamed.is_named());
        assert!(unnamed.address.is_none());

        let park = facilities.iter().find(|f| f.name == "Park B").unwrap();
        assert_eq!(park.category, "toilets");
    }

    #[test]
    fn test_rows_without_id_column() {
        let csv = "name,category,latitude,longitude,address\nA,toilets,1.0,2.0,Road\n";
        let facilities = catalog().parse_csv(csv).unwrap();
        assert_eq!(facilities.len(), 1);
        assert!(facilities[0].source_id.is_none());
    }

    #[test]
    fn test_missing_coordinate_columns() {
        let result = catalog().parse_csv("name,address\nA,Road\n");
        assert!(matches!(result, Err(FinderError::CatalogUnavailable { .. })));
    }

    #[test]
    fn test_load_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(CSV.as_bytes()).unwrap();

        let catalog = CsvCatalog::new(temp_file.path(), "toilets");
        let facilities = catalog.load_local_facilities().unwrap();
        assert_eq!(facilities.len(), 3);
    }

    #[test]
    fn test_file_not_found() {
        let catalog = CsvCatalog::new("nonexistent_catalog.csv", "toilets");
        let result = catalog.load_local_facilities();
        assert!(matches!(
            result.unwrap_err(),
            FinderError::CatalogUnavailable { .. }
        ));
    }
}
