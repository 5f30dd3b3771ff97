//! Toilet facility data types
//!
//! A [`Facility`] is the unified record produced by both the local catalog
//! and the remote geodata query, carrying its distance from the last query
//! point once the resolver has ranked it.

use serde::{Deserialize, Serialize};

use super::location::{Coordinate, distance};

/// Display name used when a source does not provide one
pub const UNNAMED_FACILITY: &str = "Unnamed toilet";

/// Where a facility record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    Local,
    Remote,
}

/// Represents a toilet from any data source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Facility {
    pub name: String,
    pub coordinate: Coordinate,
    pub address: Option<String>,
    pub source: DataSource,
    /// Native identifier inside its source (catalog `id` column, `node/123`)
    pub source_id: Option<String>,
    pub category: String,
    /// Distance from the most recent query center, in meters
    pub distance_meters: f64,
}

impl Facility {
    /// Build a facility with no distance computed yet
    #[must_use]
    pub fn new(
        name: Option<String>,
        coordinate: Coordinate,
        source: DataSource,
        category: impl Into<String>,
    ) -> Self {
        let name = name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| UNNAMED_FACILITY.to_string());

        Self {
            name,
            coordinate,
            address: None,
            source,
            source_id: None,
            category: category.into(),
            distance_meters: 0.0,
        }
    }

    #[must_use]
    pub fn with_address(mut self, address: Option<String>) -> Self {
        self.address = address.filter(|a| !a.trim().is_empty());
        self
    }

    #[must_use]
    pub fn with_source_id(mut self, source_id: Option<String>) -> Self {
        self.source_id = source_id;
        self
    }

    /// Whether the source gave this facility a real name
    #[must_use]
    pub fn is_named(&self) -> bool {
        self.name != UNNAMED_FACILITY
    }

    /// Recompute `distance_meters` relative to `center`
    pub fn refresh_distance(&mut self, center: &Coordinate) {
        self.distance_meters = distance(*center, self.coordinate);
    }

    /// Format the distance for chat output ("85 m", "1.2 km")
    #[must_use]
    pub fn format_distance(&self) -> String {
        if self.distance_meters < 1000.0 {
            format!("{:.0} m", self.distance_meters)
        } else {
            format!("{:.1} km", self.distance_meters / 1000.0)
        }
    }
}

/// Geographic search functionality
pub struct GeographicSearch;

impl GeographicSearch {
    /// Find facilities within `radius_meters` of a location
    #[must_use]
    pub fn within_radius<'a>(
        facilities: &'a [Facility],
        center: &Coordinate,
        radius_meters: f64,
    ) -> Vec<&'a Facility> {
        facilities
            .iter()
            .filter(|facility| distance(*center, facility.coordinate) <= radius_meters)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_facility(lat: f64, lon: f64, name: &str) -> Facility {
        Facility::new(
            Some(name.to_string()),
            Coordinate::new(lat, lon).unwrap(),
            DataSource::Local,
            "toilets",
        )
    }

    #[test]
    fn test_unnamed_placeholder() {
        let c = Coordinate::new(25.0, 121.0).unwrap();
        let unnamed = Facility::new(None, c, DataSource::Remote, "toilets");
        assert_eq!(unnamed.name, UNNAMED_FACILITY);
        assert!(!unnamed.is_named());

        let blank = Facility::new(Some("   ".to_string()), c, DataSource::Remote, "toilets");
        assert_eq!(blank.name, UNNAMED_FACILITY);
    }

    #[test]
    fn test_blank_address_dropped() {
        let facility = create_test_facility(25.0, 121.0, "A").with_address(Some(" ".to_string()));
        assert!(facility.address.is_none());
    }

    #[test]
    fn test_geographic_search() {
        let facilities = vec![
            create_test_facility(46.0, 8.0, "Near"),
            create_test_facility(46.5, 8.5, "Far"),
        ];
        let center = Coordinate::new(46.001, 8.0).unwrap();

        let nearby = GeographicSearch::within_radius(&facilities, &center, 500.0);
        assert_eq!(nearby.len(), 1);
        assert_eq!(nearby[0].name, "Near");
    }

    #[test]
    fn test_refresh_and_format_distance() {
        let mut facility = create_test_facility(46.01, 8.01, "Test");
        facility.refresh_distance(&Coordinate::new(46.0, 8.0).unwrap());
        assert!(facility.distance_meters > 1000.0 && facility.distance_meters < 2000.0);
        assert!(facility.format_distance().ends_with("km"));

        let here = facility.coordinate;
        facility.refresh_distance(&here);
        assert_eq!(facility.format_distance(), "0 m");
    }
}
