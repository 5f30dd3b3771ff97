//! Geographic coordinates and great-circle distance

use serde::{Deserialize, Serialize};

use crate::error::FinderError;

/// Mean Earth radius in meters used by the spherical approximation
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// A validated latitude/longitude pair in decimal degrees
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Coordinate {
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
}

impl Coordinate {
    /// Create a coordinate, rejecting non-finite or out-of-range values
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, FinderError> {
        let valid = latitude.is_finite()
            && longitude.is_finite()
            && (-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude);

        if valid {
            Ok(Self {
                latitude,
                longitude,
            })
        } else {
            Err(FinderError::InvalidCoordinate {
                latitude,
                longitude,
            })
        }
    }

    /// Great-circle distance to another coordinate in meters
    #[must_use]
    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        distance(*self, *other)
    }

    /// Format location as coordinates string
    #[must_use]
    pub fn format_coordinates(&self) -> String {
        format!("{:.4}, {:.4}", self.latitude, self.longitude)
    }

    /// Integer micro-degree key, stable for equality and hashing
    #[must_use]
    pub fn micro_key(&self) -> (i64, i64) {
        (
            (self.latitude * 1_000_000.0).round() as i64,
            (self.longitude * 1_000_000.0).round() as i64,
        )
    }
}

/// Haversine distance in meters between two coordinates.
///
/// Uses a spherical Earth of radius [`EARTH_RADIUS_METERS`]. The `asin`
/// argument is clamped so antipodal points cannot produce NaN.
#[must_use]
pub fn distance(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().clamp(-1.0, 1.0).asin();

    (EARTH_RADIUS_METERS * c).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn coord(lat: f64, lon: f64) -> Coordinate {
        Coordinate::new(lat, lon).unwrap()
    }

    #[rstest]
    #[case(91.0, 0.0)]
    #[case(-90.5, 10.0)]
    #[case(0.0, 180.1)]
    #[case(0.0, -181.0)]
    #[case(f64::NAN, 0.0)]
    #[case(0.0, f64::INFINITY)]
    fn test_rejects_invalid_coordinates(#[case] lat: f64, #[case] lon: f64) {
        let result = Coordinate::new(lat, lon);
        assert!(matches!(
            result,
            Err(FinderError::InvalidCoordinate { .. })
        ));
    }

    #[test]
    fn test_accepts_boundaries() {
        assert!(Coordinate::new(90.0, 180.0).is_ok());
        assert!(Coordinate::new(-90.0, -180.0).is_ok());
    }

    #[rstest]
    #[case(coord(25.0330, 121.5654), coord(25.0478, 121.5170))]
    #[case(coord(52.5200, 13.4050), coord(48.8566, 2.3522))]
    #[case(coord(-33.8688, 151.2093), coord(40.7128, -74.0060))]
    #[case(coord(89.9, 0.0), coord(-89.9, 179.0))]
    fn test_distance_is_symmetric(#[case] a: Coordinate, #[case] b: Coordinate) {
        assert!((distance(a, b) - distance(b, a)).abs() < 1e-6);
        assert!(distance(a, a).abs() < 1e-6);
        assert!(distance(b, b).abs() < 1e-6);
    }

    #[test]
    fn test_one_kilometer_along_meridian() {
        // One degree of latitude is R * pi / 180 meters.
        let one_km_in_degrees = 1000.0 / (EARTH_RADIUS_METERS * std::f64::consts::PI / 180.0);
        let a = coord(25.0, 121.5);
        let b = coord(25.0 + one_km_in_degrees, 121.5);
        let d = distance(a, b);
        assert!((d - 1000.0).abs() < 10.0, "expected ~1000 m, got {d}");
    }

    #[test]
    fn test_antipodal_and_polar_inputs() {
        let d = distance(coord(0.0, 0.0), coord(0.0, 180.0));
        assert!(d.is_finite());
        assert!((d - EARTH_RADIUS_METERS * std::f64::consts::PI).abs() < 1.0);

        let d = distance(coord(90.0, 0.0), coord(-90.0, 0.0));
        assert!(d.is_finite());

        let d = distance(coord(90.0, 10.0), coord(90.0, -170.0));
        assert!(d.abs() < 1e-3);
    }

    #[test]
    fn test_matches_haversine_crate() {
        let a = coord(46.0, 8.0);
        let b = coord(46.01, 8.01);
        let ours = distance(a, b);
        let reference = haversine::distance(
            haversine::Location {
                latitude: a.latitude,
                longitude: a.longitude,
            },
            haversine::Location {
                latitude: b.latitude,
                longitude: b.longitude,
            },
            haversine::Units::Kilometers,
        ) * 1000.0;
        assert!((ours - reference).abs() < 1.0);
    }

    #[test]
    fn test_format_coordinates() {
        let c = coord(46.818_234, 8.227_456);
        assert_eq!(c.format_coordinates(), "46.8182, 8.2275");
    }

    #[test]
    fn test_micro_key() {
        let c = coord(25.033_112_4, 121.565_499_9);
        assert_eq!(c.micro_key(), (25_033_112, 121_565_500));
    }
}
