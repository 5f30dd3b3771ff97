//! Data models for the toilet finder
//!
//! This module contains the core value types shared by every component:
//! - Location: validated coordinates and great-circle distance
//! - Facility: a toilet from the local catalog or the remote query
//! - Favorite: a facility saved by a user

pub mod facility;
pub mod favorite;
pub mod location;

// Re-export all public types for convenient access
pub use facility::{DataSource, Facility, UNNAMED_FACILITY};
pub use favorite::FavoriteEntry;
pub use location::{Coordinate, EARTH_RADIUS_METERS, distance};
