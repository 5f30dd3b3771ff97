//! Facility data sources and resolution
//!
//! - Local catalog: the CSV dataset shipped with the service
//! - Overpass: live OpenStreetMap query around the user
//! - Resolver: merge, deduplicate, rank and cap the combined results

pub mod catalog;
pub mod overpass;
pub mod resolver;

pub use catalog::{CsvCatalog, LocalCatalog};
pub use overpass::{Geometry, OverpassClient, RemoteFacilityQuery};
pub use resolver::{FacilityResolver, Resolution, ResolverSettings, merge_and_rank};
