//! Toilet Finder - conversational lookup of nearby public toilets
//!
//! This library merges a bundled toilet catalog with live OpenStreetMap data,
//! ranks the results by distance from the user, and keeps per-user favorites.

pub mod api;
pub mod config;
pub mod conversation;
pub mod error;
pub mod facilities;
pub mod favorites;
pub mod models;
pub mod session;
pub mod web;

// Re-export core types for public API
pub use config::FinderConfig;
pub use conversation::{Assistant, InboundEvent, Intent, Reply, classify};
pub use error::FinderError;
pub use facilities::{
    CsvCatalog, FacilityResolver, LocalCatalog, OverpassClient, RemoteFacilityQuery, Resolution,
    ResolverSettings,
};
pub use favorites::{
    FavoritesStore, FjallFavoritesStore, InMemoryFavoritesStore, RemoveOutcome,
    open_favorites_store,
};
pub use models::{Coordinate, DataSource, Facility, FavoriteEntry, distance};
pub use session::{InMemorySessionStore, SessionStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, FinderError>;
