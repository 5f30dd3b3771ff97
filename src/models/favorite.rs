//! Saved favorites

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::facility::Facility;
use super::location::Coordinate;

/// A facility saved by a user.
///
/// The key is `(user_id, name, coordinate)`; coordinates compare at
/// micro-degree precision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FavoriteEntry {
    pub user_id: String,
    pub name: String,
    pub coordinate: Coordinate,
    pub address: Option<String>,
    pub saved_at: DateTime<Utc>,
}

impl FavoriteEntry {
    #[must_use]
    pub fn from_facility(user_id: &str, facility: &Facility) -> Self {
        Self {
            user_id: user_id.to_string(),
            name: facility.name.clone(),
            coordinate: facility.coordinate,
            address: facility.address.clone(),
            saved_at: Utc::now(),
        }
    }

    /// Whether this entry has the given `(name, coordinate)` key
    #[must_use]
    pub fn matches(&self, name: &str, coordinate: &Coordinate) -> bool {
        self.name == name && self.coordinate.micro_key() == coordinate.micro_key()
    }
}
