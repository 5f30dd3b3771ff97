//! Facility resolution
//!
//! Merges the local catalog and the remote geodata query for one location,
//! collapses records that describe the same physical toilet, and returns the
//! nearest few ordered by distance.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::catalog::LocalCatalog;
use super::overpass::RemoteFacilityQuery;
use crate::config::FinderConfig;
use crate::error::FinderError;
use crate::models::facility::GeographicSearch;
use crate::models::{Coordinate, Facility};
use crate::session::SessionStore;

/// Resolver tuning, usually derived from [`FinderConfig`]
#[derive(Debug, Clone)]
pub struct ResolverSettings {
    /// Maximum number of facilities returned
    pub result_limit: usize,
    pub dedup_tolerance_meters: f64,
    /// Category passed to the remote query
    pub category: String,
    /// Upper bound on the remote fetch; expiry counts as an empty result
    pub remote_timeout: Duration,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self::from(&FinderConfig::default())
    }
}

impl From<&FinderConfig> for ResolverSettings {
    fn from(config: &FinderConfig) -> Self {
        Self {
            result_limit: config.search.result_limit,
            dedup_tolerance_meters: config.search.dedup_tolerance_meters,
            category: config.overpass.category.clone(),
            remote_timeout: config.overpass.timeout(),
        }
    }
}

/// Outcome of a resolution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "facilities", rename_all = "snake_case")]
pub enum Resolution {
    /// Nearest facilities, ascending by distance, at most `result_limit`
    Found(Vec<Facility>),
    /// Neither source had anything within the radius
    NoFacilitiesFound,
}

impl Resolution {
    #[must_use]
    pub fn facilities(&self) -> &[Facility] {
        match self {
            Resolution::Found(facilities) => facilities,
            Resolution::NoFacilitiesFound => &[],
        }
    }
}

/// Service for finding the nearest facilities around a user
pub struct FacilityResolver {
    catalog: Arc<dyn LocalCatalog>,
    remote: Arc<dyn RemoteFacilityQuery>,
    sessions: Arc<dyn SessionStore>,
    settings: ResolverSettings,
}

impl FacilityResolver {
    pub fn new(
        catalog: Arc<dyn LocalCatalog>,
        remote: Arc<dyn RemoteFacilityQuery>,
        sessions: Arc<dyn SessionStore>,
        settings: ResolverSettings,
    ) -> Self {
        Self {
            catalog,
            remote,
            sessions,
            settings,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &ResolverSettings {
        &self.settings
    }

    /// Remember the user's latest location
    pub async fn update_location(&self, user_id: &str, location: Coordinate) {
        debug!("Updating location for {}: {}", user_id, location.format_coordinates());
        self.sessions.set_location(user_id, location).await;
    }

    /// Resolve around the last location the user shared
    pub async fn resolve_nearby(
        &self,
        user_id: &str,
        radius_meters: f64,
    ) -> Result<Resolution, FinderError> {
        let center = self
            .sessions
            .location(user_id)
            .await
            .ok_or_else(|| FinderError::no_location(user_id))?;
        self.resolve(user_id, center, radius_meters).await
    }

    /// Find the nearest facilities within `radius_meters` of `center`.
    ///
    /// Source failures never surface here; a failing source just contributes
    /// no entries.
    #[tracing::instrument(name = "resolve_facilities", skip(self, center), fields(center = %center.format_coordinates()))]
    pub async fn resolve(
        &self,
        user_id: &str,
        center: Coordinate,
        radius_meters: f64,
    ) -> Result<Resolution, FinderError> {
        if !radius_meters.is_finite() || radius_meters <= 0.0 {
            return Err(FinderError::InvalidRadius {
                radius: radius_meters,
            });
        }

        let (local, remote) = futures::future::join(
            self.fetch_local(center, radius_meters),
            self.fetch_remote(center, radius_meters),
        )
        .await;

        debug!(
            "Fetched {} local and {} remote facilities",
            local.len(),
            remote.len()
        );

        let ranked = merge_and_rank(
            local,
            remote,
            &center,
            self.settings.dedup_tolerance_meters,
            self.settings.result_limit,
        );

        self.sessions.set_last_results(user_id, ranked.clone()).await;

        if ranked.is_empty() {
            info!("No facilities found within {}m", radius_meters);
            return Ok(Resolution::NoFacilitiesFound);
        }

        info!(
            "Resolved {} facilities within {}m",
            ranked.len(),
            radius_meters
        );
        Ok(Resolution::Found(ranked))
    }

    /// Local catalog entries within the radius; empty when the catalog fails
    async fn fetch_local(&self, center: Coordinate, radius_meters: f64) -> Vec<Facility> {
        let catalog = Arc::clone(&self.catalog);
        let loaded = tokio::task::spawn_blocking(move || catalog.load_local_facilities())
            .await
            .map_err(|e| FinderError::catalog(format!("Catalog task failed: {e}")))
            .and_then(|result| result);

        match loaded {
            Ok(facilities) => GeographicSearch::within_radius(&facilities, &center, radius_meters)
                .into_iter()
                .cloned()
                .collect(),
            Err(e) => {
                warn!("Local catalog unavailable, continuing with remote results: {}", e);
                Vec::new()
            }
        }
    }

    /// Remote results within the radius; empty on failure or timeout.
    ///
    /// Overpass keeps an area when any part of it is inside the radius, so its
    /// centroid can still lie outside.
    async fn fetch_remote(&self, center: Coordinate, radius_meters: f64) -> Vec<Facility> {
        let query = self
            .remote
            .query_remote(center, radius_meters, &self.settings.category);

        match tokio::time::timeout(self.settings.remote_timeout, query).await {
            Ok(Ok(facilities)) => {
                let total = facilities.len();
                let nearby: Vec<Facility> =
                    GeographicSearch::within_radius(&facilities, &center, radius_meters)
                        .into_iter()
                        .cloned()
                        .collect();
                if nearby.len() < total {
                    debug!(
                        "Dropped {} remote facilities outside {}m",
                        total - nearby.len(),
                        radius_meters
                    );
                }
                nearby
            }
            Ok(Err(e)) => {
                warn!("Remote query failed, continuing with local results: {}", e);
                Vec::new()
            }
            Err(_) => {
                warn!(
                    "Remote query timed out after {:?}, continuing with local results",
                    self.settings.remote_timeout
                );
                Vec::new()
            }
        }
    }
}

/// Whether `candidate` describes the same physical facility as `kept`.
///
/// Same source and native id always match. Otherwise the two must lie within
/// the tolerance and either come from different sources or share a name, so
/// two distinct catalog rows in one building stay separate.
fn is_duplicate(kept: &Facility, candidate: &Facility, tolerance_meters: f64) -> bool {
    if kept.source == candidate.source
        && kept.source_id.is_some()
        && kept.source_id == candidate.source_id
    {
        return true;
    }

    let close = kept.coordinate.distance_to(&candidate.coordinate) <= tolerance_meters;
    close && (kept.source != candidate.source || kept.name == candidate.name)
}

/// Merge local and remote facilities into the final ranked list.
///
/// Local entries go first so they win every collision and keep their name
/// and address.
#[must_use]
pub fn merge_and_rank(
    local: Vec<Facility>,
    remote: Vec<Facility>,
    center: &Coordinate,
    tolerance_meters: f64,
    limit: usize,
) -> Vec<Facility> {
    let mut merged: Vec<Facility> = Vec::with_capacity(local.len() + remote.len());

    for candidate in local.into_iter().chain(remote) {
        if let Some(kept) = merged
            .iter()
            .find(|kept| is_duplicate(kept, &candidate, tolerance_meters))
        {
            debug!(
                "Dropping duplicate {:?} ({:?}), already have {:?} ({:?})",
                candidate.name, candidate.source, kept.name, kept.source
            );
            continue;
        }
        merged.push(candidate);
    }

    for facility in &mut merged {
        facility.refresh_distance(center);
    }

    merged.sort_by(|a, b| {
        a.distance_meters
            .total_cmp(&b.distance_meters)
            .then_with(|| a.name.cmp(&b.name))
    });
    merged.truncate(limit);
    merged
}
