//! Overpass API client
//!
//! Queries OpenStreetMap data for facilities tagged with a category around a
//! point. Nodes carry their own position, ways and relations are requested
//! with `out center` and reduced to that centroid on ingestion.

use async_trait::async_trait;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::config::OverpassConfig;
use crate::error::FinderError;
use crate::models::{Coordinate, DataSource, Facility};

/// Remote geodata query seam used by the resolver
#[async_trait]
pub trait RemoteFacilityQuery: Send + Sync {
    /// Facilities of `category` within `radius_meters` of `center`
    async fn query_remote(
        &self,
        center: Coordinate,
        radius_meters: f64,
        category: &str,
    ) -> Result<Vec<Facility>, FinderError>;
}

/// Overpass API client
pub struct OverpassClient {
    client: ClientWithMiddleware,
    endpoint: String,
    tag_key: String,
    timeout_seconds: u32,
}

/// Raw Overpass response
#[derive(Debug, Deserialize)]
pub struct OverpassResponse {
    #[serde(default)]
    pub elements: Vec<OverpassElement>,
}

/// An element of the `elements` array
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OverpassElement {
    Node {
        id: i64,
        lat: Option<f64>,
        lon: Option<f64>,
        #[serde(default)]
        tags: BTreeMap<String, String>,
    },
    Way {
        id: i64,
        center: Option<OverpassCenter>,
        #[serde(default)]
        tags: BTreeMap<String, String>,
    },
    Relation {
        id: i64,
        center: Option<OverpassCenter>,
        #[serde(default)]
        tags: BTreeMap<String, String>,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
pub struct OverpassCenter {
    pub lat: f64,
    pub lon: f64,
}

/// Where an element's single coordinate came from
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Geometry {
    Point(Coordinate),
    AreaWithCentroid(Coordinate),
}

impl Geometry {
    #[must_use]
    pub fn coordinate(&self) -> Coordinate {
        match self {
            Geometry::Point(c) | Geometry::AreaWithCentroid(c) => *c,
        }
    }
}

impl OverpassElement {
    /// Native id in `type/id` form
    fn source_id(&self) -> Option<String> {
        match self {
            OverpassElement::Node { id, .. } => Some(format!("node/{id}")),
            OverpassElement::Way { id, .. } => Some(format!("way/{id}")),
            OverpassElement::Relation { id, .. } => Some(format!("relation/{id}")),
            OverpassElement::Other => None,
        }
    }

    /// Resolve the element's geometry, `None` when missing or invalid
    #[must_use]
    pub fn geometry(&self) -> Option<Geometry> {
        match self {
            OverpassElement::Node {
                lat: Some(lat),
                lon: Some(lon),
                ..
            } => Coordinate::new(*lat, *lon).ok().map(Geometry::Point),
            OverpassElement::Way {
                center: Some(center),
                ..
            }
            | OverpassElement::Relation {
                center: Some(center),
                ..
            } => Coordinate::new(center.lat, center.lon)
                .ok()
                .map(Geometry::AreaWithCentroid),
            _ => None,
        }
    }

    fn tags(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            OverpassElement::Node { tags, .. }
            | OverpassElement::Way { tags, .. }
            | OverpassElement::Relation { tags, .. } => Some(tags),
            OverpassElement::Other => None,
        }
    }

    /// Convert to unified Facility
    #[must_use]
    pub fn to_facility(&self, category: &str) -> Option<Facility> {
        let geometry = self.geometry()?;
        let tags = self.tags()?;

        let name = tags.get("name").cloned();
        Some(
            Facility::new(name, geometry.coordinate(), DataSource::Remote, category)
                .with_address(address_from_tags(tags))
                .with_source_id(self.source_id()),
        )
    }
}

fn address_from_tags(tags: &BTreeMap<String, String>) -> Option<String> {
    if let Some(full) = tags.get("addr:full") {
        return Some(full.clone());
    }
    match (tags.get("addr:street"), tags.get("addr:housenumber")) {
        (Some(street), Some(number)) => Some(format!("{street} {number}")),
        (Some(street), None) => Some(street.clone()),
        _ => None,
    }
}

/// Build the Overpass QL query for one category around a point
#[must_use]
pub fn build_query(
    tag_key: &str,
    category: &str,
    center: &Coordinate,
    radius_meters: f64,
    timeout_seconds: u32,
) -> String {
    // rounded up so a sub-meter radius never becomes `around:0`
    let around = format!(
        "(around:{:.0},{},{})",
        radius_meters.ceil(),
        center.latitude,
        center.longitude
    );
    let filter = format!("[\"{tag_key}\"=\"{category}\"]");

    format!(
        "[out:json][timeout:{timeout_seconds}];\n(\n  node{filter}{around};\n  way{filter}{around};\n  relation{filter}{around};\n);\nout center;"
    )
}

/// Parse a response body, skipping elements without usable geometry
pub fn parse_response(body: &str, category: &str) -> Result<Vec<Facility>, FinderError> {
    let response: OverpassResponse = serde_json::from_str(body)
        .map_err(|e| FinderError::remote(format!("Failed to parse Overpass response: {e}")))?;

    let total = response.elements.len();
    let facilities: Vec<Facility> = response
        .elements
        .iter()
        .filter_map(|element| element.to_facility(category))
        .collect();

    if facilities.len() < total {
        debug!(
            "Skipped {} Overpass elements without usable geometry",
            total - facilities.len()
        );
    }

    Ok(facilities)
}

impl OverpassClient {
    /// Create a new client
    pub fn new(config: &OverpassConfig) -> Result<Self, FinderError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| FinderError::config(format!("Failed to create HTTP client: {e}")))?;

        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(config.max_retries);
        let client = ClientBuilder::new(client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            tag_key: config.tag_key.clone(),
            timeout_seconds: config.timeout_seconds,
        })
    }
}

#[async_trait]
impl RemoteFacilityQuery for OverpassClient {
    #[tracing::instrument(name = "overpass_query", skip(self))]
    async fn query_remote(
        &self,
        center: Coordinate,
        radius_meters: f64,
        category: &str,
    ) -> Result<Vec<Facility>, FinderError> {
        let query = build_query(
            &self.tag_key,
            category,
            &center,
            radius_meters,
            self.timeout_seconds,
        );
        debug!("Overpass query: {}", query);

        let response = self
            .client
            .post(&self.endpoint)
            .form(&[("data", query.as_str())])
            .send()
            .await
            .map_err(|e| FinderError::remote(format!("Overpass request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(FinderError::remote(format!(
                "Overpass API error {status}: {error_text}"
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| FinderError::remote(format!("Failed to read Overpass response: {e}")))?;

        let facilities = parse_response(&body, category)?;
        info!("Found {} facilities from Overpass", facilities.len());
        Ok(facilities)
    }
}
