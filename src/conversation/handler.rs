//! Conversation handling
//!
//! Turns already-parsed platform events into resolver and favorites calls and
//! produces a [`Reply`]. Webhook verification and message delivery belong to
//! the platform adapter in front of this.

use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::sync::Arc;
use tracing::{debug, error, warn};

use super::intent::{Intent, Selector, classify};
use crate::error::FinderError;
use crate::facilities::{FacilityResolver, Resolution};
use crate::favorites::{FavoritesStore, RemoveOutcome};
use crate::models::{Coordinate, Facility, FavoriteEntry};
use crate::session::SessionStore;

/// An inbound chat event reduced to plain values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundEvent {
    Location {
        user_id: String,
        latitude: f64,
        longitude: f64,
    },
    Text {
        user_id: String,
        text: String,
    },
}

impl InboundEvent {
    #[must_use]
    pub fn user_id(&self) -> &str {
        match self {
            InboundEvent::Location { user_id, .. } | InboundEvent::Text { user_id, .. } => user_id,
        }
    }
}

/// Response to one event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Reply {
    Facilities(Vec<Facility>),
    NoFacilitiesFound,
    LocationRequired,
    Favorites(Vec<FavoriteEntry>),
    FavoriteAdded(FavoriteEntry),
    FavoriteRemoved { name: String },
    FavoriteNotFound { selector: String },
    Help,
    TryAgain,
}

impl Reply {
    /// Plain-text rendering for text-only channels
    #[must_use]
    pub fn render_text(&self) -> String {
        match self {
            Reply::Facilities(facilities) => {
                let mut text = String::from("Nearest toilets:");
                for (i, facility) in facilities.iter().enumerate() {
                    let _ = write!(
                        text,
                        "\n{}. {} ({})",
                        i + 1,
                        facility.name,
                        facility.format_distance()
                    );
                    if let Some(address) = &facility.address {
                        let _ = write!(text, "\n   {address}");
                    }
                }
                text.push_str("\nReply \"save <number>\" to keep one in your favorites.");
                text
            }
            Reply::NoFacilitiesFound => {
                "Sorry, I couldn't find any toilets near you. Try again from a different spot."
                    .to_string()
            }
            Reply::LocationRequired => FinderError::no_location("").user_message(),
            Reply::Favorites(entries) if entries.is_empty() => {
                "You have no saved toilets yet.".to_string()
            }
            Reply::Favorites(entries) => {
                let mut text = String::from("Your favorite toilets:");
                for (i, entry) in entries.iter().enumerate() {
                    let location = entry
                        .address
                        .clone()
                        .unwrap_or_else(|| entry.coordinate.format_coordinates());
                    let _ = write!(text, "\n{}. {} - {}", i + 1, entry.name, location);
                }
                text
            }
            Reply::FavoriteAdded(entry) => format!("Saved {} to your favorites.", entry.name),
            Reply::FavoriteRemoved { name } => format!("Removed {name} from your favorites."),
            Reply::FavoriteNotFound { selector } => {
                format!("I couldn't find \"{selector}\". Check the number and try again.")
            }
            Reply::Help => "Type \"toilet\" (or 廁所) or share your location to find the nearest \
                toilets. You can also send \"favorites\", \"save <number>\" or \"remove <number>\"."
                .to_string(),
            Reply::TryAgain => "Something went wrong, please try again.".to_string(),
        }
    }
}

/// Conversation handler wiring intents to the resolver and stores
pub struct Assistant {
    resolver: Arc<FacilityResolver>,
    favorites: Arc<dyn FavoritesStore>,
    sessions: Arc<dyn SessionStore>,
    default_radius_meters: f64,
}

impl Assistant {
    pub fn new(
        resolver: Arc<FacilityResolver>,
        favorites: Arc<dyn FavoritesStore>,
        sessions: Arc<dyn SessionStore>,
        default_radius_meters: f64,
    ) -> Self {
        Self {
            resolver,
            favorites,
            sessions,
            default_radius_meters,
        }
    }

    /// Handle one inbound event
    #[tracing::instrument(name = "handle_event", skip(self, event), fields(user_id = %event.user_id()))]
    pub async fn handle(&self, event: InboundEvent) -> Reply {
        let result = match event {
            InboundEvent::Location {
                user_id,
                latitude,
                longitude,
            } => self.on_location(&user_id, latitude, longitude).await,
            InboundEvent::Text { user_id, text } => {
                let intent = classify(&text);
                debug!("Classified {:?} as {:?}", text, intent);
                self.on_intent(&user_id, intent).await
            }
        };

        result.unwrap_or_else(reply_for_error)
    }

    /// Current favorites of a user
    pub async fn favorites(&self, user_id: &str) -> Result<Vec<FavoriteEntry>, FinderError> {
        self.favorites.list(user_id).await
    }

    async fn on_location(
        &self,
        user_id: &str,
        latitude: f64,
        longitude: f64,
    ) -> Result<Reply, FinderError> {
        let location = Coordinate::new(latitude, longitude)?;
        self.resolver.update_location(user_id, location).await;
        let resolution = self
            .resolver
            .resolve(user_id, location, self.default_radius_meters)
            .await?;
        Ok(reply_for_resolution(resolution))
    }

    async fn on_intent(&self, user_id: &str, intent: Intent) -> Result<Reply, FinderError> {
        match intent {
            Intent::FindNearby => {
                let resolution = self
                    .resolver
                    .resolve_nearby(user_id, self.default_radius_meters)
                    .await?;
                Ok(reply_for_resolution(resolution))
            }
            Intent::ListFavorites => Ok(Reply::Favorites(self.favorites.list(user_id).await?)),
            Intent::AddFavorite(selector) => self.add_favorite(user_id, &selector).await,
            Intent::RemoveFavorite(selector) => self.remove_favorite(user_id, &selector).await,
            Intent::Unrecognized => Ok(Reply::Help),
        }
    }

    async fn add_favorite(&self, user_id: &str, selector: &Selector) -> Result<Reply, FinderError> {
        let last_results = self.sessions.last_results(user_id).await;
        let Some(facility) = selector.pick(&last_results, |f| f.name.as_str()) else {
            return Ok(Reply::FavoriteNotFound {
                selector: selector.to_string(),
            });
        };

        let entry = self.favorites.add(user_id, facility).await?;
        Ok(Reply::FavoriteAdded(entry))
    }

    async fn remove_favorite(
        &self,
        user_id: &str,
        selector: &Selector,
    ) -> Result<Reply, FinderError> {
        let entries = self.favorites.list(user_id).await?;
        let Some(entry) = selector.pick(&entries, |e| e.name.as_str()) else {
            return Ok(Reply::FavoriteNotFound {
                selector: selector.to_string(),
            });
        };

        match self
            .favorites
            .remove(user_id, &entry.name, entry.coordinate)
            .await?
        {
            RemoveOutcome::Removed => Ok(Reply::FavoriteRemoved {
                name: entry.name.clone(),
            }),
            RemoveOutcome::NotFound => Ok(Reply::FavoriteNotFound {
                selector: selector.to_string(),
            }),
        }
    }
}

fn reply_for_resolution(resolution: Resolution) -> Reply {
    match resolution {
        Resolution::Found(facilities) => Reply::Facilities(facilities),
        Resolution::NoFacilitiesFound => Reply::NoFacilitiesFound,
    }
}

fn reply_for_error(err: FinderError) -> Reply {
    match err {
        FinderError::NoLocationKnown { .. } => Reply::LocationRequired,
        FinderError::InvalidCoordinate { .. } | FinderError::InvalidRadius { .. } => {
            warn!("Rejected request: {}", err);
            Reply::TryAgain
        }
        other => {
            error!("Failed to handle event: {}", other);
            Reply::TryAgain
        }
    }
}
