//! Per-user conversation state
//!
//! Remembers the last location a user shared and the last result list shown
//! to them, so follow-up messages ("save 2") can refer back to it. State lives
//! for the process lifetime only.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::models::{Coordinate, Facility};

/// Session state for one user
#[derive(Debug, Clone, Default)]
pub struct UserSession {
    pub location: Option<Coordinate>,
    pub last_results: Vec<Facility>,
}

/// Keyed session storage injected into the resolver and conversation handler
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn location(&self, user_id: &str) -> Option<Coordinate>;

    async fn set_location(&self, user_id: &str, location: Coordinate);

    async fn last_results(&self, user_id: &str) -> Vec<Facility>;

    async fn set_last_results(&self, user_id: &str, results: Vec<Facility>);
}

/// Process-local session store
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, UserSession>>,
}

impl InMemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn location(&self, user_id: &str) -> Option<Coordinate> {
        self.sessions
            .read()
            .await
            .get(user_id)
            .and_then(|s| s.location)
    }

    async fn set_location(&self, user_id: &str, location: Coordinate) {
        let mut sessions = self.sessions.write().await;
        sessions.entry(user_id.to_string()).or_default().location = Some(location);
    }

    async fn last_results(&self, user_id: &str) -> Vec<Facility> {
        self.sessions
            .read()
            .await
            .get(user_id)
            .map(|s| s.last_results.clone())
            .unwrap_or_default()
    }

    async fn set_last_results(&self, user_id: &str, results: Vec<Facility>) {
        let mut sessions = self.sessions.write().await;
        sessions.entry(user_id.to_string()).or_default().last_results = results;
    }
}
