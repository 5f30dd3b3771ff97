//! Favorites storage
//!
//! Keyed persistence of the facilities a user saved. Entries are unique per
//! `(user_id, name, coordinate)`; adding an existing key replaces it in place.

use async_trait::async_trait;
use fjall::Keyspace;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio::task;
use tracing::{debug, info};

use crate::config::FavoritesConfig;
use crate::error::FinderError;
use crate::models::{Coordinate, Facility, FavoriteEntry};

/// Result of a remove request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoveOutcome {
    Removed,
    NotFound,
}

/// Storage seam for favorites; backends are swappable
#[async_trait]
pub trait FavoritesStore: Send + Sync {
    /// Save a facility for the user, overwriting an entry with the same key
    async fn add(&self, user_id: &str, facility: &Facility) -> Result<FavoriteEntry, FinderError>;

    /// Delete the entry with the given key; absent keys report `NotFound`
    async fn remove(
        &self,
        user_id: &str,
        name: &str,
        coordinate: Coordinate,
    ) -> Result<RemoveOutcome, FinderError>;

    /// Entries in the order they were first saved
    async fn list(&self, user_id: &str) -> Result<Vec<FavoriteEntry>, FinderError>;
}

fn upsert_entry(entries: &mut Vec<FavoriteEntry>, entry: FavoriteEntry) {
    match entries
        .iter()
        .position(|e| e.matches(&entry.name, &entry.coordinate))
    {
        Some(index) => entries[index] = entry,
        None => entries.push(entry),
    }
}

fn remove_entry(entries: &mut Vec<FavoriteEntry>, name: &str, coordinate: &Coordinate) -> RemoveOutcome {
    let before = entries.len();
    entries.retain(|e| !e.matches(name, coordinate));
    if entries.len() < before {
        RemoveOutcome::Removed
    } else {
        RemoveOutcome::NotFound
    }
}

/// Process-local favorites, lost on restart
#[derive(Debug, Default)]
pub struct InMemoryFavoritesStore {
    entries: RwLock<HashMap<String, Vec<FavoriteEntry>>>,
}

impl InMemoryFavoritesStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FavoritesStore for InMemoryFavoritesStore {
    async fn add(&self, user_id: &str, facility: &Facility) -> Result<FavoriteEntry, FinderError> {
        let entry = FavoriteEntry::from_facility(user_id, facility);
        let mut entries = self.entries.write().await;
        upsert_entry(entries.entry(user_id.to_string()).or_default(), entry.clone());
        Ok(entry)
    }

    async fn remove(
        &self,
        user_id: &str,
        name: &str,
        coordinate: Coordinate,
    ) -> Result<RemoveOutcome, FinderError> {
        let mut entries = self.entries.write().await;
        Ok(match entries.get_mut(user_id) {
            Some(list) => remove_entry(list, name, &coordinate),
            None => RemoveOutcome::NotFound,
        })
    }

    async fn list(&self, user_id: &str) -> Result<Vec<FavoriteEntry>, FinderError> {
        Ok(self
            .entries
            .read()
            .await
            .get(user_id)
            .cloned()
            .unwrap_or_default())
    }
}

/// Favorites persisted in an embedded fjall database.
///
/// One key per user holds the postcard-encoded entry list. Mutations take
/// `write_lock` so each read-modify-write runs alone.
pub struct FjallFavoritesStore {
    store: Keyspace,
    write_lock: Mutex<()>,
}

fn user_key(user_id: &str) -> Vec<u8> {
    format!("favorites:{user_id}").into_bytes()
}

fn get_from_store(store: Keyspace, key: Vec<u8>) -> Result<Option<Vec<u8>>, FinderError> {
    let value = store
        .get(key)
        .map_err(|e| FinderError::storage(format!("Failed to read favorites: {e}")))?;
    Ok(value.map(|v| v.to_vec()))
}

impl FjallFavoritesStore {
    /// Open (or create) the database at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self, FinderError> {
        let db = fjall::Database::builder(&path)
            .open()
            .map_err(|e| FinderError::storage(format!("Failed to open favorites database: {e}")))?;
        let store = db
            .keyspace("favorites", fjall::KeyspaceCreateOptions::default)
            .map_err(|e| FinderError::storage(format!("Failed to open favorites keyspace: {e}")))?;

        info!("Opened favorites database at {}", path.as_ref().display());
        Ok(Self {
            store,
            write_lock: Mutex::new(()),
        })
    }

    async fn read_entries(&self, user_id: &str) -> Result<Vec<FavoriteEntry>, FinderError> {
        let store = self.store.clone();
        let key = user_key(user_id);

        let maybe_bytes = task::spawn_blocking(move || get_from_store(store, key))
            .await
            .map_err(|e| FinderError::storage(format!("Favorites read task failed: {e}")))??;

        match maybe_bytes {
            Some(bytes) => postcard::from_bytes(&bytes)
                .map_err(|e| FinderError::storage(format!("Corrupt favorites record: {e}"))),
            None => Ok(Vec::new()),
        }
    }

    async fn write_entries(&self, user_id: &str, entries: &[FavoriteEntry]) -> Result<(), FinderError> {
        let store = self.store.clone();
        let key = user_key(user_id);

        if entries.is_empty() {
            return task::spawn_blocking(move || store.remove(key))
                .await
                .map_err(|e| FinderError::storage(format!("Favorites write task failed: {e}")))?
                .map(|_| ())
                .map_err(|e| FinderError::storage(format!("Failed to delete favorites: {e}")));
        }

        let bytes = postcard::to_stdvec(entries)
            .map_err(|e| FinderError::storage(format!("Failed to encode favorites: {e}")))?;

        task::spawn_blocking(move || store.insert(key, bytes))
            .await
            .map_err(|e| FinderError::storage(format!("Favorites write task failed: {e}")))?
            .map(|_| ())
            .map_err(|e| FinderError::storage(format!("Failed to write favorites: {e}")))
    }
}

#[async_trait]
impl FavoritesStore for FjallFavoritesStore {
    #[tracing::instrument(name = "favorites_add", level = "debug", skip(self, facility))]
    async fn add(&self, user_id: &str, facility: &Facility) -> Result<FavoriteEntry, FinderError> {
        let _guard = self.write_lock.lock().await;

        let mut entries = self.read_entries(user_id).await?;
        let entry = FavoriteEntry::from_facility(user_id, facility);
        upsert_entry(&mut entries, entry.clone());
        self.write_entries(user_id, &entries).await?;

        debug!("User has {} favorites", entries.len());
        Ok(entry)
    }

    #[tracing::instrument(name = "favorites_remove", level = "debug", skip(self))]
    async fn remove(
        &self,
        user_id: &str,
        name: &str,
        coordinate: Coordinate,
    ) -> Result<RemoveOutcome, FinderError> {
        let _guard = self.write_lock.lock().await;

        let mut entries = self.read_entries(user_id).await?;
        let outcome = remove_entry(&mut entries, name, &coordinate);
        if outcome == RemoveOutcome::Removed {
            self.write_entries(user_id, &entries).await?;
        }
        Ok(outcome)
    }

    async fn list(&self, user_id: &str) -> Result<Vec<FavoriteEntry>, FinderError> {
        self.read_entries(user_id).await
    }
}

/// Build the backend named in the configuration
pub fn open_favorites_store(config: &FavoritesConfig) -> Result<Arc<dyn FavoritesStore>, FinderError> {
    match config.backend.as_str() {
        "memory" => Ok(Arc::new(InMemoryFavoritesStore::new())),
        "fjall" => Ok(Arc::new(FjallFavoritesStore::open(&config.path)?)),
        other => Err(FinderError::config(format!(
            "Unknown favorites backend: {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DataSource;
    use tempfile::TempDir;

    fn station() -> Facility {
        Facility::new(
            Some("Station A".into()),
            Coordinate::new(25.0331, 121.5655).unwrap(),
            DataSource::Local,
            "toilets",
        )
    }

    fn park() -> Facility {
        Facility::new(
            Some("Park B".into()),
            Coordinate::new(25.0366, 121.5654).unwrap(),
            DataSource::Remote,
            "toilets",
        )
    }

    async fn exercise_store(store: &dyn FavoritesStore) {
        store.add("u1", &station()).await.unwrap();
        let list = store.list("u1").await.unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].name, "Station A");

        // idempotent add
        store.add("u1", &station()).await.unwrap();
        assert_eq!(store.list("u1").await.unwrap().len(), 1);

        store.add("u1", &park()).await.unwrap();
        let names: Vec<String> = store.list("u1").await.unwrap().into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["Station A", "Park B"]);

        // other users are isolated
        assert!(store.list("u2").await.unwrap().is_empty());

        // absent key leaves existing entries alone
        let outcome = store
            .remove("u1", "Nowhere", Coordinate::new(0.0, 0.0).unwrap())
            .await
            .unwrap();
        assert_eq!(outcome, RemoveOutcome::NotFound);
        assert_eq!(store.list("u1").await.unwrap().len(), 2);

        let s = station();
        let outcome = store.remove("u1", &s.name, s.coordinate).await.unwrap();
        assert_eq!(outcome, RemoveOutcome::Removed);
        let list = store.list("u1").await.unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].name, "Park B");

        let outcome = store.remove("u2", &s.name, s.coordinate).await.unwrap();
        assert_eq!(outcome, RemoveOutcome::NotFound);
    }

    #[tokio::test]
    async fn test_in_memory_store() {
        let store = InMemoryFavoritesStore::new();
        exercise_store(&store).await;
    }

    #[tokio::test]
    async fn test_fjall_store() {
        let temp_dir = TempDir::new().unwrap();
        let store = FjallFavoritesStore::open(temp_dir.path()).unwrap();
        exercise_store(&store).await;
    }

    #[tokio::test]
    async fn test_fjall_store_removing_last_entry() {
        let temp_dir = TempDir::new().unwrap();
        let store = FjallFavoritesStore::open(temp_dir.path()).unwrap();

        let s = station();
        store.add("u1", &s).await.unwrap();
        store.remove("u1", &s.name, s.coordinate).await.unwrap();
        assert!(store.list("u1").await.unwrap().is_empty());
    }

    #[test]
    fn test_open_favorites_store_by_backend() {
        let config = FavoritesConfig {
            backend: "memory".to_string(),
            path: String::new(),
        };
        assert!(open_favorites_store(&config).is_ok());

        let config = FavoritesConfig {
            backend: "carrier-pigeon".to_string(),
            path: String::new(),
        };
        assert!(matches!(
            open_favorites_store(&config),
            Err(FinderError::Config { .. })
        ));
    }
}
