//! End-to-end conversation flows against in-process sources and stores

use std::sync::Arc;

use async_trait::async_trait;
use tempfile::TempDir;
use toilet_finder::{
    Assistant, Coordinate, DataSource, Facility, FacilityResolver, FavoritesStore, FinderError,
    FjallFavoritesStore, InMemoryFavoritesStore, InMemorySessionStore, InboundEvent,
    LocalCatalog, RemoteFacilityQuery, Reply, ResolverSettings,
};

struct StaticCatalog(Vec<Facility>);

impl LocalCatalog for StaticCatalog {
    fn load_local_facilities(&self) -> Result<Vec<Facility>, FinderError> {
        Ok(self.0.clone())
    }
}

struct StaticRemote(Vec<Facility>);

#[async_trait]
impl RemoteFacilityQuery for StaticRemote {
    async fn query_remote(
        &self,
        _center: Coordinate,
        _radius_meters: f64,
        _category: &str,
    ) -> Result<Vec<Facility>, FinderError> {
        Ok(self.0.clone())
    }
}

struct DownCatalog;

impl LocalCatalog for DownCatalog {
    fn load_local_facilities(&self) -> Result<Vec<Facility>, FinderError> {
        Err(FinderError::catalog("unreadable"))
    }
}

struct DownRemote;

#[async_trait]
impl RemoteFacilityQuery for DownRemote {
    async fn query_remote(
        &self,
        _center: Coordinate,
        _radius_meters: f64,
        _category: &str,
    ) -> Result<Vec<Facility>, FinderError> {
        Err(FinderError::remote("connection refused"))
    }
}

fn station_a() -> Facility {
    Facility::new(
        Some("Station A".into()),
        Coordinate::new(25.0331, 121.5655).unwrap(),
        DataSource::Local,
        "toilets",
    )
}

fn park_b() -> Facility {
    Facility::new(
        Some("Park B".into()),
        Coordinate::new(25.0366, 121.5654).unwrap(),
        DataSource::Remote,
        "toilets",
    )
    .with_source_id(Some("way/20".into()))
}

fn assistant_with(
    catalog: Arc<dyn LocalCatalog>,
    remote: Arc<dyn RemoteFacilityQuery>,
    favorites: Arc<dyn FavoritesStore>,
) -> Assistant {
    let sessions = Arc::new(InMemorySessionStore::new());
    let resolver = Arc::new(FacilityResolver::new(
        catalog,
        remote,
        sessions.clone(),
        ResolverSettings::default(),
    ));
    Assistant::new(resolver, favorites, sessions, 1000.0)
}

fn assistant(favorites: Arc<dyn FavoritesStore>) -> Assistant {
    assistant_with(
        Arc::new(StaticCatalog(vec![station_a()])),
        Arc::new(StaticRemote(vec![park_b()])),
        favorites,
    )
}

fn text(user_id: &str, text: &str) -> InboundEvent {
    InboundEvent::Text {
        user_id: user_id.to_string(),
        text: text.to_string(),
    }
}

fn location(user_id: &str) -> InboundEvent {
    InboundEvent::Location {
        user_id: user_id.to_string(),
        latitude: 25.0330,
        longitude: 121.5654,
    }
}

fn names(reply: &Reply) -> Vec<String> {
    match reply {
        Reply::Facilities(facilities) => facilities.iter().map(|f| f.name.clone()).collect(),
        Reply::Favorites(entries) => entries.iter().map(|e| e.name.clone()).collect(),
        other => panic!("expected a list reply, got {other:?}"),
    }
}

async fn run_favorites_flow(assistant: &Assistant) {
    assert_eq!(
        assistant.handle(text("u1", "廁所")).await,
        Reply::LocationRequired
    );

    let reply = assistant.handle(location("u1")).await;
    assert_eq!(names(&reply), vec!["Station A", "Park B"]);

    // follow-up search reuses the stored location
    let reply = assistant.handle(text("u1", "toilet")).await;
    assert_eq!(names(&reply), vec!["Station A", "Park B"]);

    let reply = assistant.handle(text("u1", "save 2")).await;
    assert!(matches!(reply, Reply::FavoriteAdded(ref e) if e.name == "Park B"));

    // saving the same facility again keeps a single entry
    assistant.handle(text("u1", "save park b")).await;
    assistant.handle(text("u1", "save 1")).await;
    let reply = assistant.handle(text("u1", "favorites")).await;
    assert_eq!(names(&reply), vec!["Park B", "Station A"]);

    let reply = assistant.handle(text("u1", "save 9")).await;
    assert_eq!(
        reply,
        Reply::FavoriteNotFound {
            selector: "#9".into()
        }
    );

    let reply = assistant.handle(text("u1", "remove 1")).await;
    assert_eq!(
        reply,
        Reply::FavoriteRemoved {
            name: "Park B".into()
        }
    );
    assert_eq!(names(&assistant.handle(text("u1", "我的最愛")).await), vec!["Station A"]);

    let reply = assistant.handle(text("u1", "remove Park B")).await;
    assert!(matches!(reply, Reply::FavoriteNotFound { .. }));

    // another user sees none of it
    assert_eq!(assistant.favorites("u2").await.unwrap(), vec![]);
}

#[tokio::test]
async fn test_favorites_flow_in_memory() {
    let assistant = assistant(Arc::new(InMemoryFavoritesStore::new()));
    run_favorites_flow(&assistant).await;
}

#[tokio::test]
async fn test_favorites_flow_fjall() {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(FjallFavoritesStore::open(temp_dir.path()).unwrap());
    let assistant = assistant(store);
    run_favorites_flow(&assistant).await;
}

#[tokio::test]
async fn test_unrecognized_text_gets_help() {
    let assistant = assistant(Arc::new(InMemoryFavoritesStore::new()));
    let reply = assistant.handle(text("u1", "hello there")).await;
    assert_eq!(reply, Reply::Help);
    assert!(reply.render_text().contains("toilet"));
}

#[tokio::test]
async fn test_saving_before_any_search() {
    let assistant = assistant(Arc::new(InMemoryFavoritesStore::new()));
    let reply = assistant.handle(text("u1", "save 1")).await;
    assert!(matches!(reply, Reply::FavoriteNotFound { .. }));
}

#[tokio::test]
async fn test_nothing_found_when_sources_are_down() {
    let assistant = assistant_with(
        Arc::new(DownCatalog),
        Arc::new(DownRemote),
        Arc::new(InMemoryFavoritesStore::new()),
    );
    let reply = assistant.handle(location("u1")).await;
    assert_eq!(reply, Reply::NoFacilitiesFound);
}

#[tokio::test]
async fn test_invalid_location_asks_to_retry() {
    let assistant = assistant(Arc::new(InMemoryFavoritesStore::new()));
    let reply = assistant
        .handle(InboundEvent::Location {
            user_id: "u1".into(),
            latitude: 25.0,
            longitude: 190.0,
        })
        .await;
    assert_eq!(reply, Reply::TryAgain);

    // the bad location was not stored
    assert_eq!(
        assistant.handle(text("u1", "toilet")).await,
        Reply::LocationRequired
    );
}
