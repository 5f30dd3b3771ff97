use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use toilet_finder::config::{FinderConfig, LoggingConfig};
use toilet_finder::{
    Assistant, CsvCatalog, FacilityResolver, InMemorySessionStore, OverpassClient,
    ResolverSettings, VERSION, open_favorites_store, web,
};

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if logging.format == "json" {
        builder.json().init();
    } else {
        builder.pretty().init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = FinderConfig::load().context("Failed to load configuration")?;
    init_tracing(&config.logging);
    info!("Starting toilet-finder {}", VERSION);

    let catalog = Arc::new(CsvCatalog::new(
        &config.catalog.path,
        config.overpass.category.clone(),
    ));
    let remote = Arc::new(OverpassClient::new(&config.overpass)?);
    let sessions = Arc::new(InMemorySessionStore::new());
    let favorites = open_favorites_store(&config.favorites)?;

    let resolver = Arc::new(FacilityResolver::new(
        catalog,
        remote,
        sessions.clone(),
        ResolverSettings::from(&config),
    ));
    let assistant = Arc::new(Assistant::new(
        resolver,
        favorites,
        sessions,
        config.search.default_radius_meters,
    ));

    web::run(&config.server, assistant).await
}
