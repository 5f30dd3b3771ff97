//! Configuration management for the toilet finder
//!
//! Handles loading configuration from files, environment variables,
//! and provides validation for all configuration settings.

use crate::FinderError;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "TOILET_FINDER_CONFIG";

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FinderConfig {
    /// Remote geodata (Overpass) settings
    #[serde(default)]
    pub overpass: OverpassConfig,
    /// Local catalog settings
    #[serde(default)]
    pub catalog: CatalogConfig,
    /// Resolver defaults
    #[serde(default)]
    pub search: SearchConfig,
    /// Favorites persistence
    #[serde(default)]
    pub favorites: FavoritesConfig,
    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Overpass API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverpassConfig {
    /// Interpreter endpoint
    #[serde(default = "default_overpass_endpoint")]
    pub endpoint: String,
    /// Request timeout in seconds
    #[serde(default = "default_overpass_timeout")]
    pub timeout_seconds: u32,
    /// Transient-error retries performed by the HTTP middleware
    #[serde(default)]
    pub max_retries: u32,
    /// OSM tag key the category is matched against
    #[serde(default = "default_tag_key")]
    pub tag_key: String,
    /// OSM tag value / facility category
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Local catalog configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Path to the CSV dataset
    #[serde(default = "default_catalog_path")]
    pub path: String,
}

/// Resolver defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Radius used when the user does not give one
    #[serde(default = "default_radius_meters")]
    pub default_radius_meters: f64,
    /// Maximum number of facilities returned (K)
    #[serde(default = "default_result_limit")]
    pub result_limit: usize,
    /// Two records closer than this are the same physical facility
    #[serde(default = "default_dedup_tolerance")]
    pub dedup_tolerance_meters: f64,
}

/// Favorites persistence settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FavoritesConfig {
    /// `memory` or `fjall`
    #[serde(default = "default_favorites_backend")]
    pub backend: String,
    /// Database directory for the `fjall` backend
    #[serde(default = "default_favorites_path")]
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_overpass_endpoint() -> String {
    "https://overpass-api.de/api/interpreter".to_string()
}

fn default_overpass_timeout() -> u32 {
    10
}

fn default_tag_key() -> String {
    "amenity".to_string()
}

fn default_category() -> String {
    "toilets".to_string()
}

fn default_user_agent() -> String {
    format!("toilet-finder/{}", env!("CARGO_PKG_VERSION"))
}

fn default_catalog_path() -> String {
    "data/toilets.csv".to_string()
}

fn default_radius_meters() -> f64 {
    1000.0
}

fn default_result_limit() -> usize {
    5
}

fn default_dedup_tolerance() -> f64 {
    10.0
}

fn default_favorites_backend() -> String {
    "fjall".to_string()
}

fn default_favorites_path() -> String {
    "data/favorites".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for OverpassConfig {
    fn default() -> Self {
        Self {
            endpoint: default_overpass_endpoint(),
            timeout_seconds: default_overpass_timeout(),
            max_retries: 0,
            tag_key: default_tag_key(),
            category: default_category(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: default_catalog_path(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_radius_meters: default_radius_meters(),
            result_limit: default_result_limit(),
            dedup_tolerance_meters: default_dedup_tolerance(),
        }
    }
}

impl Default for FavoritesConfig {
    fn default() -> Self {
        Self {
            backend: default_favorites_backend(),
            path: default_favorites_path(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl OverpassConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.into())
    }
}

impl FinderConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        let explicit = std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from);
        Self::load_from_path(explicit)
    }

    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path().unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // TOILET_FINDER__SEARCH__RESULT_LIMIT=3 style overrides
        builder = builder.add_source(
            Environment::with_prefix("TOILET_FINDER")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: FinderConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("toilet-finder").join("config.toml"))
    }

    /// Apply default values to empty configuration fields
    pub fn apply_defaults(&mut self) {
        if self.overpass.endpoint.is_empty() {
            self.overpass.endpoint = default_overpass_endpoint();
        }
        if self.overpass.timeout_seconds == 0 {
            self.overpass.timeout_seconds = default_overpass_timeout();
        }
        if self.overpass.tag_key.is_empty() {
            self.overpass.tag_key = default_tag_key();
        }
        if self.overpass.category.is_empty() {
            self.overpass.category = default_category();
        }
        if self.overpass.user_agent.is_empty() {
            self.overpass.user_agent = default_user_agent();
        }
        if self.catalog.path.is_empty() {
            self.catalog.path = default_catalog_path();
        }
        if self.search.result_limit == 0 {
            self.search.result_limit = default_result_limit();
        }
        if self.favorites.backend.is_empty() {
            self.favorites.backend = default_favorites_backend();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.overpass.timeout_seconds > 300 {
            return Err(FinderError::config("Overpass timeout cannot exceed 300 seconds").into());
        }

        if self.overpass.max_retries > 10 {
            return Err(FinderError::config("Overpass max retries cannot exceed 10").into());
        }

        let radius = self.search.default_radius_meters;
        if !radius.is_finite() || radius <= 0.0 {
            return Err(FinderError::config("Default radius must be a positive number of meters").into());
        }

        if radius > 50_000.0 {
            return Err(FinderError::config("Default radius cannot exceed 50000 meters").into());
        }

        if !(1..=50).contains(&self.search.result_limit) {
            return Err(FinderError::config("Result limit must be between 1 and 50").into());
        }

        let tolerance = self.search.dedup_tolerance_meters;
        if !tolerance.is_finite() || tolerance < 0.0 || tolerance > 500.0 {
            return Err(
                FinderError::config("Dedup tolerance must be between 0 and 500 meters").into(),
            );
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(FinderError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(FinderError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        let valid_backends = ["memory", "fjall"];
        if !valid_backends.contains(&self.favorites.backend.as_str()) {
            return Err(FinderError::config(format!(
                "Invalid favorites backend '{}'. Must be one of: {}",
                self.favorites.backend,
                valid_backends.join(", ")
            ))
            .into());
        }

        if !self.overpass.endpoint.starts_with("http://")
            && !self.overpass.endpoint.starts_with("https://")
        {
            return Err(
                FinderError::config("Overpass endpoint must be a valid HTTP or HTTPS URL").into(),
            );
        }

        Ok(())
    }
}
