//! Error types and handling for the toilet finder

use thiserror::Error;

/// Main error type for the toilet finder library
#[derive(Error, Debug)]
pub enum FinderError {
    /// Local catalog missing, unreadable or corrupt
    #[error("Catalog unavailable: {message}")]
    CatalogUnavailable { message: String },

    /// Remote geodata query failed (timeout, network, malformed response)
    #[error("Remote query failed: {message}")]
    RemoteQueryFailed { message: String },

    /// A lookup was requested before the user shared a location
    #[error("No location known for user {user_id}")]
    NoLocationKnown { user_id: String },

    /// Search radius must be a positive, finite number of meters
    #[error("Invalid radius: {radius}")]
    InvalidRadius { radius: f64 },

    /// Latitude/longitude outside of the valid degree ranges
    #[error("Invalid coordinate: ({latitude}, {longitude})")]
    InvalidCoordinate { latitude: f64, longitude: f64 },

    /// Favorites or session storage errors
    #[error("Storage error: {message}")]
    Storage { message: String },

    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl FinderError {
    /// Create a new catalog error
    pub fn catalog<S: Into<String>>(message: S) -> Self {
        Self::CatalogUnavailable {
            message: message.into(),
        }
    }

    /// Create a new remote query error
    pub fn remote<S: Into<String>>(message: S) -> Self {
        Self::RemoteQueryFailed {
            message: message.into(),
        }
    }

    /// Create a new storage error
    pub fn storage<S: Into<String>>(message: S) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn no_location<S: Into<String>>(user_id: S) -> Self {
        Self::NoLocationKnown {
            user_id: user_id.into(),
        }
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            FinderError::NoLocationKnown { .. } => {
                "Please share your location first so I can look for toilets near you.".to_string()
            }
            FinderError::CatalogUnavailable { .. } | FinderError::RemoteQueryFailed { .. } => {
                "Some toilet data could not be loaded right now. Results may be incomplete."
                    .to_string()
            }
            FinderError::InvalidRadius { .. }
            | FinderError::InvalidCoordinate { .. }
            | FinderError::Storage { .. }
            | FinderError::Config { .. }
            | FinderError::Io { .. } => "Something went wrong, please try again.".to_string(),
        }
    }
}
