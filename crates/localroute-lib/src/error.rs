use std::path::PathBuf;

use thiserror::Error;

use crate::network::NodeId;

/// Convenient result alias for the localroute library.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level library error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Reference data (gazetteer or road network) was unreadable, malformed or empty.
    #[error("failed to load {source_name}: {message}")]
    DataLoad {
        source_name: String,
        message: String,
    },

    /// A geocoding query was structurally invalid.
    #[error("invalid query: {reason}")]
    InvalidQuery { reason: String },

    /// Route planning needs at least two waypoints.
    #[error("at least two waypoints are required, got {count}")]
    InvalidWaypoints { count: usize },

    /// A coordinate fell outside the valid latitude/longitude range.
    #[error("invalid coordinate ({latitude}, {longitude})")]
    InvalidCoordinate { latitude: f64, longitude: f64 },

    /// No network node could be found near a coordinate.
    #[error("no road network node near ({latitude:.6}, {longitude:.6})")]
    NoReachablePoint { latitude: f64, longitude: f64 },

    /// Two snapped nodes live in disconnected parts of the network.
    #[error("no path between node {from} and node {to} (leg {leg})")]
    Unreachable { leg: usize, from: NodeId, to: NodeId },

    /// An address could not be resolved against the gazetteer.
    #[error("could not resolve address '{address}'{}", format_suggestions(.suggestions))]
    GeocodingFailed {
        address: String,
        suggestions: Vec<String>,
    },

    /// Trip scheduling was given unusable parameters.
    #[error("invalid trip parameters: {message}")]
    InvalidTripParameters { message: String },

    /// Raised when serializing a spatial index fails.
    #[error("failed to serialize spatial index: {message}")]
    SpatialIndexSerialize { message: String },

    /// Raised when loading a spatial index from a file fails.
    #[error("failed to load spatial index from {path}: {message}")]
    SpatialIndexLoad { path: PathBuf, message: String },

    /// Wrapper for SQLite errors.
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    /// Wrapper for IO errors.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build a [`Error::DataLoad`] for the named source.
    pub fn data_load(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Error::DataLoad {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Stable snake_case label for the error, used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::DataLoad { .. } => "data_load",
            Error::InvalidQuery { .. } => "invalid_query",
            Error::InvalidWaypoints { .. } => "invalid_waypoints",
            Error::InvalidCoordinate { .. } => "invalid_coordinate",
            Error::NoReachablePoint { .. } => "no_reachable_point",
            Error::Unreachable { .. } => "unreachable",
            Error::GeocodingFailed { .. } => "geocoding_failed",
            Error::InvalidTripParameters { .. } => "invalid_trip_parameters",
            Error::SpatialIndexSerialize { .. } | Error::SpatialIndexLoad { .. } => {
                "spatial_index"
            }
            Error::Sqlite(_) => "sqlite",
            Error::Io(_) => "io",
        }
    }

    /// Whether the caller supplied the bad input (as opposed to a data or internal fault).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidQuery { .. }
                | Error::InvalidWaypoints { .. }
                | Error::InvalidCoordinate { .. }
                | Error::NoReachablePoint { .. }
                | Error::Unreachable { .. }
                | Error::GeocodingFailed { .. }
                | Error::InvalidTripParameters { .. }
        )
    }
}

fn format_suggestions(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else if suggestions.len() == 1 {
        format!(". Did you mean '{}'?", suggestions[0])
    } else {
        format!(
            ". Did you mean one of: {}?",
            suggestions
                .iter()
                .map(|s| format!("'{}'", s))
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}
