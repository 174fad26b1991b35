//! Error taxonomy for scenario synthesis.
//!
//! Every failure the engine can surface maps onto one [`ErrorKind`]. Callers
//! (the CLI, or an API layer) decide exit codes or status mapping from the
//! kind; the engine itself never does.

use std::path::PathBuf;
use std::time::Duration;

use crate::request::GeoPoint;

/// Coarse classification of a [`SynthesisError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    AssetMissing,
    GeoResolutionFailure,
    ExternalToolFailure,
    ConfigurationError,
    Internal,
}

/// Failures raised while synthesizing a scenario.
#[derive(Debug, thiserror::Error)]
pub enum SynthesisError {
    #[error("map asset not found: {}", path.display())]
    MapNotFound { path: PathBuf },

    #[error("failed to load road network {}: {reason}", path.display())]
    NetworkUnreadable { path: PathBuf, reason: String },

    #[error("no drivable lane within {max_radius} units of ({}, {})", point.lat, point.lng)]
    GeoResolution { point: GeoPoint, max_radius: f64 },

    #[error("all {requested} requested routes were skipped; no traffic left to simulate")]
    NoResolvableRoutes { requested: usize },

    #[error("{tool} exited with status {status}: {diagnostic}")]
    ToolFailed {
        tool: String,
        status: String,
        diagnostic: String,
    },

    #[error("{tool} timed out after {:.1}s", timeout.as_secs_f64())]
    ToolTimedOut { tool: String, timeout: Duration },

    #[error("{tool} produced no output file")]
    ToolProducedNothing { tool: String },

    #[error("invalid vehicle allocation: {0}")]
    Allocation(ValidationError),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("archive entry {path} would be written twice")]
    DuplicateEntry { path: String },

    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("metadata serialization failed: {0}")]
    Metadata(#[from] serde_json::Error),
}

impl SynthesisError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MapNotFound { .. } | Self::NetworkUnreadable { .. } => ErrorKind::AssetMissing,
            Self::GeoResolution { .. } | Self::NoResolvableRoutes { .. } => {
                ErrorKind::GeoResolutionFailure
            }
            Self::ToolFailed { .. }
            | Self::ToolTimedOut { .. }
            | Self::ToolProducedNothing { .. } => ErrorKind::ExternalToolFailure,
            Self::Configuration(_) => ErrorKind::ConfigurationError,
            Self::Allocation(_)
            | Self::DuplicateEntry { .. }
            | Self::Io(_)
            | Self::Archive(_)
            | Self::Metadata(_) => ErrorKind::Internal,
        }
    }

    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}

/// A rejected request, detected before synthesis starts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
