//! Unified error type for the gridkit pipeline.
//!
//! Every stage returns [`GridResult`]. Malformed input geometry is not an
//! error here: ingestion repairs or drops it and records a diagnostic.
//! What does surface as an error is anything that must halt the pipeline:
//! a failed batch, a broken topology handed to a consumer that needs full
//! connectivity, or an invalid configuration.
//!
//! # Example
//!
//! ```ignore
//! use gridkit_core::{GridError, GridResult};
//!
//! fn publish_checked(report: &IntegrityReport) -> GridResult<()> {
//!     report.require_sound()?;
//!     Ok(())
//! }
//! ```

use crate::batch::{BatchRange, Stage};
use thiserror::Error;

/// Unified error type for all gridkit operations.
#[derive(Error, Debug)]
pub enum GridError {
    /// I/O errors (file access, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parsing/deserialization errors
    #[error("Parse error: {0}")]
    Parse(String),

    /// Data validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Geometry that cannot be processed even after repair
    #[error("Geometry error: {0}")]
    Geometry(String),

    /// Topology defects (ghost edges, orphan vertices, missing derived state)
    #[error("Topology error: {0}")]
    Topology(String),

    /// Storage provider / transaction failures
    #[error("Storage error: {0}")]
    Storage(String),

    /// A batch failed; the whole stage is aborted.
    #[error("stage '{stage}' aborted in batch {range}: {source}")]
    Batch {
        stage: Stage,
        range: BatchRange,
        #[source]
        source: Box<GridError>,
    },

    /// Generic errors (for wrapping external errors)
    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for Results using GridError.
pub type GridResult<T> = Result<T, GridError>;

impl GridError {
    /// Wrap an error raised while processing `range` of `stage`.
    pub fn in_batch(stage: Stage, range: BatchRange, source: GridError) -> Self {
        GridError::Batch {
            stage,
            range,
            source: Box::new(source),
        }
    }
}

impl From<anyhow::Error> for GridError {
    fn from(err: anyhow::Error) -> Self {
        GridError::Other(err.to_string())
    }
}

impl From<String> for GridError {
    fn from(s: String) -> Self {
        GridError::Other(s)
    }
}

impl From<&str> for GridError {
    fn from(s: &str) -> Self {
        GridError::Other(s.to_string())
    }
}

impl From<serde_json::Error> for GridError {
    fn from(err: serde_json::Error) -> Self {
        GridError::Parse(err.to_string())
    }
}

impl From<toml::de::Error> for GridError {
    fn from(err: toml::de::Error) -> Self {
        GridError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for GridError {
    fn from(err: toml::ser::Error) -> Self {
        GridError::Config(err.to_string())
    }
}
