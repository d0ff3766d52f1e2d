//! Error handling for the warehouse builder.

use std::io;
use std::path::{Path, PathBuf};

use arrow::error::ArrowError;
use parquet::errors::ParquetError;

/// Errors raised while reading sources, building tables or persisting them
#[derive(Debug, thiserror::Error)]
pub enum WarehouseError {
    /// Input missing, unreadable or malformed at the reader level
    #[error("Failed to read source {}: {message}", path.display())]
    SourceRead { path: PathBuf, message: String },

    /// A label builder requested a section that the parsed text does not contain
    #[error("Label section '{0}' not found")]
    MissingSection(String),

    /// Column lookup, pivot category or other structural problem
    #[error("Schema error: {0}")]
    Schema(String),

    /// Invalid or unreadable configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// An orchestrator aborted
    #[error("Pipeline '{pipeline}' failed: {source}")]
    Pipeline {
        pipeline: &'static str,
        #[source]
        source: Box<WarehouseError>,
    },

    /// Arrow compute or construction error
    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),

    /// Error writing or reading Parquet data
    #[error("Parquet error: {0}")]
    Parquet(#[from] ParquetError),

    /// Filesystem error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl WarehouseError {
    /// Create a source read error for `path`
    pub fn source_read(path: impl AsRef<Path>, message: impl Into<String>) -> Self {
        Self::SourceRead {
            path: path.as_ref().to_path_buf(),
            message: message.into(),
        }
    }

    /// Create a schema error
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema(message.into())
    }

    /// Wrap an error with the name of the orchestrator it aborted
    #[must_use]
    pub fn in_pipeline(self, pipeline: &'static str) -> Self {
        Self::Pipeline {
            pipeline,
            source: Box::new(self),
        }
    }
}

impl From<toml::de::Error> for WarehouseError {
    fn from(error: toml::de::Error) -> Self {
        Self::Config(error.to_string())
    }
}

/// Result type for warehouse operations
pub type Result<T> = std::result::Result<T, WarehouseError>;
