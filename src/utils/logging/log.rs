//! Logging helpers
//!
//! Shared message formats for reads, writes and pipeline stages.

use std::path::Path;
use std::time::Duration;

/// Log the start of an operation on a path
pub fn log_operation_start(operation: &str, path: &Path) {
    log::info!("{} {}", operation, path.display());
}

/// Log the completion of an operation on a path
///
/// # Arguments
/// * `operation` - Past-tense verb, e.g. `read` or `wrote`
/// * `path` - File or directory operated on
/// * `rows` - Number of rows moved
/// * `elapsed` - Optional elapsed time
pub fn log_operation_complete(operation: &str, path: &Path, rows: usize, elapsed: Option<Duration>) {
    if let Some(duration) = elapsed {
        log::info!(
            "Successfully {} {} rows at {} in {:?}",
            operation,
            rows,
            path.display(),
            duration
        );
    } else {
        log::info!("Successfully {} {} rows at {}", operation, rows, path.display());
    }
}

/// Log a warning, optionally tied to a path
pub fn log_warning(message: &str, path: Option<&Path>) {
    if let Some(path) = path {
        log::warn!("{}: {}", message, path.display());
    } else {
        log::warn!("{message}");
    }
}

/// Log the outcome of one pipeline
pub fn log_pipeline_complete(pipeline: &str, tables: usize, elapsed: Duration) {
    log::info!("Pipeline {pipeline} persisted {tables} tables in {elapsed:?}");
}
