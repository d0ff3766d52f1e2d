//! Logging utilities for output and progress tracking

pub mod log;
pub mod progress;

pub use log::{log_operation_complete, log_operation_start, log_pipeline_complete, log_warning};
pub use progress::{create_pipeline_progress_bar, finish_progress_bar};
