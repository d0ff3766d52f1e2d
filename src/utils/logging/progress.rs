//! Progress reporting for pipeline runs
//!
//! Uses indicatif; bars draw to stderr and are hidden when it is not a terminal.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

/// Template for the pipeline progress bar
pub const PIPELINE_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} pipelines {msg}";

/// Create a progress bar counting finished pipelines
#[must_use]
pub fn create_pipeline_progress_bar(length: u64) -> ProgressBar {
    let pb = ProgressBar::new(length);
    // A malformed template falls back to the default style
    if let Ok(style) = ProgressStyle::default_bar().template(PIPELINE_TEMPLATE) {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Finish a progress bar with a completion message
pub fn finish_progress_bar(pb: &ProgressBar, message: Option<&str>) {
    if let Some(msg) = message {
        pb.finish_with_message(msg.to_string());
    } else {
        pb.finish();
    }
}
