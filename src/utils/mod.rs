//! Shared utilities for source IO and logging

pub mod io;
pub mod logging;
