//! Pipeline orchestration.
//!
//! Each source has one orchestrator that builds all of its tables and then
//! persists them. Tables are only written once every table of the
//! orchestrator has been built, and previous output is only replaced once
//! every table has been staged, so a failing build or write leaves previous
//! output in place. The four orchestrators run concurrently inside the
//! session pool.

pub mod demographics;
pub mod immigration;
pub mod labels;
pub mod temperature;

use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use indicatif::ProgressBar;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::config::WarehouseConfig;
use crate::error::{Result, WarehouseError};
use crate::table::Table;
use crate::utils::io::write_tables;
use crate::utils::logging::log_pipeline_complete;

/// A configured run owning the worker pool
///
/// The pool is released when the session is dropped.
pub struct Session {
    config: WarehouseConfig,
    pool: ThreadPool,
}

impl Session {
    pub fn new(config: WarehouseConfig) -> Result<Self> {
        let threads = config.threads.unwrap_or_else(num_cpus::get);
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|idx| format!("warehouse-{idx}"))
            .build()
            .map_err(|e| WarehouseError::Config(format!("Cannot start thread pool: {e}")))?;

        log::info!(
            "Opened session with {} threads, writing to {}",
            pool.current_num_threads(),
            config.output_root.display()
        );
        if let Some(credentials) = &config.credentials {
            log::debug!("Object store credentials loaded: {credentials:?}");
        }
        Ok(Self { config, pool })
    }

    #[must_use]
    pub fn config(&self) -> &WarehouseConfig {
        &self.config
    }

    #[must_use]
    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Run `op` inside the session pool
    pub fn install<R: Send>(&self, op: impl FnOnce() -> R + Send) -> R {
        self.pool.install(op)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("threads", &self.threads())
            .finish()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        log::debug!("Closing session");
    }
}

/// The four source orchestrators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pipeline {
    Temperature,
    Demographics,
    Immigration,
    Labels,
}

impl Pipeline {
    pub const ALL: [Self; 4] = [
        Self::Temperature,
        Self::Demographics,
        Self::Immigration,
        Self::Labels,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Temperature => "temperature",
            Self::Demographics => "demographics",
            Self::Immigration => "immigration",
            Self::Labels => "labels",
        }
    }

    /// Build the tables of this pipeline without writing them
    pub fn build(self, config: &WarehouseConfig) -> Result<Vec<Table>> {
        match self {
            Self::Temperature => temperature::build(config),
            Self::Demographics => demographics::build(config),
            Self::Immigration => immigration::build(config),
            Self::Labels => labels::build(config),
        }
    }

    /// Build and persist the tables of this pipeline
    pub fn run(self, config: &WarehouseConfig) -> Result<PipelineReport> {
        let start = Instant::now();
        log::info!("Starting {} pipeline", self.name());

        let build_and_write = || -> Result<Vec<(PathBuf, usize)>> {
            let tables = self.build(config)?;
            write_tables(&tables, &config.output_root)
        };
        let tables = build_and_write().map_err(|e| e.in_pipeline(self.name()))?;

        let elapsed = start.elapsed();
        log_pipeline_complete(self.name(), tables.len(), elapsed);
        Ok(PipelineReport {
            pipeline: self,
            tables,
            elapsed,
        })
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of one successful pipeline run
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub pipeline: Pipeline,
    /// Written table directories with their row counts
    pub tables: Vec<(PathBuf, usize)>,
    pub elapsed: Duration,
}

/// Run every pipeline concurrently in the session pool
///
/// All pipelines run to completion. If any failed, every failure is logged and
/// the first one, in [`Pipeline::ALL`] order, is returned.
pub fn run_all(session: &Session, progress: &ProgressBar) -> Result<Vec<PipelineReport>> {
    let config = session.config();
    let mut outcomes: Vec<Option<Result<PipelineReport>>> =
        Pipeline::ALL.iter().map(|_| None).collect();

    session.install(|| {
        rayon::scope(|scope| {
            for (slot, pipeline) in outcomes.iter_mut().zip(Pipeline::ALL) {
                scope.spawn(move |_| {
                    progress.set_message(format!("running {pipeline}"));
                    *slot = Some(pipeline.run(config));
                    progress.inc(1);
                });
            }
        });
    });

    let mut reports = Vec::with_capacity(outcomes.len());
    let mut first_error = None;
    for outcome in outcomes.into_iter().flatten() {
        match outcome {
            Ok(report) => reports.push(report),
            Err(error) => {
                log::error!("{error}");
                first_error.get_or_insert(error);
            }
        }
    }

    match first_error {
        Some(error) => Err(error),
        None => Ok(reports),
    }
}
