use anyhow::Context;
use log::info;
use par_warehouse::utils::logging::{create_pipeline_progress_bar, finish_progress_bar};
use par_warehouse::{Pipeline, Session, WarehouseConfig, run_all};
use std::time::Instant;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = WarehouseConfig::load().context("Failed to load configuration")?;
    info!(
        "Building warehouse from {} into {}",
        config.input_root.display(),
        config.output_root.display()
    );

    let start = Instant::now();
    let session = Session::new(config).context("Failed to open session")?;
    let progress = create_pipeline_progress_bar(Pipeline::ALL.len() as u64);

    let reports = run_all(&session, &progress).context("Warehouse build failed")?;
    finish_progress_bar(&progress, Some("done"));

    for report in &reports {
        for (path, rows) in &report.tables {
            info!("{}: {} rows in {}", report.pipeline, rows, path.display());
        }
    }
    info!(
        "Built {} tables in {:?}",
        reports.iter().map(|r| r.tables.len()).sum::<usize>(),
        start.elapsed()
    );
    Ok(())
}
