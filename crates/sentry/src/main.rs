//! Sentry - Main Entry Point

use sentry::{init_logging, Collaborators, LogFormat, Pipeline, SentryConfig};
use std::sync::atomic::Ordering;
use tracing::{error, info};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = match SentryConfig::load() {
        Ok(config) => config,
        Err(e) => {
            init_logging(LogFormat::Pretty);
            error!("Refusing to start: {}", e);
            return Err(e.into());
        }
    };
    init_logging(config.log_format);

    info!("=== Sentry Threat Pipeline v{} ===", env!("CARGO_PKG_VERSION"));

    let settings = match config.validate() {
        Ok(settings) => settings,
        Err(e) => {
            error!("Refusing to start: {}", e);
            return Err(e.into());
        }
    };

    // Alert side effects run here; the frame loop stays on this thread
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("sentry-alert")
        .enable_all()
        .build()?;

    let parts = Collaborators::from_config(&config)?;
    let mut pipeline = Pipeline::new(settings, parts, runtime.handle());

    let stop = pipeline.stop_handle();
    runtime.spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received, stopping");
            stop.store(true, Ordering::Release);
        }
    });

    let result = pipeline.run();
    let stats = runtime.block_on(pipeline.shutdown());
    info!(
        "Cycles: {} deadline misses, worst {:?}",
        stats.deadline_misses, stats.worst_cycle
    );

    result?;
    Ok(())
}
