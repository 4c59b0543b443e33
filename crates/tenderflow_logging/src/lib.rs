//! Logging initialization shared by the tenderflow binary.

use anyhow::{Context, Result};
use chrono::Local;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_LOG_FILTER: &str = "tenderflow_cli=info,tenderflow_ingest=info,tenderflow_infer=info,tenderflow_db=info";

/// Logging configuration for one run of the importer.
pub struct LogConfig<'a> {
    pub log_path: &'a Path,
    pub verbose: bool,
}

/// Initializes `tracing` with a run-named log file under `log_path` and a
/// mirrored stderr layer. Returns the worker guard; it must stay alive for
/// the duration of the process or buffered lines are dropped on exit.
pub fn init_logging(config: LogConfig<'_>) -> Result<WorkerGuard> {
    std::fs::create_dir_all(config.log_path)
        .with_context(|| format!("failed to create log directory {}", config.log_path.display()))?;

    let file_name = run_log_file_name();
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(config.log_path.join(&file_name))
        .with_context(|| format!("failed to open log file {file_name}"))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    let base_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let console_filter = if config.verbose {
        EnvFilter::new(DEFAULT_LOG_FILTER)
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(base_filter),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(console_filter),
        )
        .init();

    Ok(guard)
}

fn run_log_file_name() -> String {
    format!("import_{}.log", Local::now().format("%Y%m%d_%H%M%S"))
}

/// Default log directory used when `LOG_PATH` is unset: `./logs`.
pub fn default_log_path() -> PathBuf {
    PathBuf::from("./logs")
}
