use anyhow::{Context, Result};
use tracing::level_filters::LevelFilter;
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

/// Installs the global subscriber.
///
/// Everything at or above `LOG_LEVEL` goes to `<LOG_DIR>/app.log`, errors are
/// duplicated into `<LOG_DIR>/error.log`. Both roll daily. `RUST_LOG`, when
/// set, wins over `LOG_LEVEL`.
///
/// The returned guards flush the background writers on drop and must be held
/// for the life of the process.
pub fn init(config: &Config) -> Result<Vec<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .context("invalid LOG_LEVEL")?;

    // Rolling daily logs
    let (app_writer, app_guard) =
        tracing_appender::non_blocking(rolling::daily(&config.log_dir, "app.log"));
    let (error_writer, error_guard) =
        tracing_appender::non_blocking(rolling::daily(&config.log_dir, "error.log"));

    let app_layer = fmt::layer()
        .with_writer(app_writer)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_thread_ids(false)
        .with_thread_names(false);

    let error_layer = fmt::layer()
        .with_writer(error_writer)
        .with_ansi(false)
        .with_target(true)
        .with_filter(LevelFilter::ERROR);

    let stdout_layer = config
        .log_stdout
        .then(|| fmt::layer().with_target(false).pretty());

    tracing_subscriber::registry()
        .with(filter)
        .with(app_layer)
        .with(error_layer)
        .with(stdout_layer)
        .try_init()
        .context("failed to install tracing subscriber")?;

    Ok(vec![app_guard, error_guard])
}
