//! Structured logging for the panorama splat pipeline.
//!
//! Installs a `tracing` subscriber with console output (uptime timestamps and
//! module paths) plus, in debug builds, a JSON log file for post-mortem
//! analysis of a stitching run. The level comes from `RUST_LOG` when set,
//! otherwise from the config's `debug.log_level`.

use pano_config::Config;
use std::path::Path;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when neither `RUST_LOG` nor the config provide one.
const DEFAULT_FILTER: &str = "info";

/// Name of the JSON log file written in debug builds.
pub const LOG_FILE_NAME: &str = "pano-splat.log";

/// Initialize the global tracing subscriber.
///
/// * `log_dir` - Directory for the JSON log file (debug builds only)
/// * `debug_build` - Whether this is a debug build (enables file logging)
/// * `config` - Optional configuration supplying the log level
///
/// # Examples
///
/// ```no_run
/// use pano_config::Config;
/// use pano_log::init_logging;
///
/// let config = Config::default();
/// init_logging(Some(std::path::Path::new("./logs")), true, Some(&config));
/// ```
pub fn init_logging(log_dir: Option<&Path>, debug_build: bool, config: Option<&Config>) {
    let filter_str = filter_string(config);

    // RUST_LOG wins over the configured level
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    let console_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(true) // job workers are named after their job id
        .with_level(true)
        .with_timer(fmt::time::uptime());

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer);

    if debug_build
        && let Some(log_dir) = log_dir
        && std::fs::create_dir_all(log_dir).is_ok()
        && let Ok(log_file) = std::fs::File::create(log_dir.join(LOG_FILE_NAME))
    {
        let file_layer = fmt::layer()
            .with_writer(log_file)
            .with_ansi(false)
            .with_target(true)
            .with_timer(fmt::time::uptime())
            .json();

        subscriber.with(file_layer).init();
        return;
    }

    subscriber.init();
}

/// Resolve the filter directive string from the config, falling back to `info`.
fn filter_string(config: Option<&Config>) -> String {
    match config {
        Some(config) if !config.debug.log_level.trim().is_empty() => {
            config.debug.log_level.clone()
        }
        _ => DEFAULT_FILTER.to_string(),
    }
}

/// Create an `EnvFilter` with the default filter string.
pub fn default_env_filter() -> EnvFilter {
    EnvFilter::new(DEFAULT_FILTER)
}
