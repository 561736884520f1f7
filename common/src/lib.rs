//! Shared pieces of the ftpath tools: canonical local paths and logging setup.

use anyhow::Context;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub mod config;
pub mod local_path;

pub use config::{OutputConfig, TracingConfig};
pub use local_path::{Flavor, LocalPath};

/// Install the global tracing subscriber.
///
/// Logs go to stderr filtered by `RUST_LOG` if set, else by the configured verbosity. A debug
/// log file, if configured, receives everything down to trace level.
pub fn init_logging(output: &OutputConfig, tracing_config: &TracingConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(output.filter_directive()));
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(output.verbose >= 2)
        .with_file(output.verbose >= 3)
        .with_line_number(output.verbose >= 3)
        .with_filter(filter);
    let file_layer = match &tracing_config.debug_log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open debug log file {path:?}"))?;
            Some(
                fmt::layer()
                    .with_writer(std::sync::Mutex::new(file))
                    .with_ansi(false)
                    .with_filter(EnvFilter::new("trace")),
            )
        }
        None => None,
    };
    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("failed to install the tracing subscriber")?;
    Ok(())
}
