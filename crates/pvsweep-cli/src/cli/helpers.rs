use super::CliError;
use pvsweep_core::domain::{ArrayShape, PvError};
use std::fs::File;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{Layer, fmt};

/// Installs the stderr layer (`RUST_LOG`, default `info`) and a debug-level
/// plain-text layer writing to `log_file`, which is truncated first.
pub(super) fn init_logging(log_file: &Path) -> Result<(), CliError> {
    let file = File::create(log_file).map_err(|source| {
        CliError::Pipeline(PvError::io_system(
            "IO.LOG_FILE",
            format!(
                "failed to open log file '{}': {}",
                log_file.display(),
                source
            ),
        ))
    })?;

    let stderr_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(stderr_filter);
    let file_layer = fmt::layer()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_filter(LevelFilter::DEBUG);

    if tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .is_err()
    {
        tracing::debug!("logging was already initialized; keeping the existing subscriber");
    }
    Ok(())
}

/// clap value parser for `RxC` labels.
pub(super) fn parse_shape_label(value: &str) -> Result<String, String> {
    let label = value.trim();
    ArrayShape::parse_label(label)
        .map(|shape| shape.label())
        .ok_or_else(|| format!("'{}' is not a '<series>x<parallel>' shape", label))
}

/// clap value parser for positive cell counts.
pub(super) fn parse_cell_count(value: &str) -> Result<u32, String> {
    match value.trim().parse::<u32>() {
        Ok(count) if count > 0 => Ok(count),
        _ => Err(format!("'{}' is not a positive cell count", value.trim())),
    }
}

pub(super) fn render_json<T: serde::Serialize>(value: &T) -> Result<String, CliError> {
    serde_json::to_string_pretty(value)
        .map_err(|source| CliError::Internal(anyhow::Error::new(source).context("failed to render summary")))
}
