use std::fs;

use anyhow::{Context, Result};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::paths;

/// Install the process subscriber.
///
/// Console output always goes to stderr; stdout carries the event stream.
/// With `log_to_file`, logs are also written to `{config_dir}/logs/` with
/// daily rotation, keeping the latest 5 files. `RUST_LOG` overrides the
/// default `info` filter.
pub fn init(log_to_file: bool) -> Result<()> {
    let file_layer = if log_to_file {
        let log_dir = paths::get_log_dir();
        fs::create_dir_all(&log_dir)
            .with_context(|| format!("Failed to create {}", log_dir.display()))?;

        let file_appender = RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix("mouse-hook")
            .filename_suffix("log")
            .max_log_files(5)
            .build(&log_dir)
            .context("Failed to create log file appender")?;

        Some(
            fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_target(true)
                .with_file(true)
                .with_line_number(true),
        )
    } else {
        None
    };

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .compact();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .context("Logger already initialized")?;

    if log_to_file {
        tracing::info!(log_dir = %paths::get_log_dir().display(), "File logging enabled");
    }
    Ok(())
}
