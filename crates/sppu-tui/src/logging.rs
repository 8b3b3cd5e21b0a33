use std::path::Path;

use anyhow::{anyhow, Result};
use tracing_appender::rolling;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const LOG_FILE: &str = "sppu.log";

/// Send tracing output to `<data dir>/sppu.log` so it never draws over the TUI.
/// The filter comes from RUST_LOG and defaults to `info`.
pub fn init() -> Result<()> {
    let Some(log_dir) = sppu_core::config::data_dir() else {
        // Without a data dir there is nowhere safe to write; stay silent
        return Ok(());
    };
    init_in(&log_dir)
}

fn init_in(log_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(log_dir)?;
    let file_appender = rolling::never(log_dir, LOG_FILE);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(
            fmt::Layer::new()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_target(true),
        )
        .with(filter)
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize logging: {}", e))?;

    tracing::debug!(
        target: "sppu::logging",
        path = %log_dir.join(LOG_FILE).display(),
        "Logging initialized"
    );
    Ok(())
}
