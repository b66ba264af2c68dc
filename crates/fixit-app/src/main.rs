use std::path::PathBuf;

use anyhow::Context;
use fixit_app::snapshot::Snapshot;
use fixit_core::config::load_config;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, reload, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    let (filter_layer, filter_handle) = reload::Layer::new(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true),
        )
        .init();

    let config = load_config()?;

    tracing::info!(config = ?config, "Configuration loaded");

    if let Ok(filter) = EnvFilter::try_new(config.logging.level.as_str()) {
        if let Err(e) = filter_handle.modify(|current| *current = filter) {
            tracing::warn!(error = %e, "Failed to update log filter from config");
        }
    } else {
        tracing::warn!(level = %config.logging.level, "Invalid log level in config, keeping debug");
    }

    let path = std::env::args()
        .nth(1)
        .or_else(|| config.input.snapshot_path.clone())
        .map(PathBuf::from)
        .context("no snapshot given; pass a path or set FIXIT__INPUT__SNAPSHOT_PATH")?;

    tracing::info!(path = %path.display(), "Reading snapshot");

    let snapshot = Snapshot::load(&path)?;
    let markers = snapshot.resolve(&config)?;

    println!("{}", serde_json::to_string_pretty(&markers)?);

    Ok(())
}
