//! Tracing subscriber setup for the CLI.

use std::path::Path;

use anyhow::{Context, Result};
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry};

use crate::config::LeadboardConfig;

pub const LOG_ENV: &str = "LEADBOARD_LOG";
const LOG_FILE_PREFIX: &str = "leadboard.log";

/// Keeps the non-blocking file writer alive; drop it last.
pub struct TelemetryGuard {
    _guards: Vec<tracing_appender::non_blocking::WorkerGuard>,
}

/// Filter directive: `LEADBOARD_LOG`, then `RUST_LOG`, then config/verbosity.
pub fn filter_directive(config: &LeadboardConfig) -> String {
    if let Ok(value) = std::env::var(LOG_ENV)
        && !value.trim().is_empty()
    {
        return value;
    }
    if let Ok(value) = std::env::var(EnvFilter::DEFAULT_ENV)
        && !value.trim().is_empty()
    {
        return value;
    }
    if config.verbose {
        return "debug".to_string();
    }
    config
        .toml
        .logging
        .level
        .clone()
        .unwrap_or_else(|| "warn".to_string())
}

pub fn init(config: &LeadboardConfig) -> Result<TelemetryGuard> {
    let directive = filter_directive(config);
    let filter = EnvFilter::try_new(&directive)
        .with_context(|| format!("Invalid log filter '{}'", directive))?;

    let mut guards = Vec::new();
    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();
    layers.push(stderr_layer(config.json_logs()));

    if let Some(dir) = config.log_dir() {
        let (layer, guard) = file_layer(&dir, config.json_logs())?;
        layers.push(layer);
        guards.push(guard);
    }
    layers.push(Box::new(filter));

    Registry::default()
        .with(layers)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(TelemetryGuard { _guards: guards })
}

fn stderr_layer(json: bool) -> Box<dyn Layer<Registry> + Send + Sync> {
    if json {
        Box::new(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_target(true),
        )
    } else {
        Box::new(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
    }
}

fn file_layer(
    dir: &Path,
    json: bool,
) -> Result<(
    Box<dyn Layer<Registry> + Send + Sync>,
    tracing_appender::non_blocking::WorkerGuard,
)> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
    let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let layer: Box<dyn Layer<Registry> + Send + Sync> = if json {
        Box::new(tracing_subscriber::fmt::layer().json().with_writer(writer))
    } else {
        Box::new(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true),
        )
    };
    Ok((layer, guard))
}
