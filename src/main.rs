mod cli;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::Parser;
use scribe_core::bootstrap::AppBuilder;
use scribe_core::config::resolve_config_path;

use crate::cli::{Cli, CliChannel};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_path = resolve_config_path(cli.config.as_deref());
    let mut app = AppBuilder::from_path(&config_path)?;

    if let Some(collection) = cli.collection {
        let collection = collection.trim();
        if collection.is_empty() {
            bail!("--collection must not be empty");
        }
        app.config_mut().index.collection = collection.to_owned();
    }

    init_subscriber(app.config().logging.file.as_deref())?;
    tracing::info!(config = %app.config_path().display(), "starting scribe");

    let provider = Arc::new(app.build_provider().await?);
    let store = app.build_store()?;
    let mut session = app.build_session(provider, store, CliChannel::new())?;
    session.run().await?;
    Ok(())
}

fn init_subscriber(log_file: Option<&Path>) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));

    if let Some(path) = log_file {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open log file {}", path.display()))?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(std::sync::Mutex::new(file))
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
    Ok(())
}
