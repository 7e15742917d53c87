//! Ramp daemon - adaptive onboarding engine behind an HTTP API.

use anyhow::Result;
use clap::Parser;
use rampd::backend::HttpContentSource;
use rampd::config::{RampdConfig, CONFIG_PATH};
use rampd::notify::Notifier;
use rampd::server::{self, AppState};
use rampd::store::{FlushQueue, ProfileStore};
use ramp_core::Engine;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "rampd", version, about = "Adaptive onboarding daemon")]
struct Args {
    /// Path to the config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the listen address from the config.
    #[arg(long)]
    listen: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("rampd v{} starting", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();
    let config_path = args
        .config
        .unwrap_or_else(|| PathBuf::from(CONFIG_PATH));
    let mut config = RampdConfig::load(&config_path)?;
    if let Some(listen) = args.listen {
        config.listen_addr = listen;
    }

    let source = HttpContentSource::new(
        &config.backend.base_url,
        Duration::from_secs(config.backend.timeout_secs),
    );
    let engine = Engine::new(source, Duration::from_secs(config.cache_ttl_secs));
    let store = Arc::new(ProfileStore::new(Path::new(&config.data_dir)));
    let flush = FlushQueue::new(
        Arc::clone(&store),
        Duration::from_secs(config.flush_quiet_secs),
    );
    let notifier = Notifier::new(config.webhook_url.clone());

    let state = Arc::new(AppState {
        engine: Mutex::new(engine),
        profiles: Mutex::new(HashMap::new()),
        store,
        flush,
        notifier,
        tier_settle: Duration::from_millis(config.tier_settle_ms),
    });

    server::run(state, &config.listen_addr).await?;
    info!("rampd stopped");
    Ok(())
}
