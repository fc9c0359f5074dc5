//! Airport Globe - Main entry point
//!
//! Registers the airport data source with a headless globe viewer, loads the
//! configured dataset and serves the entities over a REST API.

mod api;
mod config;
mod server;
mod state;
mod viewer;

use airport_globe_core::DataSource;
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "airport-globe")]
#[command(about = "Airport dataset source for 3D globe viewers")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "airport-globe.toml")]
    config: PathBuf,

    /// Bind address for web server
    #[arg(short, long)]
    bind: Option<String>,

    /// Dataset URL (overrides [dataset] url)
    #[arg(short, long)]
    url: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Load the dataset once, print a summary and exit
    #[arg(long)]
    load_once: bool,

    /// Write a default configuration file to --config and exit
    #[arg(long)]
    init_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Airport Globe v{}", env!("CARGO_PKG_VERSION"));

    if args.init_config {
        config::save_default_config(&args.config)
            .with_context(|| format!("Failed to write {}", args.config.display()))?;
        info!(path = %args.config.display(), "Wrote default configuration");
        return Ok(());
    }

    let mut config = config::load_config(&args.config)?;

    if let Some(bind) = args.bind {
        config.daemon.bind = bind;
    }
    if let Some(url) = args.url {
        config.dataset.url = url;
    }

    info!(
        url = %config.dataset.url,
        bind = %config.daemon.bind,
        "Configuration loaded"
    );

    let state = state::AppState::new(config.clone())?;

    if args.load_once {
        let count = state
            .reload(None)
            .await
            .with_context(|| format!("Failed to load {}", config.dataset.url))?;
        println!("Loaded {} airports into '{}':", count, state.airports.name());
        for entity in state.airports.entities().values() {
            println!(
                "  - {} ({}) at ({:.0}, {:.0}, {:.0})",
                entity.name,
                entity.id,
                entity.position.x,
                entity.position.y,
                entity.position.z
            );
        }
    } else {
        server::run(state, &config.daemon.bind).await?;
    }

    Ok(())
}
