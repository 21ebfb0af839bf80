// src/main.rs

//! wordstream: GitHub event word harvester CLI
//!
//! Polls the public GitHub events feed, breaks harvested text into word
//! events and publishes them with a short-lived snapshot backlog.

mod cache;
mod error;
mod harvest;
mod models;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::sync::broadcast::error::RecvError;

use crate::cache::{CacheStore, MemoryCache};
use crate::error::Result;
use crate::harvest::{BatchPublisher, Harvester};
use crate::models::Config;

#[derive(Parser, Debug)]
#[command(
    name = "wordstream",
    version = "0.1.0",
    about = "Harvests words from the public GitHub event feed"
)]

/// CLI Arguments
struct Cli {
    #[arg(short, long, default_value = "data/config.toml")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

/// CLI Commands
#[derive(Subcommand, Debug)]
enum Command {
    /// Poll the events feed until interrupted
    Run,
    /// Validate the configuration file
    Validate,
}

/// Main entry point
#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Command::Run => {
            let config = Config::load_or_default(&cli.config);
            run(config).await?;
        }
        Command::Validate => {
            let config = Config::load(&cli.config)?;
            config.validate()?;
            log::info!("Configuration OK");
        }
    }

    Ok(())
}

/// Run the harvester until ctrl-c.
async fn run(config: Config) -> Result<()> {
    config.validate()?;

    let word_batch_ttl = config.ttl.word_batch_secs;
    let config = Arc::new(config);
    let cache: Arc<dyn CacheStore> = Arc::new(MemoryCache::new());
    let publisher = Arc::new(BatchPublisher::new(Arc::clone(&cache), word_batch_ttl));
    let harvester = Arc::new(Harvester::new(
        Arc::clone(&config),
        cache,
        Arc::clone(&publisher),
    )?);

    // Log published batches so a run is observable without a delivery
    // layer attached.
    let mut subscription = publisher.subscribe();
    tokio::spawn(async move {
        loop {
            match subscription.recv().await {
                Ok(batch) => log::info!("Published {} word events", batch.len()),
                Err(RecvError::Lagged(skipped)) => {
                    log::warn!("Subscriber lagged, skipped {skipped} batches");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    Arc::clone(&harvester).start();

    tokio::signal::ctrl_c().await?;
    harvester.stop();

    Ok(())
}
