//! auto-assembly CLI
//!
//! Usage:
//!   auto-assembly mirror <ref>...          Mirror relationships across part studios
//!   auto-assembly auto-assembly <ref>...   Mate targets, mirrors and resolved target mates
//!
//! A `<ref>` is `d/<did>/w/<wid>/e/<eid>`. Configuration comes from the
//! environment (see `EngineConfig`), with `.env` loaded first.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::collections::HashSet;
use tracing::info;
use tracing_subscriber::EnvFilter;

use auto_assembly::{DocumentRef, EngineConfig, Orchestrator};

#[derive(Parser)]
#[command(name = "auto-assembly", version, about = "Evaluate part studios into assembly mate maps")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Discover mirror relationships
    Mirror {
        #[arg(required = true)]
        part_studios: Vec<DocumentRef>,
    },
    /// Discover mate targets and resolve them against their part studios
    AutoAssembly {
        #[arg(required = true)]
        part_studios: Vec<DocumentRef>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("auto_assembly=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = EngineConfig::from_env()?;
    info!(
        "Using {} (scripts: {:?}, concurrency: {})",
        config.base_url, config.script_dir, config.concurrency
    );

    let orchestrator = Orchestrator::from_config(&config)?;

    let output = match cli.command {
        Command::Mirror { part_studios } => {
            let part_studios: HashSet<DocumentRef> = part_studios.into_iter().collect();
            let relationship = orchestrator.mirror(&part_studios).await?;
            serde_json::to_string_pretty(&relationship)
        }
        Command::AutoAssembly { part_studios } => {
            let part_studios: HashSet<DocumentRef> = part_studios.into_iter().collect();
            let outcome = orchestrator.auto_assembly(&part_studios).await?;
            serde_json::to_string_pretty(&outcome)
        }
    }
    .context("Failed to serialize result")?;

    println!("{}", output);
    Ok(())
}
