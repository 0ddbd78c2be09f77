//! Shard worker binary

use clap::{Parser, Subcommand};
use shardbank::{common::Config, WorkerNode};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "shardbank-worker")]
#[command(about = "shardbank reference shard worker with an in-memory ledger")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the worker and register with the coordinator
    Serve {
        /// Worker id announced during registration
        #[arg(long)]
        id: Option<String>,

        /// Coordinator address to dial
        #[arg(long)]
        coordinator: Option<String>,

        /// JSON snapshot path for the ledger
        #[arg(long)]
        data: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            id,
            coordinator,
            data,
        } => {
            let mut config = Config::load().worker;
            if id.is_some() {
                config.worker_id = id;
            }
            if let Some(coordinator) = coordinator {
                config.coordinator_addr = coordinator;
            }
            if data.is_some() {
                config.data_path = data;
            }

            let worker = WorkerNode::new(config);
            worker.serve().await?;
        }
    }

    Ok(())
}
