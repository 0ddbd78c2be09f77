//! Coordinator binary

use clap::{Parser, Subcommand};
use shardbank::{common::Config, Coordinator};
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "shardbank-coord")]
#[command(about = "shardbank coordinator: routes account commands to shard workers")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the coordinator server
    Serve {
        /// Bind address for the client/worker endpoint
        #[arg(long)]
        bind: Option<SocketAddr>,

        /// Timeout for debit/credit/loan RPCs, in milliseconds
        #[arg(long)]
        rpc_timeout_ms: Option<u64>,

        /// Timeout for per-worker audit partials, in milliseconds
        #[arg(long)]
        audit_timeout_ms: Option<u64>,
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
            bind,
            rpc_timeout_ms,
            audit_timeout_ms,
        } => {
            // Load config from file/env, then override with CLI arguments
            let mut config = Config::load().coordinator;
            if let Some(bind) = bind {
                config.bind_addr = bind;
            }
            if let Some(ms) = rpc_timeout_ms {
                config.rpc_timeout_ms = ms;
            }
            if let Some(ms) = audit_timeout_ms {
                config.audit_timeout_ms = ms;
            }

            let coord = Coordinator::new(config);
            coord.serve().await?;
        }
    }

    Ok(())
}
