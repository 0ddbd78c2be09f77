//! Shard worker runtime
//!
//! The worker dials the coordinator, registers with `WORKER|<id>`, then
//! answers one command line at a time against its ledger. On connection
//! loss it reconnects after a fixed delay; the ledger survives across
//! sessions (and across restarts when a snapshot path is configured).

use crate::common::protocol::WorkerCommand;
use crate::common::{Error, WorkerConfig, Result};
use crate::worker::ledger::Ledger;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use uuid::Uuid;

pub struct WorkerNode {
    config: WorkerConfig,
}

impl WorkerNode {
    pub fn new(config: WorkerConfig) -> Self {
        Self { config }
    }

    pub async fn serve(self) -> Result<()> {
        let worker_id = self
            .config
            .worker_id
            .clone()
            .unwrap_or_else(|| format!("worker-{}", Uuid::new_v4()));

        tracing::info!("Starting shard worker: {}", worker_id);
        tracing::info!("  Coordinator: {}", self.config.coordinator_addr);
        if let Some(path) = &self.config.data_path {
            tracing::info!("  Snapshot: {}", path.display());
        }

        let mut ledger = Ledger::open(self.config.data_path.clone())?;

        loop {
            match TcpStream::connect(&self.config.coordinator_addr).await {
                Ok(stream) => {
                    tracing::info!(worker = %worker_id, "connected to coordinator");
                    if let Err(e) = run_session(&worker_id, &mut ledger, stream).await {
                        tracing::warn!(worker = %worker_id, error = %e, "session ended");
                    } else {
                        tracing::info!(worker = %worker_id, "coordinator closed the connection");
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        worker = %worker_id,
                        error = %e,
                        "cannot reach coordinator, retrying"
                    );
                }
            }
            tokio::time::sleep(self.config.reconnect_delay()).await;
        }
    }
}

async fn run_session(worker_id: &str, ledger: &mut Ledger, stream: TcpStream) -> Result<()> {
    let (read_half, mut writer) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();

    writer
        .write_all(format!("WORKER|{}\n", worker_id).as_bytes())
        .await?;

    while let Some(line) = lines.next_line().await? {
        if line.is_empty() {
            continue;
        }
        let reply = match WorkerCommand::parse(&line) {
            Ok(cmd) => ledger.apply(&cmd),
            Err(Error::UnknownCommand(op)) => {
                tracing::warn!(worker = %worker_id, %op, "unknown operation");
                "ERROR|UnknownOp".to_string()
            }
            Err(e) => {
                tracing::warn!(worker = %worker_id, command = %line, error = %e, "malformed command");
                "ERROR|FormatoInvalido".to_string()
            }
        };
        writer.write_all(format!("{}\n", reply).as_bytes()).await?;
    }
    Ok(())
}
