//! Coordinator server: accept loop and role handshake
//!
//! Every inbound connection declares its role with its first line:
//! `WORKER[|id]` registers a shard worker, `CLIENT_BANK...` /
//! `CLIENT_CHAT...` enters the client command loop, anything else is
//! rejected. Each worker gets a drain task that forwards its inbound
//! lines into the handle's channel; that task is the only detector of
//! worker disconnection and the only trigger of unregistration.

use crate::common::{protocol, CoordinatorConfig, Result};
use crate::coordinator::dispatch::ClientSession;
use crate::coordinator::registry::{WorkerHandle, WorkerRegistry};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use uuid::Uuid;

pub struct Coordinator {
    config: CoordinatorConfig,
}

impl Coordinator {
    pub fn new(config: CoordinatorConfig) -> Self {
        Self { config }
    }

    /// Bind the listener without serving yet, so callers (tests in
    /// particular) can bind port 0 and read the ephemeral address.
    pub async fn bind(self) -> Result<BoundCoordinator> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        Ok(BoundCoordinator {
            listener,
            registry: Arc::new(WorkerRegistry::new()),
            config: self.config,
        })
    }

    pub async fn serve(self) -> Result<()> {
        self.bind().await?.serve().await
    }
}

pub struct BoundCoordinator {
    listener: TcpListener,
    registry: Arc<WorkerRegistry>,
    config: CoordinatorConfig,
}

impl BoundCoordinator {
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn registry(&self) -> Arc<WorkerRegistry> {
        self.registry.clone()
    }

    pub async fn serve(self) -> Result<()> {
        tracing::info!("Starting coordinator");
        tracing::info!("  Endpoint: {}", self.listener.local_addr()?);
        tracing::info!("  RPC timeout: {}ms", self.config.rpc_timeout_ms);
        tracing::info!("  Audit timeout: {}ms", self.config.audit_timeout_ms);

        loop {
            // Accept failures are transient; only a failed bind is fatal
            let (stream, peer) = match self.listener.accept().await {
                Ok(pair) => pair,
                Err(e) => {
                    tracing::warn!(error = %e, "accept failed");
                    continue;
                }
            };
            let registry = self.registry.clone();
            let config = self.config.clone();
            tokio::spawn(async move {
                handle_connection(stream, peer, registry, config).await;
            });
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    registry: Arc<WorkerRegistry>,
    config: CoordinatorConfig,
) {
    let (read_half, write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();

    let role_line = match lines.next_line().await {
        Ok(Some(line)) => line,
        _ => return,
    };

    if let Some(rest) = role_line.strip_prefix("WORKER") {
        let id = rest
            .strip_prefix(protocol::DELIM)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("worker-{}", Uuid::new_v4()));
        register_worker(id, lines, write_half, registry);
    } else if role_line.starts_with("CLIENT_BANK") || role_line.starts_with("CLIENT_CHAT") {
        tracing::info!(%peer, role = %role_line, "client connected");
        let session = ClientSession::new(registry, config);
        match session.run(lines, write_half).await {
            Ok(()) => tracing::info!(%peer, "client disconnected"),
            Err(e) => tracing::debug!(%peer, error = %e, "client loop ended"),
        }
    } else {
        tracing::warn!(%peer, role = %role_line, "unknown role rejected");
        let mut writer = write_half;
        let _ = writer
            .write_all(format!("{}\n", protocol::UNKNOWN_ROLE).as_bytes())
            .await;
    }
}

/// Register a worker and spawn its drain task. The drain task forwards
/// every line the worker writes into the handle's reply channel; the RPC
/// gateway reads from that channel under the handle's exchange lock. When
/// the stream closes or errors the task drops the sender, which fails any
/// in-flight exchange, and unregisters the worker.
fn register_worker(
    id: String,
    mut lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
    registry: Arc<WorkerRegistry>,
) {
    let (tx, rx) = mpsc::channel(16);
    let handle = Arc::new(WorkerHandle::new(id.clone(), writer, rx));
    registry.register(handle.clone());

    tokio::spawn(async move {
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if tx.send(line).await.is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::debug!(worker = %id, error = %e, "worker stream error");
                    break;
                }
            }
        }
        registry.unregister(&handle);
    });
}
