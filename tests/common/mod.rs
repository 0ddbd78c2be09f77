//! Shared harness: ephemeral-port coordinator, scripted mock workers and
//! a line-protocol test client.

#![allow(dead_code)]

use shardbank::common::CoordinatorConfig;
use shardbank::coordinator::{Coordinator, WorkerRegistry};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

/// Coordinator config with short deadlines so failure paths don't stall
/// the suite.
pub fn fast_config() -> CoordinatorConfig {
    CoordinatorConfig {
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        query_timeout_ms: 500,
        rpc_timeout_ms: 500,
        compensate_timeout_ms: 500,
        record_timeout_ms: 300,
        audit_timeout_ms: 500,
    }
}

/// Bind a coordinator on an ephemeral port and serve it in the
/// background.
pub async fn spawn_coordinator(config: CoordinatorConfig) -> (SocketAddr, Arc<WorkerRegistry>) {
    let bound = Coordinator::new(config).bind().await.unwrap();
    let addr = bound.local_addr().unwrap();
    let registry = bound.registry();
    tokio::spawn(async move {
        let _ = bound.serve().await;
    });
    (addr, registry)
}

/// Wait until `expected` workers are registered. Registration happens on
/// the coordinator's accept task, so joins are only ordered once the
/// count is observed.
pub async fn wait_for_workers(registry: &WorkerRegistry, expected: usize) {
    for _ in 0..200 {
        if registry.count() == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("expected {} registered workers", expected);
}

/// What a mock worker does with one received command.
pub enum ScriptAction {
    Reply(String),
    ReplyAfter(String, Duration),
    /// Never reply (provokes an RPC timeout)
    Ignore,
    /// Drop the connection (provokes WorkerUnavailable)
    Close,
}

/// A scripted worker: registers over real TCP and answers each command
/// according to its script, recording everything it receives.
pub struct MockWorker {
    pub id: String,
    received: Arc<Mutex<Vec<String>>>,
}

impl MockWorker {
    pub async fn join(
        addr: SocketAddr,
        id: &str,
        script: impl Fn(&str) -> ScriptAction + Send + 'static,
    ) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (read_half, mut writer) = stream.into_split();
        writer
            .write_all(format!("WORKER|{}\n", id).as_bytes())
            .await
            .unwrap();

        let received = Arc::new(Mutex::new(Vec::new()));
        let log = received.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(read_half).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                log.lock().unwrap().push(line.clone());
                let reply = match script(&line) {
                    ScriptAction::Reply(reply) => reply,
                    ScriptAction::ReplyAfter(reply, delay) => {
                        tokio::time::sleep(delay).await;
                        reply
                    }
                    ScriptAction::Ignore => continue,
                    ScriptAction::Close => break,
                };
                if writer
                    .write_all(format!("{}\n", reply).as_bytes())
                    .await
                    .is_err()
                {
                    break;
                }
            }
        });

        Self {
            id: id.to_string(),
            received,
        }
    }

    /// Every command line this worker has received so far.
    pub fn received(&self) -> Vec<String> {
        self.received.lock().unwrap().clone()
    }
}

/// Script answering every command with `OK|<worker id>|<command>`, so
/// tests can assert both routing and request/response pairing.
pub fn echo_ok(id: &str) -> impl Fn(&str) -> ScriptAction + Send + 'static {
    let id = id.to_string();
    move |cmd| ScriptAction::Reply(format!("OK|{}|{}", id, cmd))
}

/// A bank client speaking the line protocol.
pub struct TestClient {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl TestClient {
    pub async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (read_half, mut writer) = stream.into_split();
        writer.write_all(b"CLIENT_BANK|test\n").await.unwrap();
        let mut lines = BufReader::new(read_half).lines();
        let welcome = lines.next_line().await.unwrap().unwrap();
        assert_eq!(welcome, "WELCOME|shardbank-coord");
        Self { lines, writer }
    }

    pub async fn send(&mut self, line: &str) {
        self.writer
            .write_all(format!("{}\n", line).as_bytes())
            .await
            .unwrap();
    }

    pub async fn read_line(&mut self) -> String {
        self.lines.next_line().await.unwrap().unwrap()
    }

    /// Send one command and read its single reply line.
    pub async fn request(&mut self, line: &str) -> String {
        self.send(line).await;
        self.read_line().await
    }
}
