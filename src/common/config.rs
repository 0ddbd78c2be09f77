//! Configuration for shardbank components

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Global configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Coordinator-specific config
    #[serde(default)]
    pub coordinator: CoordinatorConfig,

    /// Worker-specific config
    #[serde(default)]
    pub worker: WorkerConfig,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            coordinator: CoordinatorConfig::default(),
            worker: WorkerConfig::default(),
            log_level: default_log_level(),
        }
    }
}

/// Coordinator configuration
///
/// The timeout fields mirror the per-operation deadlines of the wire
/// protocol: short ones for single-record commands, a longer one for the
/// cluster audit, which may scan a worker's full ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Bind address for the client/worker TCP endpoint
    pub bind_addr: SocketAddr,

    /// Timeout for account queries and creations
    #[serde(default = "default_query_timeout")]
    pub query_timeout_ms: u64,

    /// Timeout for debit/credit/loan mutations
    #[serde(default = "default_rpc_timeout")]
    pub rpc_timeout_ms: u64,

    /// Timeout for the compensating credit of a failed transfer
    #[serde(default = "default_compensate_timeout")]
    pub compensate_timeout_ms: u64,

    /// Timeout for best-effort RECORD_TX notifications
    #[serde(default = "default_record_timeout")]
    pub record_timeout_ms: u64,

    /// Timeout for per-worker ARQUEO partials
    #[serde(default = "default_audit_timeout")]
    pub audit_timeout_ms: u64,
}

fn default_query_timeout() -> u64 {
    3_000
}
fn default_rpc_timeout() -> u64 {
    5_000
}
fn default_compensate_timeout() -> u64 {
    3_000
}
fn default_record_timeout() -> u64 {
    2_000
}
fn default_audit_timeout() -> u64 {
    10_000
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:9000".parse().unwrap(),
            query_timeout_ms: default_query_timeout(),
            rpc_timeout_ms: default_rpc_timeout(),
            compensate_timeout_ms: default_compensate_timeout(),
            record_timeout_ms: default_record_timeout(),
            audit_timeout_ms: default_audit_timeout(),
        }
    }
}

impl CoordinatorConfig {
    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc_timeout_ms)
    }

    pub fn compensate_timeout(&self) -> Duration {
        Duration::from_millis(self.compensate_timeout_ms)
    }

    pub fn record_timeout(&self) -> Duration {
        Duration::from_millis(self.record_timeout_ms)
    }

    pub fn audit_timeout(&self) -> Duration {
        Duration::from_millis(self.audit_timeout_ms)
    }
}

/// Worker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Worker id announced during registration
    #[serde(default)]
    pub worker_id: Option<String>,

    /// Coordinator address to dial
    #[serde(default = "default_coordinator_addr")]
    pub coordinator_addr: String,

    /// Optional JSON snapshot path for the ledger
    #[serde(default)]
    pub data_path: Option<PathBuf>,

    /// Delay between reconnect attempts
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_ms: u64,
}

fn default_coordinator_addr() -> String {
    "localhost:9000".to_string()
}
fn default_reconnect_delay() -> u64 {
    2_000
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            worker_id: None,
            coordinator_addr: default_coordinator_addr(),
            data_path: None,
            reconnect_delay_ms: default_reconnect_delay(),
        }
    }
}

impl WorkerConfig {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

impl Config {
    /// Load configuration from `shardbank.toml` (if present) and
    /// `SHARDBANK_*` environment variables. CLI flags are merged on top
    /// by the binaries.
    pub fn load() -> Self {
        let builder = config::Config::builder()
            .add_source(config::File::with_name("shardbank").required(false))
            .add_source(config::Environment::with_prefix("SHARDBANK").separator("__"));

        match builder.build().and_then(|c| c.try_deserialize()) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Config load failed ({}), using defaults", e);
                Self::default()
            }
        }
    }
}
