//! # shardbank
//!
//! A coordinator for a horizontally partitioned account ledger:
//! - One TCP endpoint for many concurrent bank clients
//! - Account state partitioned across a dynamic set of shard workers
//! - Positional modulo sharding, evaluated against the live registry
//! - Strictly serialized request/response exchanges per worker connection
//! - Saga-style transfers (debit, credit, compensating credit on failure)
//! - Cluster-wide audit ("arqueo") folding per-shard partials
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐  ┌──────────┐  ┌──────────┐
//! │ Client 1 │  │ Client 2 │  │ Client N │
//! └────┬─────┘  └────┬─────┘  └────┬─────┘
//!      │             │             │   CLIENT_BANK|...
//!      └──────┬──────┴──────┬──────┘
//!             │             │
//!      ┌──────▼─────────────▼──────┐
//!      │        Coordinator        │
//!      │  registry · router · rpc  │
//!      └──┬──────────┬──────────┬──┘
//!         │          │          │   WORKER|id
//!   ┌─────▼────┐ ┌───▼──────┐ ┌─▼────────┐
//!   │ Worker   │ │ Worker   │ │ Worker   │
//!   │ (shard 0)│ │ (shard 1)│ │ (shard 2)│
//!   └──────────┘ └──────────┘ └──────────┘
//! ```
//!
//! Workers dial the coordinator and register with a `WORKER|id` line; a
//! client's account id is mapped to `id % worker_count` at call time, so
//! the mapping shifts whenever the worker population changes. No account
//! data migrates on membership change; that is the system's consistency
//! model, not an accident, and callers must not expect durability across
//! a reshard.
//!
//! ## Usage
//!
//! ### Start the coordinator
//! ```bash
//! shardbank-coord serve --bind 0.0.0.0:9000
//! ```
//!
//! ### Start a shard worker
//! ```bash
//! shardbank-worker serve --id w1 --coordinator localhost:9000 --data ./w1.json
//! ```
//!
//! ### Use the CLI
//! ```bash
//! shardbank create-accounts 100 --initial 500
//! shardbank consult 42
//! shardbank transfer 1 2 --amount 100
//! shardbank arqueo
//! ```

pub mod common;
pub mod coordinator;
pub mod worker;

// Re-export commonly used types
pub use common::{Config, Error, Result};
pub use coordinator::Coordinator;
pub use worker::WorkerNode;

/// Current version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build info
pub const BUILD_INFO: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("CARGO_PKG_NAME"), ")");
