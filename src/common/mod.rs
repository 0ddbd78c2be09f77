//! Common utilities and types shared across shardbank

pub mod config;
pub mod error;
pub mod protocol;

pub use config::{Config, CoordinatorConfig, WorkerConfig};
pub use error::{Error, Result};
pub use protocol::{ClientCommand, WorkerCommand, WorkerReply, DELIM};
