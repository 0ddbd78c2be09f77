//! Coordinator implementation
//!
//! The coordinator is responsible for:
//! - Worker registration and lifecycle (registry)
//! - Account → shard → worker routing (router)
//! - Serialized request/response exchanges per worker (rpc)
//! - Per-client command dispatch (dispatch)
//! - Saga transfers with compensation (transfer)
//! - Cluster-wide audit aggregation (audit)

pub mod audit;
pub mod dispatch;
pub mod registry;
pub mod router;
pub mod rpc;
pub mod server;
pub mod transfer;

pub use registry::{WorkerHandle, WorkerRegistry, WorkerState};
pub use server::{BoundCoordinator, Coordinator};
