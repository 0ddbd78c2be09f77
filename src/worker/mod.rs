//! Reference shard worker: in-memory ledger + protocol responder
//!
//! The coordinator never depends on this implementation; any process
//! speaking the worker side of the wire protocol can register as a shard.

pub mod ledger;
pub mod server;

pub use ledger::{Account, Ledger, Loan, LoanState};
pub use server::WorkerNode;
