//! Cluster audit ("arqueo"): fold per-shard partials into one total
//!
//! Every registered worker is asked for its partial balance and account
//! count with a longer deadline than single-record operations, since a
//! worker may be scanning its full ledger. Workers that time out, error
//! or reply unparsably are excluded from the total. The result is a
//! best-effort aggregate, not a consistent snapshot: nothing prevents
//! concurrent mutation during the fan-out.

use crate::common::protocol::{WorkerCommand, WorkerReply};
use crate::common::{Error, Result};
use crate::coordinator::registry::WorkerRegistry;
use crate::coordinator::rpc;
use std::time::Duration;

/// Aggregate audit result
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AuditReport {
    pub total_balance: f64,
    pub total_accounts: u64,
    /// Workers whose partial made it into the totals
    pub workers_reporting: usize,
}

/// Run the audit over a snapshot of the current registry. Workers joining
/// mid-audit are not consulted; workers leaving simply fail their
/// exchange and are excluded.
pub async fn run(registry: &WorkerRegistry, timeout: Duration) -> Result<AuditReport> {
    let handles = registry.handles();
    if handles.is_empty() {
        return Err(Error::NoWorkersAvailable);
    }

    let line = WorkerCommand::Arqueo.to_line();
    let mut report = AuditReport::default();
    for handle in handles {
        match rpc::call(&handle, &line, timeout).await {
            Ok(raw) => {
                let reply = WorkerReply::new(raw);
                match parse_partial(&reply) {
                    Some((balance, accounts)) => {
                        report.total_balance += balance;
                        report.total_accounts += accounts;
                        report.workers_reporting += 1;
                    }
                    None => {
                        tracing::warn!(
                            worker = handle.id(),
                            reply = reply.line(),
                            "unparsable audit partial, excluded"
                        );
                    }
                }
            }
            Err(e) => {
                tracing::warn!(worker = handle.id(), error = %e, "audit partial failed, excluded");
            }
        }
    }

    tracing::info!(?report, "arqueo complete");
    Ok(report)
}

/// A partial is `OK|<balance>|<count>`; anything else is excluded.
fn parse_partial(reply: &WorkerReply) -> Option<(f64, u64)> {
    if !reply.is_ok() {
        return None;
    }
    let mut fields = reply.payload_fields();
    let balance: f64 = fields.next()?.parse().ok()?;
    let accounts: u64 = fields.next()?.parse().ok()?;
    Some((balance, accounts))
}
