//! Transfer orchestration: a two-step saga with compensation
//!
//! A transfer debits the source worker, credits the destination worker,
//! and on credit failure issues a best-effort compensating credit back to
//! the source. There is no cross-worker lock and no atomic commit: a
//! worker failing exactly between a successful debit and the compensation
//! can leave the source permanently short. That risk is a documented
//! property of the design, kept visible in the logs instead of hidden.

use crate::common::protocol::{self, WorkerCommand, WorkerReply};
use crate::common::{CoordinatorConfig, Error, Result};
use crate::coordinator::router::Router;
use crate::coordinator::rpc;

/// Progress of one in-flight transfer. Ephemeral: exists only for the
/// duration of the call, for tracing and failure classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStage {
    Initiated,
    Debited,
    Credited,
    CompensationAttempted,
    Failed,
}

#[derive(Debug)]
pub struct PendingTransfer {
    pub from: i64,
    pub to: i64,
    pub amount: f64,
    pub stage: TransferStage,
}

/// Execute the saga. Source and destination owners are resolved
/// independently and may be the same worker. A timed-out step branches
/// exactly like an explicit failure reply.
pub async fn execute(
    router: &Router,
    config: &CoordinatorConfig,
    from: i64,
    to: i64,
    amount: f64,
) -> Result<String> {
    if amount <= 0.0 {
        return Err(Error::MalformedRequest(format!(
            "transfer amount must be positive, got {}",
            amount
        )));
    }

    let source = router.route(from)?;
    let dest = router.route(to)?;
    let mut tx = PendingTransfer {
        from,
        to,
        amount,
        stage: TransferStage::Initiated,
    };

    // 1) Debit the source. On any failure no money has moved.
    let debit = WorkerCommand::Debit {
        account_id: from,
        amount,
    };
    let detail = match rpc::call(&source, &debit.to_line(), config.rpc_timeout()).await {
        Ok(line) => {
            let reply = WorkerReply::new(line);
            if reply.is_ok() {
                None
            } else {
                Some(reply.into_line())
            }
        }
        Err(e) if e.is_exchange_failure() => Some(e.exchange_reason()),
        Err(e) => return Err(e),
    };
    if let Some(detail) = detail {
        tx.stage = TransferStage::Failed;
        tracing::warn!(?tx, worker = source.id(), "transfer failed at debit");
        return Err(Error::DebitFailed(detail));
    }
    tx.stage = TransferStage::Debited;

    // 2) Credit the destination; compensate the source if it fails.
    let credit = WorkerCommand::Credit {
        account_id: to,
        amount,
    };
    let detail = match rpc::call(&dest, &credit.to_line(), config.rpc_timeout()).await {
        Ok(line) => {
            let reply = WorkerReply::new(line);
            if reply.is_ok() {
                None
            } else {
                Some(reply.into_line())
            }
        }
        Err(e) if e.is_exchange_failure() => Some(e.exchange_reason()),
        Err(e) => return Err(e),
    };
    if let Some(detail) = detail {
        tx.stage = TransferStage::CompensationAttempted;
        tracing::warn!(?tx, worker = dest.id(), "credit failed, compensating source");
        let compensation = WorkerCommand::Credit {
            account_id: from,
            amount,
        };
        // Best-effort: the outcome is not verified. If this also fails
        // the source stays short.
        if let Err(e) = rpc::call(
            &source,
            &compensation.to_line(),
            config.compensate_timeout(),
        )
        .await
        {
            tracing::warn!(?tx, worker = source.id(), error = %e, "compensation not confirmed, source may be short");
        }
        tx.stage = TransferStage::Failed;
        return Err(Error::CreditFailed(detail));
    }
    tx.stage = TransferStage::Credited;

    // 3) Best-effort audit records on both sides; outcome does not affect
    // the client-visible result.
    let record = WorkerCommand::RecordTx { from, to, amount };
    if let Err(e) = rpc::call(&source, &record.to_line(), config.record_timeout()).await {
        tracing::debug!(?tx, worker = source.id(), error = %e, "record_tx skipped");
    }
    if let Err(e) = rpc::call(&dest, &record.to_line(), config.record_timeout()).await {
        tracing::debug!(?tx, worker = dest.id(), error = %e, "record_tx skipped");
    }

    tracing::info!(?tx, "transfer completed");
    Ok(protocol::transfer_confirmation())
}
