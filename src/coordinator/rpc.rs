//! RPC gateway: one serialized request/response exchange per worker
//!
//! A worker connection carries no request ids, so a response can only be
//! correlated to a request by ordering. The handle's exchange lock is held
//! across the full write-then-read-one-line span; without it a concurrent
//! caller could read the reply intended for another exchange. This is a
//! correctness invariant, not an optimization.

use crate::common::{Error, Result};
use crate::coordinator::registry::WorkerHandle;
use std::time::Duration;
use tokio::io::AsyncWriteExt;

/// Send one command line to a worker and wait for exactly one reply line.
///
/// The timeout does not cancel the request: the worker may still process
/// it and write a reply later, which then sits in the handle's channel
/// until the next exchange on that handle reads it as its own response.
/// That stale-reply hazard is inherent to timeout-without-cancellation on
/// an uncorrelated stream and is accepted here.
pub async fn call(handle: &WorkerHandle, line: &str, timeout: Duration) -> Result<String> {
    if handle.is_removed() {
        return Err(Error::WorkerUnavailable(format!(
            "worker {} was removed",
            handle.id()
        )));
    }

    let mut exchange = handle.exchange().await;

    tracing::debug!(worker = handle.id(), command = line, "rpc send");
    let framed = format!("{}\n", line);
    if let Err(e) = exchange.writer.write_all(framed.as_bytes()).await {
        return Err(Error::WorkerUnavailable(format!(
            "write to worker {} failed: {}",
            handle.id(),
            e
        )));
    }

    match tokio::time::timeout(timeout, exchange.replies.recv()).await {
        Ok(Some(reply)) => {
            tracing::debug!(worker = handle.id(), reply = %reply, "rpc reply");
            Ok(reply)
        }
        // Drain task closed the channel: stream failed or worker left
        Ok(None) => Err(Error::WorkerUnavailable(format!(
            "worker {} connection closed",
            handle.id()
        ))),
        Err(_) => {
            tracing::warn!(worker = handle.id(), command = line, "rpc timeout");
            Err(Error::Timeout)
        }
    }
}
