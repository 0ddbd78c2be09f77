//! Routing: account id → shard index → worker handle
//!
//! The shard index is `account_id % registry.count()`, evaluated against
//! the registry's size at call time. The mapping for every account is
//! therefore unstable across membership changes, and no data migrates
//! when it shifts; an account previously served by one worker may be
//! routed to a different worker that never saw its prior writes. That is
//! the system's consistency model, preserved deliberately.

use crate::common::{Error, Result};
use crate::coordinator::registry::{WorkerHandle, WorkerRegistry};
use std::sync::Arc;

/// Shard index for an account against a registry of `worker_count`
/// workers.
///
/// Rust's `%` is a remainder whose sign follows the dividend (the same
/// rule as the source system's language), so a negative account id yields
/// a negative index. Resolution of such an index fails; it is surfaced as
/// an error, never normalized.
pub fn shard_index_for(account_id: i64, worker_count: usize) -> Result<i64> {
    if worker_count == 0 {
        return Err(Error::NoWorkersAvailable);
    }
    Ok(account_id % worker_count as i64)
}

/// Resolves account ids to the worker currently owning their shard.
#[derive(Clone)]
pub struct Router {
    registry: Arc<WorkerRegistry>,
}

impl Router {
    pub fn new(registry: Arc<WorkerRegistry>) -> Self {
        Self { registry }
    }

    /// Owning worker for `account_id`. The registry may change between
    /// the index computation and resolution; a vanished slot fails with
    /// `WorkerUnavailable` rather than routing elsewhere.
    pub fn route(&self, account_id: i64) -> Result<Arc<WorkerHandle>> {
        let index = shard_index_for(account_id, self.registry.count())?;
        self.registry.resolve(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shard_index_modulo() {
        assert_eq!(shard_index_for(0, 3).unwrap(), 0);
        assert_eq!(shard_index_for(7, 3).unwrap(), 1);
        assert_eq!(shard_index_for(9, 3).unwrap(), 0);
        assert_eq!(shard_index_for(5, 1).unwrap(), 0);
    }

    #[test]
    fn test_shard_index_deterministic() {
        for id in 0..100 {
            let a = shard_index_for(id, 7).unwrap();
            let b = shard_index_for(id, 7).unwrap();
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_empty_registry_fails() {
        for id in [0, 1, 42, -3] {
            assert!(matches!(
                shard_index_for(id, 0),
                Err(Error::NoWorkersAvailable)
            ));
        }
    }

    #[test]
    fn test_negative_id_keeps_sign() {
        // Remainder follows the dividend: -7 % 3 == -1. The index is
        // reported as-is and fails resolution downstream.
        assert_eq!(shard_index_for(-7, 3).unwrap(), -1);
        assert_eq!(shard_index_for(-9, 3).unwrap(), 0);
    }

    #[test]
    fn test_mapping_shifts_with_count() {
        // id 5 maps differently under different registry sizes; nothing
        // about the mapping survives a membership change.
        assert_eq!(shard_index_for(5, 2).unwrap(), 1);
        assert_eq!(shard_index_for(5, 3).unwrap(), 2);
        assert_eq!(shard_index_for(5, 4).unwrap(), 1);
    }
}
