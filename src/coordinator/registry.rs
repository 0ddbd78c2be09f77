//! Worker registry: the ordered, mutable set of registered shard workers
//!
//! Each registered worker is represented by a [`WorkerHandle`] owning the
//! write half of its connection and the channel of inbound lines produced
//! by the worker's drain task. A handle's shard slot is not stored
//! anywhere: it is derived positionally at lookup time, so the mapping of
//! any account shifts whenever the registry grows or shrinks.

use crate::common::{Error, Result};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::mpsc;

/// Lifecycle of one worker connection.
///
/// Transitions are driven only by registration and by stream-failure
/// detection in the drain task; no other component may force one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WorkerState {
    /// Handshake seen, not yet in the registry
    Registered = 0,
    /// In the registry, serving exchanges
    Active = 1,
    /// Removed after stream failure or close
    Removed = 2,
}

impl WorkerState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => WorkerState::Registered,
            1 => WorkerState::Active,
            _ => WorkerState::Removed,
        }
    }
}

/// The two connection ends an exchange needs, guarded together so that a
/// full write-then-read-one-line span holds a single lock.
pub(crate) struct Exchange {
    pub(crate) writer: OwnedWriteHalf,
    pub(crate) replies: mpsc::Receiver<String>,
}

/// Coordinator-side representation of one registered shard worker.
pub struct WorkerHandle {
    id: String,
    exchange: tokio::sync::Mutex<Exchange>,
    state: AtomicU8,
}

impl WorkerHandle {
    /// Build a handle from the connection's write half and the channel
    /// fed by its drain task.
    pub fn new(id: String, writer: OwnedWriteHalf, replies: mpsc::Receiver<String>) -> Self {
        Self {
            id,
            exchange: tokio::sync::Mutex::new(Exchange { writer, replies }),
            state: AtomicU8::new(WorkerState::Registered as u8),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> WorkerState {
        WorkerState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_removed(&self) -> bool {
        self.state() == WorkerState::Removed
    }

    fn activate(&self) {
        self.state
            .store(WorkerState::Active as u8, Ordering::Release);
    }

    fn mark_removed(&self) {
        self.state
            .store(WorkerState::Removed as u8, Ordering::Release);
    }

    /// Exclusive access for one request/response exchange. Holding this
    /// guard across the whole write-then-read span is what keeps
    /// concurrent callers from reading each other's replies.
    pub(crate) async fn exchange(&self) -> tokio::sync::MutexGuard<'_, Exchange> {
        self.exchange.lock().await
    }
}

impl std::fmt::Debug for WorkerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerHandle")
            .field("id", &self.id)
            .field("state", &self.state())
            .finish()
    }
}

/// Insertion-ordered set of live worker handles.
///
/// Position equals registration order minus removals; callers must not
/// assume index stability across membership changes. Duplicate ids are
/// not rejected (generated ids are UUIDs, so collisions do not arise in
/// practice).
#[derive(Default)]
pub struct WorkerRegistry {
    workers: Mutex<Vec<Arc<WorkerHandle>>>,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a worker and mark it active.
    pub fn register(&self, handle: Arc<WorkerHandle>) {
        let mut workers = self.workers.lock().unwrap();
        handle.activate();
        workers.push(handle.clone());
        tracing::info!(worker = handle.id(), total = workers.len(), "worker registered");
    }

    /// Remove a worker. Safe to call concurrently with lookups; an
    /// exchange already in flight on the handle is not blocked, it simply
    /// fails when its reply channel closes.
    pub fn unregister(&self, handle: &Arc<WorkerHandle>) {
        let mut workers = self.workers.lock().unwrap();
        workers.retain(|w| !Arc::ptr_eq(w, handle));
        handle.mark_removed();
        tracing::info!(worker = handle.id(), total = workers.len(), "worker unregistered");
    }

    pub fn count(&self) -> usize {
        self.workers.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Handle currently at `index`. The registry may have shrunk between
    /// the routing decision and this call, so an out-of-range index is a
    /// legitimate runtime condition, not a bug.
    pub fn resolve(&self, index: i64) -> Result<Arc<WorkerHandle>> {
        let workers = self.workers.lock().unwrap();
        usize::try_from(index)
            .ok()
            .and_then(|i| workers.get(i).cloned())
            .ok_or_else(|| Error::WorkerUnavailable(format!("no worker at shard index {}", index)))
    }

    /// Snapshot of the current handles, for fan-out operations. Workers
    /// joining after the snapshot are not consulted.
    pub fn handles(&self) -> Vec<Arc<WorkerHandle>> {
        self.workers.lock().unwrap().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::{TcpListener, TcpStream};

    async fn test_handle(id: &str) -> Arc<WorkerHandle> {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (connect, accept) = tokio::join!(TcpStream::connect(addr), listener.accept());
        let _peer = accept.unwrap();
        let (_read, write) = connect.unwrap().into_split();
        let (_tx, rx) = mpsc::channel(4);
        Arc::new(WorkerHandle::new(id.to_string(), write, rx))
    }

    #[tokio::test]
    async fn test_register_resolve_order() {
        let registry = WorkerRegistry::new();
        let w1 = test_handle("w1").await;
        let w2 = test_handle("w2").await;
        registry.register(w1.clone());
        registry.register(w2.clone());

        assert_eq!(registry.count(), 2);
        assert_eq!(registry.resolve(0).unwrap().id(), "w1");
        assert_eq!(registry.resolve(1).unwrap().id(), "w2");
    }

    #[tokio::test]
    async fn test_unregister_shifts_positions() {
        let registry = WorkerRegistry::new();
        let w1 = test_handle("w1").await;
        let w2 = test_handle("w2").await;
        registry.register(w1.clone());
        registry.register(w2.clone());

        registry.unregister(&w1);
        assert_eq!(registry.count(), 1);
        // w2 moved down to position 0
        assert_eq!(registry.resolve(0).unwrap().id(), "w2");
        assert!(registry.resolve(1).is_err());
    }

    #[tokio::test]
    async fn test_resolve_out_of_range() {
        let registry = WorkerRegistry::new();
        assert!(matches!(
            registry.resolve(0),
            Err(Error::WorkerUnavailable(_))
        ));
        let w1 = test_handle("w1").await;
        registry.register(w1);
        assert!(registry.resolve(-1).is_err());
        assert!(registry.resolve(3).is_err());
    }

    #[tokio::test]
    async fn test_lifecycle_states() {
        let registry = WorkerRegistry::new();
        let w1 = test_handle("w1").await;
        assert_eq!(w1.state(), WorkerState::Registered);

        registry.register(w1.clone());
        assert_eq!(w1.state(), WorkerState::Active);

        registry.unregister(&w1);
        assert_eq!(w1.state(), WorkerState::Removed);
        assert!(w1.is_removed());
    }
}
