use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, Mutex};
use uuid::Uuid;

use crate::models::operation::OfflineOperation;
use crate::models::trip::Trip;
use crate::observability::metrics::Metrics;

/// Events emitted by the sync machinery so a UI can react to deferred work
/// resolving (or getting stuck) in the background.
#[derive(Debug, Clone)]
pub enum SyncEvent {
    OperationSynced { id: Uuid, kind: &'static str },
    OperationStalled { id: Uuid, attempts: u32 },
    OperationArchived { id: Uuid },
    QueueDrained { remaining: usize },
}

/// Process-wide mutable state of the engine: connectivity flag, the offline
/// queue, the trips cache and the last successful sync time. Constructed
/// explicitly at session start, shared by `Arc`, torn down at logout —
/// nothing here is a module-level singleton.
pub struct SyncStore {
    is_online: AtomicBool,
    pub queue: Mutex<VecDeque<OfflineOperation>>,
    pub trips_cache: Mutex<Option<Vec<Trip>>>,
    pub last_sync: Mutex<Option<DateTime<Utc>>>,
    /// Held for the duration of a drain pass; keeps timer-triggered and
    /// manually-triggered passes strictly sequential.
    pub drain_lock: Mutex<()>,
    pub events_tx: broadcast::Sender<SyncEvent>,
    pub metrics: Metrics,
}

impl SyncStore {
    pub fn new() -> Self {
        let (events_tx, _unused_rx) = broadcast::channel(64);

        Self {
            is_online: AtomicBool::new(true),
            queue: Mutex::new(VecDeque::new()),
            trips_cache: Mutex::new(None),
            last_sync: Mutex::new(None),
            drain_lock: Mutex::new(()),
            events_tx,
            metrics: Metrics::new(),
        }
    }

    pub fn is_online(&self) -> bool {
        self.is_online.load(Ordering::SeqCst)
    }

    pub fn set_online(&self, online: bool) {
        self.is_online.store(online, Ordering::SeqCst);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events_tx.subscribe()
    }

    pub async fn queue_len(&self) -> usize {
        self.queue.lock().await.len()
    }
}

impl Default for SyncStore {
    fn default() -> Self {
        Self::new()
    }
}
