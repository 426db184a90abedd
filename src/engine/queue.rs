use std::collections::VecDeque;

use chrono::Utc;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::error::TripError;
use crate::models::operation::{OfflineOperation, OperationKind};
use crate::repo::TripRepository;
use crate::state::{SyncEvent, SyncStore};
use crate::store::{KvStore, DEAD_LETTER_KEY, QUEUE_KEY};

/// Result of one drain pass over the offline queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Device offline, nothing attempted.
    Offline,
    /// Queue was already empty.
    Idle,
    /// Every queued operation synced.
    Drained { synced: usize },
    /// The head operation exhausted its retries and blocks the queue.
    Stalled { synced: usize, operation_id: Uuid },
    /// The head operation was given up on and moved to the dead letter.
    Archived { synced: usize, operation_id: Uuid },
}

/// Append an operation to the queue tail and write the whole queue through
/// to durable storage before returning.
pub async fn enqueue(
    store: &SyncStore,
    kv: &dyn KvStore,
    kind: OperationKind,
) -> Result<Uuid, TripError> {
    let op = OfflineOperation::new(kind);
    let id = op.id;
    let label = op.kind.label();

    {
        let mut queue = store.queue.lock().await;
        queue.push_back(op);
        persist_queue(kv, &queue).await?;
        store.metrics.queue_depth.set(queue.len() as i64);
    }

    store.metrics.enqueued_total.with_label_values(&[label]).inc();
    info!(operation_id = %id, kind = label, "operation queued for sync");
    Ok(id)
}

/// One FIFO pass over the queue. Operations run one at a time, each with up
/// to `max_retries` attempts separated by `retry_delay`. A head operation
/// that exhausts its retries goes back to the front and the pass stops:
/// later entries never run ahead of a still-failing earlier one. After
/// `max_failed_passes` stalled passes the operation is archived so the
/// queue cannot stay blocked forever.
pub async fn drain_pass(
    store: &SyncStore,
    kv: &dyn KvStore,
    repo: &TripRepository,
    config: &Config,
) -> Result<DrainOutcome, TripError> {
    if !store.is_online() {
        return Ok(DrainOutcome::Offline);
    }

    let _guard = store.drain_lock.lock().await;
    let mut synced = 0usize;

    loop {
        let next = store.queue.lock().await.pop_front();
        let Some(mut op) = next else {
            break;
        };

        match execute_with_retries(repo, store, &mut op, config).await {
            Ok(()) => {
                synced += 1;
                {
                    let queue = store.queue.lock().await;
                    persist_queue(kv, &queue).await?;
                    store.metrics.queue_depth.set(queue.len() as i64);
                }
                *store.last_sync.lock().await = Some(Utc::now());
                store
                    .metrics
                    .sync_operations_total
                    .with_label_values(&[op.kind.label(), "success"])
                    .inc();
                let _ = store.events_tx.send(SyncEvent::OperationSynced {
                    id: op.id,
                    kind: op.kind.label(),
                });
                info!(operation_id = %op.id, kind = op.kind.label(), "queued operation synced");
            }
            Err(err) => {
                op.failed_passes += 1;

                if op.failed_passes >= config.max_failed_passes {
                    archive_operation(kv, &op).await?;
                    {
                        let queue = store.queue.lock().await;
                        persist_queue(kv, &queue).await?;
                        store.metrics.queue_depth.set(queue.len() as i64);
                    }
                    store
                        .metrics
                        .sync_operations_total
                        .with_label_values(&[op.kind.label(), "archived"])
                        .inc();
                    store
                        .metrics
                        .drain_passes_total
                        .with_label_values(&["archived"])
                        .inc();
                    let _ = store
                        .events_tx
                        .send(SyncEvent::OperationArchived { id: op.id });
                    error!(
                        operation_id = %op.id,
                        kind = op.kind.label(),
                        attempts = op.attempts,
                        error = %err,
                        "operation moved to dead letter after repeated stalled passes"
                    );
                    return Ok(DrainOutcome::Archived {
                        synced,
                        operation_id: op.id,
                    });
                }

                let operation_id = op.id;
                let attempts = op.attempts;
                let label = op.kind.label();
                {
                    let mut queue = store.queue.lock().await;
                    queue.push_front(op);
                    persist_queue(kv, &queue).await?;
                    store.metrics.queue_depth.set(queue.len() as i64);
                }
                store
                    .metrics
                    .sync_operations_total
                    .with_label_values(&[label, "exhausted"])
                    .inc();
                store
                    .metrics
                    .drain_passes_total
                    .with_label_values(&["stalled"])
                    .inc();
                let _ = store.events_tx.send(SyncEvent::OperationStalled {
                    id: operation_id,
                    attempts,
                });
                warn!(
                    operation_id = %operation_id,
                    kind = label,
                    attempts,
                    error = %err,
                    "operation exhausted retries; queue stalls until next pass"
                );
                return Ok(DrainOutcome::Stalled {
                    synced,
                    operation_id,
                });
            }
        }
    }

    if synced == 0 {
        return Ok(DrainOutcome::Idle);
    }

    store
        .metrics
        .drain_passes_total
        .with_label_values(&["drained"])
        .inc();
    let _ = store.events_tx.send(SyncEvent::QueueDrained { remaining: 0 });
    Ok(DrainOutcome::Drained { synced })
}

async fn execute_with_retries(
    repo: &TripRepository,
    store: &SyncStore,
    op: &mut OfflineOperation,
    config: &Config,
) -> Result<(), TripError> {
    let max_attempts = config.max_retries.max(1);
    let mut last_err = TripError::Internal("operation never attempted".to_string());

    for attempt in 1..=max_attempts {
        op.attempts += 1;
        match execute(repo, &op.kind).await {
            Ok(()) => return Ok(()),
            Err(err) => {
                debug!(
                    operation_id = %op.id,
                    kind = op.kind.label(),
                    attempt,
                    error = %err,
                    "operation attempt failed"
                );
                last_err = err;
                if attempt < max_attempts {
                    store.metrics.operation_retries_total.inc();
                    sleep(config.retry_delay).await;
                }
            }
        }
    }

    Err(last_err)
}

/// Replay one deferred intent against the backend. Cancel and rate re-check
/// their predicate against the freshly fetched trip, since the state may
/// have moved while the operation sat in the queue; replays that find the
/// intent already applied count as success.
async fn execute(repo: &TripRepository, kind: &OperationKind) -> Result<(), TripError> {
    match kind {
        OperationKind::RequestTrip { trip } => {
            repo.request_ride(
                trip.passenger_id,
                &trip.origin,
                &trip.destination,
                trip.payment_method,
            )
            .await?;
            Ok(())
        }
        OperationKind::CancelTrip { trip_id } => {
            let current = repo.get_trip_by_id(*trip_id).await?;
            if current.status == crate::models::trip::TripStatus::Cancelled {
                debug!(trip_id = %trip_id, "trip already cancelled; replay is a no-op");
                return Ok(());
            }
            if !current.can_be_cancelled() {
                return Err(TripError::State(format!(
                    "el viaje no puede cancelarse en estado {}",
                    current.status.as_str()
                )));
            }
            repo.cancel_trip(*trip_id).await?;
            Ok(())
        }
        OperationKind::PayTrip { trip_id, method } => {
            repo.pay_trip(*trip_id, *method).await?;
            Ok(())
        }
        OperationKind::RateTrip {
            trip_id,
            rating,
            comment,
        } => {
            let current = repo.get_trip_by_id(*trip_id).await?;
            if current.passenger_rating.is_some() {
                debug!(trip_id = %trip_id, "trip already rated; replay is a no-op");
                return Ok(());
            }
            if !current.can_be_rated() {
                return Err(TripError::State(format!(
                    "el viaje no puede calificarse en estado {}",
                    current.status.as_str()
                )));
            }
            repo.rate_trip(*trip_id, *rating, comment.as_deref()).await?;
            Ok(())
        }
    }
}

pub async fn persist_queue(
    kv: &dyn KvStore,
    queue: &VecDeque<OfflineOperation>,
) -> Result<(), TripError> {
    let json = serde_json::to_string(queue)
        .map_err(|err| TripError::Storage(format!("queue serialization failed: {err}")))?;
    kv.set_item(QUEUE_KEY, json).await
}

pub async fn load_queue(kv: &dyn KvStore) -> Result<VecDeque<OfflineOperation>, TripError> {
    match kv.get_item(QUEUE_KEY).await? {
        Some(raw) => serde_json::from_str(&raw)
            .map_err(|err| TripError::Storage(format!("queue deserialization failed: {err}"))),
        None => Ok(VecDeque::new()),
    }
}

async fn archive_operation(kv: &dyn KvStore, op: &OfflineOperation) -> Result<(), TripError> {
    let mut archived: Vec<OfflineOperation> = match kv.get_item(DEAD_LETTER_KEY).await? {
        Some(raw) => serde_json::from_str(&raw)
            .map_err(|err| TripError::Storage(format!("dead letter corrupted: {err}")))?,
        None => Vec::new(),
    };

    archived.push(op.clone());
    let json = serde_json::to_string(&archived)
        .map_err(|err| TripError::Storage(format!("dead letter serialization failed: {err}")))?;
    kv.set_item(DEAD_LETTER_KEY, json).await
}
