use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::engine::queue::DrainOutcome;
use crate::engine::service::TripSyncService;

/// Long-lived background loop: every `sync_interval` it runs one drain pass
/// when the device is online and the queue has work. There is no external
/// cancellation; re-entry is harmless because each operation carries its own
/// attempt bookkeeping and passes are serialized by the drain lock.
pub async fn run_sync_loop(service: TripSyncService) {
    let interval = service.config().sync_interval;
    info!(interval_ms = interval.as_millis() as u64, "sync loop started");

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // the first tick completes immediately; skip it so passes align to the interval
    ticker.tick().await;

    loop {
        ticker.tick().await;

        if !service.is_online() {
            continue;
        }
        if service.store().queue_len().await == 0 {
            continue;
        }

        match service.sync_now().await {
            Ok(DrainOutcome::Drained { synced }) => {
                info!(synced, "drain pass completed");
            }
            Ok(DrainOutcome::Stalled {
                synced,
                operation_id,
            }) => {
                warn!(synced, operation_id = %operation_id, "drain pass stalled");
            }
            Ok(DrainOutcome::Archived {
                synced,
                operation_id,
            }) => {
                warn!(synced, operation_id = %operation_id, "stuck operation archived");
            }
            Ok(DrainOutcome::Offline | DrainOutcome::Idle) => {
                debug!("drain pass had nothing to do");
            }
            Err(err) => {
                error!(error = %err, "drain pass failed");
            }
        }
    }
}
