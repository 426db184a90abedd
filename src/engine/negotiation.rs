use chrono::{DateTime, Utc};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::error::TripError;
use crate::models::trip::{Trip, TripStatus};
use crate::observability::metrics::Metrics;
use crate::repo::TripRepository;

/// Observable session state. Manual cancellation ends the session without a
/// terminal trip-status judgement, so `Waiting` is what observers last see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationState {
    Waiting,
    Confirmed,
    Rejected,
    TimedOut,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NegotiationOutcome {
    /// The selected driver took the trip; carries the confirming snapshot.
    Confirmed(Trip),
    /// The driver bounced the selection; the passenger must pick again.
    Rejected,
    /// No decision arrived before the deadline.
    TimedOut,
    /// The passenger walked away while waiting.
    Cancelled,
}

impl NegotiationOutcome {
    fn label(&self) -> &'static str {
        match self {
            NegotiationOutcome::Confirmed(_) => "confirmed",
            NegotiationOutcome::Rejected => "rejected",
            NegotiationOutcome::TimedOut => "timed_out",
            NegotiationOutcome::Cancelled => "cancelled",
        }
    }
}

/// Bounded-time driver negotiation: after `select_driver` succeeds, the
/// session polls the trip until the backend confirms, the driver bounces,
/// the deadline passes, or the passenger cancels. The poll interval and the
/// deadline both live inside the select loop, so every exit path drops both
/// — there is no way to leak a timer into a stray late transition.
pub struct NegotiationSession {
    trip_id: Uuid,
    driver_id: Uuid,
    started_at: DateTime<Utc>,
    state_rx: watch::Receiver<NegotiationState>,
    cancel_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<NegotiationOutcome>,
}

impl NegotiationSession {
    pub async fn begin(
        repo: TripRepository,
        metrics: Metrics,
        config: &Config,
        trip_id: Uuid,
        driver_id: Uuid,
    ) -> Result<Self, TripError> {
        repo.select_driver(trip_id, driver_id).await?;
        info!(trip_id = %trip_id, driver_id = %driver_id, "driver selected, awaiting confirmation");

        let (state_tx, state_rx) = watch::channel(NegotiationState::Waiting);
        let (cancel_tx, cancel_rx) = oneshot::channel();

        let poll_interval = config.poll_interval;
        let timeout = config.negotiation_timeout;
        let task = tokio::spawn(run_session(
            repo,
            metrics,
            trip_id,
            poll_interval,
            timeout,
            state_tx,
            cancel_rx,
        ));

        Ok(Self {
            trip_id,
            driver_id,
            started_at: Utc::now(),
            state_rx,
            cancel_tx: Some(cancel_tx),
            task,
        })
    }

    pub fn trip_id(&self) -> Uuid {
        self.trip_id
    }

    pub fn driver_id(&self) -> Uuid {
        self.driver_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn state(&self) -> NegotiationState {
        *self.state_rx.borrow()
    }

    /// Watch state transitions without consuming the session.
    pub fn watch_state(&self) -> watch::Receiver<NegotiationState> {
        self.state_rx.clone()
    }

    /// Passenger walks away. Idempotent; the poller and the deadline die
    /// with the session task.
    pub fn cancel(&mut self) {
        if let Some(tx) = self.cancel_tx.take() {
            let _ = tx.send(());
        }
    }

    /// Wait for the session to end and return how it ended.
    pub async fn outcome(self) -> NegotiationOutcome {
        self.task.await.unwrap_or(NegotiationOutcome::Cancelled)
    }
}

async fn run_session(
    repo: TripRepository,
    metrics: Metrics,
    trip_id: Uuid,
    poll_interval: std::time::Duration,
    timeout: std::time::Duration,
    state_tx: watch::Sender<NegotiationState>,
    mut cancel_rx: oneshot::Receiver<()>,
) -> NegotiationOutcome {
    let mut poll = tokio::time::interval(poll_interval);
    poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let deadline = tokio::time::sleep(timeout);
    tokio::pin!(deadline);

    let outcome = loop {
        tokio::select! {
            _ = &mut cancel_rx => {
                info!(trip_id = %trip_id, "negotiation cancelled by passenger");
                break NegotiationOutcome::Cancelled;
            }
            _ = &mut deadline => {
                let _ = state_tx.send(NegotiationState::TimedOut);
                warn!(trip_id = %trip_id, "negotiation timed out without a driver decision");
                break NegotiationOutcome::TimedOut;
            }
            _ = poll.tick() => {
                match repo.get_trip_by_id(trip_id).await {
                    Ok(trip) => match interpret(&trip) {
                        Some(PollSignal::Confirmed) => {
                            let _ = state_tx.send(NegotiationState::Confirmed);
                            info!(trip_id = %trip_id, status = trip.status.as_str(), "driver confirmed");
                            break NegotiationOutcome::Confirmed(trip);
                        }
                        Some(PollSignal::Rejected) => {
                            let _ = state_tx.send(NegotiationState::Rejected);
                            info!(trip_id = %trip_id, "driver rejected; back to selection");
                            break NegotiationOutcome::Rejected;
                        }
                        None => {}
                    },
                    Err(err) => {
                        // transient poll failures just wait for the next tick
                        debug!(trip_id = %trip_id, error = %err, "negotiation poll failed");
                    }
                }
            }
        }
    };

    metrics
        .negotiation_outcomes_total
        .with_label_values(&[outcome.label()])
        .inc();
    outcome
}

enum PollSignal {
    Confirmed,
    Rejected,
}

/// Read the backend's decision out of a polled trip. The backend attaches
/// the driver synchronously in `select_driver`, so a requested trip with no
/// driver means the selection was bounced; a cancelled trip ends the
/// session the same way since the passenger must act again.
fn interpret(trip: &Trip) -> Option<PollSignal> {
    match trip.status {
        TripStatus::Accepted | TripStatus::Arriving | TripStatus::InProgress => {
            Some(PollSignal::Confirmed)
        }
        TripStatus::Requested if trip.driver_id.is_none() => Some(PollSignal::Rejected),
        TripStatus::Cancelled => Some(PollSignal::Rejected),
        _ => None,
    }
}
