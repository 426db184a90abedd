use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::backend::RemoteBackend;
use crate::config::Config;
use crate::engine::negotiation::NegotiationSession;
use crate::engine::pricing;
use crate::engine::queue::{self, DrainOutcome};
use crate::error::TripError;
use crate::models::operation::OperationKind;
use crate::models::trip::{Location, PaymentMethod, Trip};
use crate::repo::TripRepository;
use crate::state::SyncStore;
use crate::store::{KvStore, DEAD_LETTER_KEY, QUEUE_KEY, TRIPS_CACHE_KEY};

/// How a mutating operation resolved: executed against the backend now, or
/// parked in the offline queue for the sync loop. Connectivity trouble never
/// surfaces as a failure on these operations — it surfaces as `Deferred`.
#[derive(Debug, Clone, PartialEq)]
pub enum Submission<T> {
    Completed(T),
    Deferred(Uuid),
}

impl<T> Submission<T> {
    pub fn is_deferred(&self) -> bool {
        matches!(self, Submission::Deferred(_))
    }
}

/// Trip list read result; `from_cache` marks a snapshot that may lag the
/// backend until the next read.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TripsSnapshot {
    pub trips: Vec<Trip>,
    pub from_cache: bool,
}

/// Orchestrates the trip lifecycle for one passenger session: local
/// validation, fare estimation, the offline queue and the trips cache.
/// All state lives in the injected [`SyncStore`]; dropping the service and
/// calling [`TripSyncService::clear_local_state`] at logout leaves nothing
/// behind.
#[derive(Clone)]
pub struct TripSyncService {
    passenger_id: Uuid,
    repo: TripRepository,
    store: Arc<SyncStore>,
    kv: Arc<dyn KvStore>,
    config: Config,
}

impl TripSyncService {
    /// Build a session service, hydrating the queue and the trips cache
    /// from whatever the local store kept from last time.
    pub async fn open(
        backend: Arc<dyn RemoteBackend>,
        kv: Arc<dyn KvStore>,
        store: Arc<SyncStore>,
        config: Config,
        passenger_id: Uuid,
    ) -> Result<Self, TripError> {
        let repo = TripRepository::new(backend);

        let queue = queue::load_queue(kv.as_ref()).await?;
        if !queue.is_empty() {
            info!(pending = queue.len(), "restored offline queue from storage");
        }
        store.metrics.queue_depth.set(queue.len() as i64);
        *store.queue.lock().await = queue;

        if let Some(raw) = kv.get_item(TRIPS_CACHE_KEY).await? {
            match serde_json::from_str::<Vec<Trip>>(&raw) {
                Ok(trips) => {
                    debug!(trips = trips.len(), "restored trips cache from storage");
                    *store.trips_cache.lock().await = Some(trips);
                }
                Err(err) => {
                    warn!(error = %err, "discarding unreadable trips cache");
                    kv.remove_item(TRIPS_CACHE_KEY).await?;
                }
            }
        }

        Ok(Self {
            passenger_id,
            repo,
            store,
            kv,
            config,
        })
    }

    pub fn passenger_id(&self) -> Uuid {
        self.passenger_id
    }

    pub fn repo(&self) -> &TripRepository {
        &self.repo
    }

    pub fn store(&self) -> &Arc<SyncStore> {
        &self.store
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn is_online(&self) -> bool {
        self.store.is_online()
    }

    /// Connectivity is observed by the platform layer and reported here;
    /// flipping online does not drain by itself, the sync loop does.
    pub fn set_online(&self, online: bool) {
        self.store.set_online(online);
    }

    /// Request a ride. Validation failures cost zero I/O; a valid request
    /// either completes against the backend or is deferred to the queue.
    pub async fn request_trip(
        &self,
        origin: Location,
        destination: Location,
        payment_method: &str,
    ) -> Result<Submission<Trip>, TripError> {
        let method = PaymentMethod::parse(payment_method)
            .ok_or_else(|| TripError::Validation("método de pago no reconocido".to_string()))?;

        let estimate = pricing::estimate(&origin, &destination);
        let trip = Trip::new_request(self.passenger_id, origin, destination, method, estimate);
        trip.validate()
            .map_err(|errors| TripError::Validation(errors.join("; ")))?;

        if !self.is_online() {
            return self.defer(OperationKind::RequestTrip { trip }).await;
        }

        match self
            .repo
            .request_ride(
                self.passenger_id,
                &trip.origin,
                &trip.destination,
                trip.payment_method,
            )
            .await
        {
            Ok(remote_trip) => Ok(Submission::Completed(remote_trip)),
            Err(err) if err.is_network() => {
                debug!(error = %err, "request_ride hit a network failure; deferring");
                self.defer(OperationKind::RequestTrip { trip }).await
            }
            Err(err) => Err(err),
        }
    }

    /// Cancel a trip. When online the current state is fetched first and an
    /// illegal cancellation fails without touching the backend further.
    pub async fn cancel_trip(&self, trip_id: Uuid) -> Result<Submission<Trip>, TripError> {
        if !self.is_online() {
            return self.defer(OperationKind::CancelTrip { trip_id }).await;
        }

        let current = match self.repo.get_trip_by_id(trip_id).await {
            Ok(trip) => trip,
            Err(err) if err.is_network() => {
                return self.defer(OperationKind::CancelTrip { trip_id }).await;
            }
            Err(err) => return Err(err),
        };

        if !current.can_be_cancelled() {
            return Err(TripError::State(format!(
                "el viaje no puede cancelarse en estado {}",
                current.status.as_str()
            )));
        }

        match self.repo.cancel_trip(trip_id).await {
            Ok(trip) => Ok(Submission::Completed(trip)),
            Err(err) if err.is_network() => {
                self.defer(OperationKind::CancelTrip { trip_id }).await
            }
            Err(err) => Err(err),
        }
    }

    /// Pay for a trip. Both identifiers are validated locally first.
    pub async fn pay_trip(
        &self,
        trip_id: Uuid,
        payment_method: &str,
    ) -> Result<Submission<Trip>, TripError> {
        let method = PaymentMethod::parse(payment_method)
            .ok_or_else(|| TripError::Validation("método de pago no reconocido".to_string()))?;

        if !self.is_online() {
            return self
                .defer(OperationKind::PayTrip { trip_id, method })
                .await;
        }

        match self.repo.pay_trip(trip_id, method).await {
            Ok(trip) => Ok(Submission::Completed(trip)),
            Err(err) if err.is_network() => {
                self.defer(OperationKind::PayTrip { trip_id, method }).await
            }
            Err(err) => Err(err),
        }
    }

    /// Rate a completed trip. Bounds are checked locally; the completed and
    /// not-yet-rated predicate is asserted against fresh state when online.
    pub async fn rate_trip(
        &self,
        trip_id: Uuid,
        rating: u8,
        comment: Option<String>,
    ) -> Result<Submission<Trip>, TripError> {
        if !(1..=5).contains(&rating) {
            return Err(TripError::Validation(
                "la calificación debe estar entre 1 y 5".to_string(),
            ));
        }

        if !self.is_online() {
            return self
                .defer(OperationKind::RateTrip {
                    trip_id,
                    rating,
                    comment,
                })
                .await;
        }

        let current = match self.repo.get_trip_by_id(trip_id).await {
            Ok(trip) => trip,
            Err(err) if err.is_network() => {
                return self
                    .defer(OperationKind::RateTrip {
                        trip_id,
                        rating,
                        comment,
                    })
                    .await;
            }
            Err(err) => return Err(err),
        };

        if !current.can_be_rated() {
            return Err(TripError::State(format!(
                "el viaje no puede calificarse en estado {}",
                current.status.as_str()
            )));
        }

        match self.repo.rate_trip(trip_id, rating, comment.as_deref()).await {
            Ok(trip) => Ok(Submission::Completed(trip)),
            Err(err) if err.is_network() => {
                self.defer(OperationKind::RateTrip {
                    trip_id,
                    rating,
                    comment,
                })
                .await
            }
            Err(err) => Err(err),
        }
    }

    /// Read-through trip list. A cached snapshot is returned immediately;
    /// when online a background refresh overwrites the cache so the *next*
    /// read observes fresh data. Without a cache this falls through to a
    /// direct fetch.
    pub async fn user_trips_with_cache(&self) -> Result<TripsSnapshot, TripError> {
        let cached = self.store.trips_cache.lock().await.clone();

        if let Some(trips) = cached {
            self.store
                .metrics
                .cache_reads_total
                .with_label_values(&["cache"])
                .inc();

            if self.is_online() {
                let service = self.clone();
                tokio::spawn(async move {
                    if let Err(err) = service.refresh_trips_cache().await {
                        warn!(error = %err, "background trips refresh failed");
                    }
                });
            }

            return Ok(TripsSnapshot {
                trips,
                from_cache: true,
            });
        }

        self.store
            .metrics
            .cache_reads_total
            .with_label_values(&["remote"])
            .inc();

        let trips = self.repo.get_user_trips(self.passenger_id).await?;
        self.write_trips_cache(&trips).await?;
        Ok(TripsSnapshot {
            trips,
            from_cache: false,
        })
    }

    async fn refresh_trips_cache(&self) -> Result<(), TripError> {
        let trips = self.repo.get_user_trips(self.passenger_id).await?;
        self.write_trips_cache(&trips).await
    }

    async fn write_trips_cache(&self, trips: &[Trip]) -> Result<(), TripError> {
        let json = serde_json::to_string(trips)
            .map_err(|err| TripError::Storage(format!("cache serialization failed: {err}")))?;
        self.kv.set_item(TRIPS_CACHE_KEY, json).await?;
        *self.store.trips_cache.lock().await = Some(trips.to_vec());
        Ok(())
    }

    /// Run one drain pass right now, same code path as the sync loop.
    pub async fn sync_now(&self) -> Result<DrainOutcome, TripError> {
        queue::drain_pass(&self.store, self.kv.as_ref(), &self.repo, &self.config).await
    }

    /// Select a driver for a trip and start the negotiation poller.
    pub async fn negotiate_driver(
        &self,
        trip_id: Uuid,
        driver_id: Uuid,
    ) -> Result<NegotiationSession, TripError> {
        NegotiationSession::begin(
            self.repo.clone(),
            self.store.metrics.clone(),
            &self.config,
            trip_id,
            driver_id,
        )
        .await
    }

    /// Logout teardown: forget the queue, the cache and the dead letter,
    /// both in memory and on disk.
    pub async fn clear_local_state(&self) -> Result<(), TripError> {
        self.kv.remove_item(QUEUE_KEY).await?;
        self.kv.remove_item(TRIPS_CACHE_KEY).await?;
        self.kv.remove_item(DEAD_LETTER_KEY).await?;

        self.store.queue.lock().await.clear();
        *self.store.trips_cache.lock().await = None;
        *self.store.last_sync.lock().await = None;
        self.store.metrics.queue_depth.set(0);

        info!("local sync state cleared");
        Ok(())
    }

    async fn defer(&self, kind: OperationKind) -> Result<Submission<Trip>, TripError> {
        let id = queue::enqueue(&self.store, self.kv.as_ref(), kind).await?;
        Ok(Submission::Deferred(id))
    }
}
