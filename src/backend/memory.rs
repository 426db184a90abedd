use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use crate::backend::{RemoteBackend, RemoteTrip};
use crate::error::TripError;
use crate::models::driver::DriverCandidate;
use crate::models::trip::{Location, PaymentMethod, PaymentStatus};

/// In-process stand-in for the real backend, used by the demo binary and the
/// test suite. Speaks the legacy Spanish status vocabulary on purpose so the
/// repository's translation table is always exercised.
#[derive(Default)]
pub struct InMemoryBackend {
    trips: DashMap<Uuid, RemoteTrip>,
    drivers: DashMap<Uuid, DriverCandidate>,
    fail_next: AtomicU32,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` remote calls fail with a connectivity error.
    pub fn inject_network_failures(&self, n: u32) {
        self.fail_next.store(n, Ordering::SeqCst);
    }

    pub fn seed_driver(&self, driver: DriverCandidate) {
        self.drivers.insert(driver.id, driver);
    }

    /// Overwrite a trip's raw status token, simulating a backend-side
    /// decision (driver accepted, ride finished, ...).
    pub fn set_trip_status(&self, trip_id: Uuid, token: &str) {
        if let Some(mut trip) = self.trips.get_mut(&trip_id) {
            trip.status = token.to_string();
            trip.updated_at = Utc::now();
        }
    }

    pub fn assign_driver(&self, trip_id: Uuid, driver_id: Uuid) {
        if let Some(mut trip) = self.trips.get_mut(&trip_id) {
            trip.driver_id = Some(driver_id);
            trip.updated_at = Utc::now();
        }
    }

    pub fn unassign_driver(&self, trip_id: Uuid) {
        if let Some(mut trip) = self.trips.get_mut(&trip_id) {
            trip.driver_id = None;
            trip.updated_at = Utc::now();
        }
    }

    pub fn stored_trip(&self, trip_id: Uuid) -> Option<RemoteTrip> {
        self.trips.get(&trip_id).map(|t| t.clone())
    }

    pub fn trip_count(&self) -> usize {
        self.trips.len()
    }

    fn check_connectivity(&self) -> Result<(), TripError> {
        let remaining = self.fail_next.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_next.store(remaining - 1, Ordering::SeqCst);
            return Err(TripError::Network("connection refused".to_string()));
        }
        Ok(())
    }

    fn trip_or_remote_error(&self, id: Uuid) -> Result<RemoteTrip, TripError> {
        self.trips
            .get(&id)
            .map(|t| t.clone())
            .ok_or_else(|| TripError::Remote(format!("viaje {id} no encontrado")))
    }
}

#[async_trait]
impl RemoteBackend for InMemoryBackend {
    async fn request_ride(
        &self,
        passenger_id: Uuid,
        origin: &Location,
        destination: &Location,
        method: PaymentMethod,
    ) -> Result<RemoteTrip, TripError> {
        self.check_connectivity()?;

        let now = Utc::now();
        let trip = RemoteTrip {
            id: Uuid::new_v4(),
            passenger_id,
            driver_id: None,
            origin: origin.clone(),
            destination: destination.clone(),
            status: "solicitado".to_string(),
            fare: None,
            distance_km: None,
            duration_min: None,
            payment_method: method,
            payment_status: PaymentStatus::Pending,
            passenger_rating: None,
            driver_rating: None,
            comment: None,
            created_at: now,
            updated_at: now,
        };

        self.trips.insert(trip.id, trip.clone());
        Ok(trip)
    }

    async fn get_trip_by_id(&self, id: Uuid) -> Result<RemoteTrip, TripError> {
        self.check_connectivity()?;
        self.trip_or_remote_error(id)
    }

    async fn cancel_trip(&self, id: Uuid) -> Result<RemoteTrip, TripError> {
        self.check_connectivity()?;

        let mut trip = self
            .trips
            .get_mut(&id)
            .ok_or_else(|| TripError::Remote(format!("viaje {id} no encontrado")))?;

        if matches!(trip.status.as_str(), "completado" | "cancelado") {
            return Err(TripError::Remote(
                "el viaje ya está finalizado".to_string(),
            ));
        }

        trip.status = "cancelado".to_string();
        trip.updated_at = Utc::now();
        Ok(trip.clone())
    }

    async fn pay_trip(&self, id: Uuid, _method: PaymentMethod) -> Result<RemoteTrip, TripError> {
        self.check_connectivity()?;

        let mut trip = self
            .trips
            .get_mut(&id)
            .ok_or_else(|| TripError::Remote(format!("viaje {id} no encontrado")))?;

        trip.payment_status = PaymentStatus::Paid;
        trip.updated_at = Utc::now();
        Ok(trip.clone())
    }

    async fn rate_trip(
        &self,
        id: Uuid,
        rating: u8,
        comment: Option<&str>,
    ) -> Result<RemoteTrip, TripError> {
        self.check_connectivity()?;

        let mut trip = self
            .trips
            .get_mut(&id)
            .ok_or_else(|| TripError::Remote(format!("viaje {id} no encontrado")))?;

        trip.passenger_rating = Some(rating);
        trip.comment = comment.map(String::from);
        trip.updated_at = Utc::now();
        Ok(trip.clone())
    }

    async fn get_user_trips(&self, passenger_id: Uuid) -> Result<Vec<RemoteTrip>, TripError> {
        self.check_connectivity()?;

        let mut trips: Vec<RemoteTrip> = self
            .trips
            .iter()
            .filter(|entry| entry.value().passenger_id == passenger_id)
            .map(|entry| entry.value().clone())
            .collect();

        trips.sort_by_key(|t| t.created_at);
        Ok(trips)
    }

    async fn get_available_drivers(&self) -> Result<Vec<DriverCandidate>, TripError> {
        self.check_connectivity()?;

        Ok(self
            .drivers
            .iter()
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn select_driver(&self, trip_id: Uuid, driver_id: Uuid) -> Result<(), TripError> {
        self.check_connectivity()?;

        if !self.drivers.contains_key(&driver_id) {
            return Err(TripError::Remote(format!(
                "conductor {driver_id} no disponible"
            )));
        }

        // the selection attaches the driver immediately; acceptance arrives
        // later as a status change
        let mut trip = self
            .trips
            .get_mut(&trip_id)
            .ok_or_else(|| TripError::Remote(format!("viaje {trip_id} no encontrado")))?;
        trip.driver_id = Some(driver_id);
        trip.updated_at = Utc::now();

        Ok(())
    }
}
