use std::sync::Arc;

use uuid::Uuid;

use crate::backend::{RemoteBackend, RemoteTrip};
use crate::error::TripError;
use crate::models::driver::DriverCandidate;
use crate::models::trip::{Location, PaymentMethod, Trip, TripStatus};

/// Adapter over the remote backend. Every call comes back as a plain
/// `Result` carrying domain types: raw status tokens are translated here and
/// transport details never reach callers.
#[derive(Clone)]
pub struct TripRepository {
    backend: Arc<dyn RemoteBackend>,
}

impl TripRepository {
    pub fn new(backend: Arc<dyn RemoteBackend>) -> Self {
        Self { backend }
    }

    pub async fn request_ride(
        &self,
        passenger_id: Uuid,
        origin: &Location,
        destination: &Location,
        method: PaymentMethod,
    ) -> Result<Trip, TripError> {
        let remote = self
            .backend
            .request_ride(passenger_id, origin, destination, method)
            .await?;
        normalize(remote)
    }

    pub async fn get_trip_by_id(&self, id: Uuid) -> Result<Trip, TripError> {
        normalize(self.backend.get_trip_by_id(id).await?)
    }

    pub async fn cancel_trip(&self, id: Uuid) -> Result<Trip, TripError> {
        normalize(self.backend.cancel_trip(id).await?)
    }

    pub async fn pay_trip(&self, id: Uuid, method: PaymentMethod) -> Result<Trip, TripError> {
        normalize(self.backend.pay_trip(id, method).await?)
    }

    pub async fn rate_trip(
        &self,
        id: Uuid,
        rating: u8,
        comment: Option<&str>,
    ) -> Result<Trip, TripError> {
        normalize(self.backend.rate_trip(id, rating, comment).await?)
    }

    pub async fn get_user_trips(&self, passenger_id: Uuid) -> Result<Vec<Trip>, TripError> {
        self.backend
            .get_user_trips(passenger_id)
            .await?
            .into_iter()
            .map(normalize)
            .collect()
    }

    pub async fn get_trips_by_status(
        &self,
        passenger_id: Uuid,
        status: TripStatus,
    ) -> Result<Vec<Trip>, TripError> {
        let trips = self.get_user_trips(passenger_id).await?;
        Ok(trips.into_iter().filter(|t| t.status == status).collect())
    }

    /// First trip still occupying the passenger, `None` when idle. Linear
    /// scan over the user's own trips; the list is small.
    pub async fn get_active_trip(&self, passenger_id: Uuid) -> Result<Option<Trip>, TripError> {
        let trips = self.get_user_trips(passenger_id).await?;
        Ok(trips.into_iter().find(|t| t.status.is_active()))
    }

    pub async fn get_available_drivers(&self) -> Result<Vec<DriverCandidate>, TripError> {
        self.backend.get_available_drivers().await
    }

    pub async fn select_driver(&self, trip_id: Uuid, driver_id: Uuid) -> Result<(), TripError> {
        self.backend.select_driver(trip_id, driver_id).await
    }
}

/// Translate a wire trip into the domain entity. Unknown status tokens are
/// rejected loudly instead of being guessed into a lifecycle state.
fn normalize(remote: RemoteTrip) -> Result<Trip, TripError> {
    let status = TripStatus::from_remote_token(&remote.status)
        .ok_or_else(|| TripError::Remote(format!("estado desconocido: {}", remote.status)))?;

    Ok(Trip {
        id: remote.id,
        passenger_id: remote.passenger_id,
        driver_id: remote.driver_id,
        origin: remote.origin,
        destination: remote.destination,
        status,
        fare: remote.fare,
        distance_km: remote.distance_km,
        duration_min: remote.duration_min,
        payment_method: remote.payment_method,
        payment_status: remote.payment_status,
        passenger_rating: remote.passenger_rating,
        driver_rating: remote.driver_rating,
        comment: remote.comment,
        created_at: remote.created_at,
        updated_at: remote.updated_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::InMemoryBackend;
    use crate::models::trip::Location;

    fn locations() -> (Location, Location) {
        (
            Location::new("Calle Serrano 10, Madrid", 40.4259, -3.6873),
            Location::new("Paseo de la Castellana 90, Madrid", 40.4459, -3.6903),
        )
    }

    #[tokio::test]
    async fn translates_localized_status_tokens() {
        let backend = Arc::new(InMemoryBackend::new());
        let repo = TripRepository::new(backend.clone());
        let passenger = Uuid::from_u128(1);
        let (origin, destination) = locations();

        let trip = repo
            .request_ride(passenger, &origin, &destination, PaymentMethod::Cash)
            .await
            .unwrap();
        assert_eq!(trip.status, TripStatus::Requested);

        backend.set_trip_status(trip.id, "conductor_en_camino");
        let trip = repo.get_trip_by_id(trip.id).await.unwrap();
        assert_eq!(trip.status, TripStatus::Arriving);
    }

    #[tokio::test]
    async fn unknown_status_token_is_a_remote_error() {
        let backend = Arc::new(InMemoryBackend::new());
        let repo = TripRepository::new(backend.clone());
        let passenger = Uuid::from_u128(1);
        let (origin, destination) = locations();

        let trip = repo
            .request_ride(passenger, &origin, &destination, PaymentMethod::Card)
            .await
            .unwrap();
        backend.set_trip_status(trip.id, "volando");

        let err = repo.get_trip_by_id(trip.id).await.unwrap_err();
        assert_eq!(err.kind(), "remote");
        assert!(err.to_string().contains("volando"));
    }

    #[tokio::test]
    async fn active_trip_skips_finished_rides() {
        let backend = Arc::new(InMemoryBackend::new());
        let repo = TripRepository::new(backend.clone());
        let passenger = Uuid::from_u128(2);
        let (origin, destination) = locations();

        let finished = repo
            .request_ride(passenger, &origin, &destination, PaymentMethod::Cash)
            .await
            .unwrap();
        backend.set_trip_status(finished.id, "completado");

        assert!(repo.get_active_trip(passenger).await.unwrap().is_none());

        let ongoing = repo
            .request_ride(passenger, &origin, &destination, PaymentMethod::Cash)
            .await
            .unwrap();

        let active = repo.get_active_trip(passenger).await.unwrap().unwrap();
        assert_eq!(active.id, ongoing.id);
    }

    #[tokio::test]
    async fn network_failures_pass_through_classified() {
        let backend = Arc::new(InMemoryBackend::new());
        let repo = TripRepository::new(backend.clone());
        backend.inject_network_failures(1);

        let err = repo.get_trip_by_id(Uuid::from_u128(3)).await.unwrap_err();
        assert!(err.is_network());
    }

    #[tokio::test]
    async fn filters_trips_by_status() {
        let backend = Arc::new(InMemoryBackend::new());
        let repo = TripRepository::new(backend.clone());
        let passenger = Uuid::from_u128(4);
        let (origin, destination) = locations();

        let a = repo
            .request_ride(passenger, &origin, &destination, PaymentMethod::Cash)
            .await
            .unwrap();
        let _b = repo
            .request_ride(passenger, &origin, &destination, PaymentMethod::Cash)
            .await
            .unwrap();
        backend.set_trip_status(a.id, "completado");

        let completed = repo
            .get_trips_by_status(passenger, TripStatus::Completed)
            .await
            .unwrap();
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].id, a.id);
    }
}
