pub mod http;
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TripError;
use crate::models::driver::DriverCandidate;
use crate::models::trip::{Location, PaymentMethod, PaymentStatus};

/// Wire shape of a trip as the backend reports it. The status is a raw
/// token; translation into [`crate::models::trip::TripStatus`] happens in
/// the repository, nowhere else.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RemoteTrip {
    pub id: Uuid,
    pub passenger_id: Uuid,
    pub driver_id: Option<Uuid>,
    pub origin: Location,
    pub destination: Location,
    pub status: String,
    pub fare: Option<f64>,
    pub distance_km: Option<f64>,
    pub duration_min: Option<f64>,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub passenger_rating: Option<u8>,
    pub driver_rating: Option<u8>,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The fixed set of remote operations this client consumes. Implementations
/// must classify connectivity trouble as [`TripError::Network`] so the
/// orchestration layer can fall back to the offline queue.
#[async_trait]
pub trait RemoteBackend: Send + Sync {
    async fn request_ride(
        &self,
        passenger_id: Uuid,
        origin: &Location,
        destination: &Location,
        method: PaymentMethod,
    ) -> Result<RemoteTrip, TripError>;

    async fn get_trip_by_id(&self, id: Uuid) -> Result<RemoteTrip, TripError>;

    async fn cancel_trip(&self, id: Uuid) -> Result<RemoteTrip, TripError>;

    async fn pay_trip(&self, id: Uuid, method: PaymentMethod) -> Result<RemoteTrip, TripError>;

    async fn rate_trip(
        &self,
        id: Uuid,
        rating: u8,
        comment: Option<&str>,
    ) -> Result<RemoteTrip, TripError>;

    async fn get_user_trips(&self, passenger_id: Uuid) -> Result<Vec<RemoteTrip>, TripError>;

    async fn get_available_drivers(&self) -> Result<Vec<DriverCandidate>, TripError>;

    async fn select_driver(&self, trip_id: Uuid, driver_id: Uuid) -> Result<(), TripError>;
}
