use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::pricing::FareEstimate;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// A named pickup or dropoff point.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Location {
    pub address: String,
    pub point: GeoPoint,
}

impl Location {
    pub fn new(address: impl Into<String>, lat: f64, lng: f64) -> Self {
        Self {
            address: address.into(),
            point: GeoPoint { lat, lng },
        }
    }
}

/// Canonical trip lifecycle vocabulary. The backend may answer with other
/// tokens (including the legacy Spanish ones); those are translated at the
/// repository boundary through [`TripStatus::from_remote_token`] and never
/// leak past it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TripStatus {
    Requested,
    Accepted,
    Arriving,
    InProgress,
    Completed,
    Cancelled,
}

impl TripStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TripStatus::Requested => "requested",
            TripStatus::Accepted => "accepted",
            TripStatus::Arriving => "arriving",
            TripStatus::InProgress => "in_progress",
            TripStatus::Completed => "completed",
            TripStatus::Cancelled => "cancelled",
        }
    }

    /// Translation table for every status token the backends are known to
    /// emit. Unknown tokens must be rejected by the caller, not guessed.
    pub fn from_remote_token(token: &str) -> Option<TripStatus> {
        match token.trim().to_lowercase().as_str() {
            "requested" | "solicitado" | "pendiente" => Some(TripStatus::Requested),
            "accepted" | "aceptado" => Some(TripStatus::Accepted),
            "arriving" | "conductor_en_camino" | "llegando" => Some(TripStatus::Arriving),
            "in_progress" | "en_curso" | "en_viaje" => Some(TripStatus::InProgress),
            "completed" | "completado" | "finalizado" => Some(TripStatus::Completed),
            "cancelled" | "cancelado" => Some(TripStatus::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TripStatus::Completed | TripStatus::Cancelled)
    }

    /// A trip still occupying the passenger: anything not terminal.
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    Wallet,
}

impl PaymentMethod {
    pub fn parse(raw: &str) -> Option<PaymentMethod> {
        match raw.trim().to_lowercase().as_str() {
            "cash" | "efectivo" => Some(PaymentMethod::Cash),
            "card" | "tarjeta" => Some(PaymentMethod::Card),
            "wallet" | "billetera" => Some(PaymentMethod::Wallet),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
}

/// One ride, request through completion or cancellation. Mutations happen
/// only through remote confirmation; the client never edits a trip in place.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Trip {
    pub id: Uuid,
    pub passenger_id: Uuid,
    pub driver_id: Option<Uuid>,
    pub origin: Location,
    pub destination: Location,
    pub status: TripStatus,
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

impl Trip {
    /// Build a freshly requested trip with its local estimate attached.
    pub fn new_request(
        passenger_id: Uuid,
        origin: Location,
        destination: Location,
        payment_method: PaymentMethod,
        estimate: FareEstimate,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            passenger_id,
            driver_id: None,
            origin,
            destination,
            status: TripStatus::Requested,
            fare: Some(estimate.fare),
            distance_km: Some(estimate.distance_km),
            duration_min: Some(estimate.duration_min),
            payment_method,
            payment_status: PaymentStatus::Pending,
            passenger_rating: None,
            driver_rating: None,
            comment: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Checks every entity invariant and collects the full list of
    /// violations. Messages are user-facing.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        let origin = self.origin.address.trim();
        let destination = self.destination.address.trim();

        if origin.is_empty() {
            errors.push("la dirección de origen es obligatoria".to_string());
        }
        if destination.is_empty() {
            errors.push("la dirección de destino es obligatoria".to_string());
        }
        if !origin.is_empty() && origin.eq_ignore_ascii_case(destination) {
            errors.push("las direcciones de origen y destino no pueden ser iguales".to_string());
        }

        if let Some(fare) = self.fare {
            if fare < 0.0 {
                errors.push("la tarifa no puede ser negativa".to_string());
            }
        }
        if let Some(distance) = self.distance_km {
            if distance < 0.0 {
                errors.push("la distancia no puede ser negativa".to_string());
            }
        }
        if let Some(duration) = self.duration_min {
            if duration < 0.0 {
                errors.push("la duración no puede ser negativa".to_string());
            }
        }

        for rating in [self.passenger_rating, self.driver_rating]
            .into_iter()
            .flatten()
        {
            if !(1..=5).contains(&rating) {
                errors.push("la calificación debe estar entre 1 y 5".to_string());
            }
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    pub fn can_be_cancelled(&self) -> bool {
        matches!(
            self.status,
            TripStatus::Requested | TripStatus::Accepted | TripStatus::Arriving
        )
    }

    pub fn can_be_rated(&self) -> bool {
        self.status == TripStatus::Completed && self.passenger_rating.is_none()
    }

    pub fn can_be_completed(&self) -> bool {
        self.status == TripStatus::InProgress
    }
}
