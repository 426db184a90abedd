use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::trip::{PaymentMethod, Trip};

/// Payload of a deferred mutating operation. The request variant carries the
/// locally constructed trip so a replay produces the same ride.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OperationKind {
    RequestTrip {
        trip: Trip,
    },
    CancelTrip {
        trip_id: Uuid,
    },
    PayTrip {
        trip_id: Uuid,
        method: PaymentMethod,
    },
    RateTrip {
        trip_id: Uuid,
        rating: u8,
        comment: Option<String>,
    },
}

impl OperationKind {
    /// Stable label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            OperationKind::RequestTrip { .. } => "request_trip",
            OperationKind::CancelTrip { .. } => "cancel_trip",
            OperationKind::PayTrip { .. } => "pay_trip",
            OperationKind::RateTrip { .. } => "rate_trip",
        }
    }
}

/// One entry of the offline queue. `attempts` counts every execution try
/// across drain passes; `failed_passes` counts passes in which the entry
/// exhausted its retries while at the head.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OfflineOperation {
    pub id: Uuid,
    pub kind: OperationKind,
    pub enqueued_at: DateTime<Utc>,
    pub attempts: u32,
    pub failed_passes: u32,
}

impl OfflineOperation {
    pub fn new(kind: OperationKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            enqueued_at: Utc::now(),
            attempts: 0,
            failed_passes: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_round_trips_through_json() {
        let op = OfflineOperation::new(OperationKind::RateTrip {
            trip_id: Uuid::from_u128(7),
            rating: 5,
            comment: Some("excelente conductor".to_string()),
        });

        let json = serde_json::to_string(&op).unwrap();
        let back: OfflineOperation = serde_json::from_str(&json).unwrap();
        assert_eq!(back, op);
        assert!(json.contains("\"type\":\"rate_trip\""));
    }

    #[test]
    fn fresh_operation_has_no_attempts() {
        let op = OfflineOperation::new(OperationKind::CancelTrip {
            trip_id: Uuid::from_u128(9),
        });
        assert_eq!(op.attempts, 0);
        assert_eq!(op.failed_passes, 0);
    }
}
