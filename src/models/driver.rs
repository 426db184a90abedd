use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VehicleInfo {
    pub make: String,
    pub model: String,
    pub plate: String,
}

/// Read-only snapshot of a driver offered for selection. Not persisted by
/// this engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DriverCandidate {
    pub id: Uuid,
    pub name: String,
    pub vehicle: VehicleInfo,
    pub rating: f64,
}
