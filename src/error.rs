use thiserror::Error;

/// Engine-wide error taxonomy.
///
/// `Network` is the only variant the orchestration layer absorbs: a
/// connectivity-classified failure on a mutating operation turns into an
/// offline enqueue instead of reaching the caller. Everything else is
/// surfaced as-is.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TripError {
    #[error("validación: {0}")]
    Validation(String),

    #[error("estado inválido: {0}")]
    State(String),

    #[error("network failure: {0}")]
    Network(String),

    #[error("remote rejection: {0}")]
    Remote(String),

    #[error("local storage failure: {0}")]
    Storage(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl TripError {
    pub fn is_network(&self) -> bool {
        matches!(self, TripError::Network(_))
    }

    /// Stable lowercase label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            TripError::Validation(_) => "validation",
            TripError::State(_) => "state",
            TripError::Network(_) => "network",
            TripError::Remote(_) => "remote",
            TripError::Storage(_) => "storage",
            TripError::Internal(_) => "internal",
        }
    }
}

/// Map an HTTP status to the engine taxonomy. Server-side and transport
/// trouble counts as connectivity; 4xx is a genuine remote rejection.
pub fn classify_http_status(status: u16, message: String) -> TripError {
    match status {
        408 | 429 => TripError::Network(message),
        500..=599 => TripError::Network(message),
        400..=499 => TripError::Remote(message),
        _ => TripError::Internal(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_is_the_only_absorbable_kind() {
        assert!(TripError::Network("timeout".into()).is_network());
        assert!(!TripError::Remote("rechazado".into()).is_network());
        assert!(!TripError::Validation("falta dirección".into()).is_network());
    }

    #[test]
    fn classifies_http_statuses() {
        assert!(classify_http_status(503, "unavailable".into()).is_network());
        assert!(classify_http_status(429, "slow down".into()).is_network());
        assert_eq!(
            classify_http_status(409, "viaje ya cancelado".into()).kind(),
            "remote"
        );
        assert_eq!(classify_http_status(700, "weird".into()).kind(), "internal");
    }
}
