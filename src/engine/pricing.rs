use crate::geo::haversine_km;
use crate::models::trip::Location;

const BASE_FARE: f64 = 2.50;
const PER_KM_RATE: f64 = 1.10;
const MINIMUM_FARE: f64 = 3.00;
const AVERAGE_SPEED_KMH: f64 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FareEstimate {
    pub distance_km: f64,
    pub fare: f64,
    pub duration_min: f64,
}

/// Local estimate shown before the backend prices the real route.
pub fn estimate(origin: &Location, destination: &Location) -> FareEstimate {
    let distance_km = haversine_km(&origin.point, &destination.point);

    FareEstimate {
        distance_km,
        fare: fare_for_distance(distance_km),
        duration_min: duration_minutes(distance_km),
    }
}

fn fare_for_distance(distance_km: f64) -> f64 {
    let raw = BASE_FARE + PER_KM_RATE * distance_km.max(0.0);
    let fare = raw.max(MINIMUM_FARE);
    (fare * 100.0).round() / 100.0
}

fn duration_minutes(distance_km: f64) -> f64 {
    (distance_km.max(0.0) / AVERAGE_SPEED_KMH) * 60.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::trip::Location;

    fn puerta_del_sol() -> Location {
        Location::new("Puerta del Sol, Madrid", 40.4169, -3.7035)
    }

    fn atocha() -> Location {
        Location::new("Estación de Atocha, Madrid", 40.4065, -3.6895)
    }

    #[test]
    fn longer_trips_cost_more() {
        let short = estimate(
            &puerta_del_sol(),
            &Location::new("Plaza Mayor, Madrid", 40.4155, -3.7074),
        );
        let long = estimate(&puerta_del_sol(), &atocha());

        assert!(long.distance_km > short.distance_km);
        assert!(long.fare > short.fare);
    }

    #[test]
    fn minimum_fare_applies_to_very_short_trips() {
        let origin = puerta_del_sol();
        let barely_away = Location::new("Calle de Alcalá 2, Madrid", 40.4170, -3.7034);

        let est = estimate(&origin, &barely_away);
        assert_eq!(est.fare, MINIMUM_FARE);
    }

    #[test]
    fn duration_follows_average_speed() {
        let est = estimate(&puerta_del_sol(), &atocha());
        let expected_min = (est.distance_km / AVERAGE_SPEED_KMH) * 60.0;
        assert!((est.duration_min - expected_min).abs() < 1e-9);
    }

    #[test]
    fn fare_is_rounded_to_cents() {
        let est = estimate(&puerta_del_sol(), &atocha());
        let cents = est.fare * 100.0;
        assert!((cents - cents.round()).abs() < 1e-9);
    }
}
