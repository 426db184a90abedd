use crate::models::trip::GeoPoint;

const EARTH_RADIUS_KM: f64 = 6_371.0;

/// Great-circle distance between two points, used for fare and duration
/// estimates before the backend reports real route metrics.
pub fn haversine_km(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lng = (b.lng - a.lng).to_radians();

    let sin_lat = (delta_lat / 2.0).sin();
    let sin_lng = (delta_lng / 2.0).sin();

    let haversine = sin_lat * sin_lat + lat1.cos() * lat2.cos() * sin_lng * sin_lng;
    let central_angle = 2.0 * haversine.sqrt().asin();

    EARTH_RADIUS_KM * central_angle
}

#[cfg(test)]
mod tests {
    use super::haversine_km;
    use crate::models::trip::GeoPoint;

    #[test]
    fn zero_distance_for_same_point() {
        let p = GeoPoint {
            lat: 40.4168,
            lng: -3.7038,
        };
        let distance = haversine_km(&p, &p);
        assert!(distance < 1e-9);
    }

    #[test]
    fn madrid_to_barcelona_is_around_505_km() {
        let madrid = GeoPoint {
            lat: 40.4168,
            lng: -3.7038,
        };
        let barcelona = GeoPoint {
            lat: 41.3874,
            lng: 2.1686,
        };
        let distance = haversine_km(&madrid, &barcelona);
        assert!((distance - 505.0).abs() < 5.0);
    }
}
