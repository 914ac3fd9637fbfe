//! Great-circle distance and fare estimation.
//!
//! Trip distance is a routing-free proxy: the haversine distance between the
//! origin and destination coordinates. Fares are a flat base charge plus a
//! per-kilometre rate, floored at the base charge.

use crate::entities::Coordinates;

/// Mean Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Flag-drop charge applied to every trip.
pub const BASE_FARE: f64 = 2.00;

/// Per-kilometre rate charged on top of the base fare.
pub const PER_KM_RATE: f64 = 0.50;

/// Haversine distance between two coordinates, in kilometres.
pub fn distance_km(origin: &Coordinates, destination: &Coordinates) -> f64 {
    let lat1 = origin.latitude.to_radians();
    let lat2 = destination.latitude.to_radians();
    let dlat = (destination.latitude - origin.latitude).to_radians();
    let dlon = (destination.longitude - origin.longitude).to_radians();

    let sin_dlat = (dlat * 0.5).sin();
    let sin_dlon = (dlon * 0.5).sin();
    let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlon * sin_dlon;

    2.0 * EARTH_RADIUS_KM * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Estimated fare for a trip of the given length.
///
/// Total, non-decreasing in distance and floored at [`BASE_FARE`], so a
/// zero or negative distance still yields the base charge.
pub fn estimate_fare(distance_km: f64) -> f64 {
    round_to_cents((BASE_FARE + distance_km * PER_KM_RATE).max(BASE_FARE))
}

/// Normalize a monetary amount to two decimal places.
pub fn round_to_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coordinates(latitude: f64, longitude: f64) -> Coordinates {
        Coordinates {
            latitude,
            longitude,
        }
    }

    #[test]
    fn distance_is_symmetric() {
        let a = coordinates(52.5200, 13.4050);
        let b = coordinates(48.8566, 2.3522);

        assert_eq!(distance_km(&a, &b), distance_km(&b, &a));
    }

    #[test]
    fn distance_between_identical_points_is_zero() {
        let a = coordinates(-33.8688, 151.2093);

        assert_eq!(distance_km(&a, &a), 0.0);
    }

    #[test]
    fn equatorial_ten_km_trip() {
        let origin = coordinates(0.0, 0.0);
        let destination = coordinates(0.0, 0.09);

        let distance = distance_km(&origin, &destination);

        assert!((distance - 10.0).abs() < 0.05, "distance was {}", distance);
        assert_eq!(estimate_fare(distance), 7.00);
    }

    #[test]
    fn fare_is_floored_at_the_base_charge() {
        assert_eq!(estimate_fare(0.0), BASE_FARE);
        assert_eq!(estimate_fare(-3.0), BASE_FARE);
    }

    #[test]
    fn fare_is_non_decreasing_in_distance() {
        let mut previous = estimate_fare(0.0);

        for step in 1..100 {
            let fare = estimate_fare(step as f64 * 0.5);
            assert!(fare >= previous);
            previous = fare;
        }
    }

    #[test]
    fn amounts_are_normalized_to_cents() {
        assert_eq!(round_to_cents(7.0035), 7.00);
        assert_eq!(round_to_cents(5.119), 5.12);
        assert_eq!(round_to_cents(8.0), 8.0);
    }
}
