use oso::{Oso, PolarClass};

use crate::auth::User;
use crate::entities::{Driver, Trip};

pub fn new() -> Oso {
    let mut o = Oso::new();

    o.register_class(User::get_polar_class()).unwrap();
    o.register_class(Trip::get_polar_class()).unwrap();
    o.register_class(Driver::get_polar_class()).unwrap();

    o.load_str(include_str!("rules.polar")).unwrap();

    o
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    use crate::entities::{Coordinates, Place};

    fn place(latitude: f64, longitude: f64) -> Place {
        Place::new(
            Coordinates {
                latitude,
                longitude,
            },
            "1 Test Street".into(),
        )
    }

    fn pending_trip(rider_id: Uuid) -> Trip {
        Trip::new(rider_id, place(0.0, 0.0), place(0.0, 0.09), None)
    }

    fn rider() -> User {
        User::new(Uuid::new_v4(), vec!["rider".into()])
    }

    fn driver() -> User {
        User::new(Uuid::new_v4(), vec!["driver".into()])
    }

    #[test]
    fn rider_reads_cancels_and_accepts_bids_on_own_trip() {
        let authorizor = new();
        let rider = rider();
        let trip = pending_trip(rider.id);

        assert!(authorizor.is_allowed(rider.clone(), "read", trip.clone()).unwrap());
        assert!(authorizor.is_allowed(rider.clone(), "cancel", trip.clone()).unwrap());
        assert!(authorizor.is_allowed(rider.clone(), "list_bids", trip.clone()).unwrap());
        assert!(authorizor.is_allowed(rider.clone(), "accept_bid", trip.clone()).unwrap());
        assert!(!authorizor.is_allowed(rider, "progress", trip).unwrap());
    }

    #[test]
    fn strangers_are_denied() {
        let authorizor = new();
        let trip = pending_trip(Uuid::new_v4());
        let stranger = rider();

        assert!(!authorizor.is_allowed(stranger.clone(), "read", trip.clone()).unwrap());
        assert!(!authorizor.is_allowed(stranger.clone(), "cancel", trip.clone()).unwrap());
        assert!(!authorizor.is_allowed(stranger, "accept_bid", trip).unwrap());
    }

    #[test]
    fn prospecting_drivers_read_pending_trips_only() {
        let authorizor = new();
        let prospect = driver();
        let mut trip = pending_trip(Uuid::new_v4());

        assert!(authorizor.is_allowed(prospect.clone(), "read", trip.clone()).unwrap());
        assert!(!authorizor.is_allowed(prospect.clone(), "cancel", trip.clone()).unwrap());

        trip.assign_driver(Uuid::new_v4(), Uuid::new_v4(), 6.00)
            .unwrap();

        assert!(!authorizor.is_allowed(prospect, "read", trip).unwrap());
    }

    #[test]
    fn assigned_driver_reads_progresses_and_cancels() {
        let authorizor = new();
        let assigned = driver();
        let mut trip = pending_trip(Uuid::new_v4());
        trip.assign_driver(assigned.id, Uuid::new_v4(), 6.00)
            .unwrap();

        assert!(authorizor.is_allowed(assigned.clone(), "read", trip.clone()).unwrap());
        assert!(authorizor.is_allowed(assigned.clone(), "progress", trip.clone()).unwrap());
        assert!(authorizor.is_allowed(assigned.clone(), "cancel", trip.clone()).unwrap());
        assert!(!authorizor.is_allowed(assigned, "accept_bid", trip).unwrap());
    }

    #[test]
    fn system_role_is_unrestricted() {
        let authorizor = new();
        let system = User::new_system_user();
        let trip = pending_trip(Uuid::new_v4());

        assert!(authorizor.is_allowed(system.clone(), "read", trip.clone()).unwrap());
        assert!(authorizor.is_allowed(system.clone(), "cancel", trip.clone()).unwrap());
        assert!(authorizor.is_allowed(system, "progress", trip).unwrap());
    }

    #[test]
    fn drivers_update_their_own_location_only() {
        let authorizor = new();
        let user = driver();
        let own_profile = Driver::new(user.id, "Ada".into());
        let other_profile = Driver::new(Uuid::new_v4(), "Grace".into());

        assert!(authorizor
            .is_allowed(user.clone(), "update_location", own_profile)
            .unwrap());
        assert!(!authorizor
            .is_allowed(user, "update_location", other_profile)
            .unwrap());
    }
}
