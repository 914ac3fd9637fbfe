use chrono::{DateTime, Utc};
use oso::PolarClass;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::Place;
use crate::error::Error;
use crate::geo;

/// A ride request, tracked from creation through assignment to a terminal
/// state. Distance and the fare estimate are fixed at creation; the driver,
/// vehicle and final fare are set exactly once, on assignment.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Trip {
    pub id: Uuid,
    pub status: Status,
    pub rider_id: Uuid,
    pub driver_id: Option<Uuid>,
    pub vehicle_id: Option<Uuid>,
    pub origin: Place,
    pub destination: Place,
    pub notes: Option<String>,
    pub distance_km: f64,
    pub estimated_fare: f64,
    pub final_fare: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub driver_assigned_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    pub cancelled_by: Option<CancelledBy>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Pending,
    DriverAssigned,
    DriverArrived,
    InProgress,
    Completed,
    Cancelled,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::DriverAssigned => "driver_assigned",
            Self::DriverArrived => "driver_arrived",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "driver_assigned" => Some(Self::DriverAssigned),
            "driver_arrived" => Some(Self::DriverArrived),
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelledBy {
    Rider,
    Driver,
    System,
}

impl CancelledBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rider => "rider",
            Self::Driver => "driver",
            Self::System => "system",
        }
    }
}

impl Trip {
    pub fn new(rider_id: Uuid, origin: Place, destination: Place, notes: Option<String>) -> Self {
        let distance_km = geo::distance_km(&origin.coordinates, &destination.coordinates);
        let estimated_fare = geo::estimate_fare(distance_km);

        Self {
            id: Uuid::new_v4(),
            status: Status::Pending,
            rider_id,
            driver_id: None,
            vehicle_id: None,
            origin,
            destination,
            notes,
            distance_km,
            estimated_fare,
            final_fare: None,
            created_at: Utc::now(),
            driver_assigned_at: None,
            started_at: None,
            completed_at: None,
            cancelled_at: None,
            cancellation_reason: None,
            cancelled_by: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        match self.status {
            Status::Pending => true,
            _ => false,
        }
    }

    #[tracing::instrument]
    pub fn assign_driver(
        &mut self,
        driver_id: Uuid,
        vehicle_id: Uuid,
        final_fare: f64,
    ) -> Result<(), Error> {
        match self.status {
            Status::Pending => {
                self.status = Status::DriverAssigned;
                self.driver_id = Some(driver_id);
                self.vehicle_id = Some(vehicle_id);
                self.final_fare = Some(final_fare);
                self.driver_assigned_at = Some(Utc::now());
                Ok(())
            }
            _ => Err(Error::bad_request("Trip is no longer available")),
        }
    }

    pub fn arrive(&mut self) -> Result<(), Error> {
        match self.status {
            Status::DriverAssigned => {
                self.status = Status::DriverArrived;
                Ok(())
            }
            _ => Err(Error::bad_request("Trip cannot be marked as arrived")),
        }
    }

    pub fn start(&mut self) -> Result<(), Error> {
        match self.status {
            Status::DriverAssigned | Status::DriverArrived => {
                self.status = Status::InProgress;
                self.started_at = Some(Utc::now());
                Ok(())
            }
            _ => Err(Error::bad_request("Trip cannot be started")),
        }
    }

    pub fn complete(&mut self) -> Result<(), Error> {
        match self.status {
            Status::InProgress => {
                self.status = Status::Completed;
                self.completed_at = Some(Utc::now());
                Ok(())
            }
            _ => Err(Error::bad_request("Trip cannot be completed")),
        }
    }

    #[tracing::instrument]
    pub fn cancel(
        &mut self,
        reason: Option<String>,
        cancelled_by: CancelledBy,
    ) -> Result<(), Error> {
        match self.status {
            Status::Completed | Status::Cancelled => {
                Err(Error::bad_request("Trip cannot be cancelled"))
            }
            _ => {
                self.status = Status::Cancelled;
                self.cancelled_at = Some(Utc::now());
                self.cancellation_reason = reason;
                self.cancelled_by = Some(cancelled_by);
                Ok(())
            }
        }
    }
}

impl PolarClass for Trip {
    fn get_polar_class_builder() -> oso::ClassBuilder<Trip> {
        oso::Class::builder()
            .name("Trip")
            .add_attribute_getter("id", |recv: &Trip| recv.id.clone())
            .add_attribute_getter("status", |recv: &Trip| recv.status.as_str().to_string())
            .add_attribute_getter("rider_id", |recv: &Trip| recv.rider_id.clone())
            .add_attribute_getter("driver_id", |recv: &Trip| recv.driver_id.clone())
    }

    fn get_polar_class() -> oso::Class {
        let builder = Trip::get_polar_class_builder();
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::Coordinates;

    fn place(latitude: f64, longitude: f64) -> Place {
        Place::new(
            Coordinates {
                latitude,
                longitude,
            },
            "1 Test Street".into(),
        )
    }

    fn pending_trip() -> Trip {
        Trip::new(Uuid::new_v4(), place(0.0, 0.0), place(0.0, 0.09), None)
    }

    fn assigned_trip() -> (Trip, Uuid) {
        let mut trip = pending_trip();
        let driver_id = Uuid::new_v4();
        trip.assign_driver(driver_id, Uuid::new_v4(), 6.00).unwrap();
        (trip, driver_id)
    }

    #[test]
    fn new_trip_is_pending_with_an_estimate() {
        let trip = pending_trip();

        assert_eq!(trip.status, Status::Pending);
        assert!((trip.distance_km - 10.0).abs() < 0.05);
        assert_eq!(trip.estimated_fare, 7.00);
        assert!(trip.driver_id.is_none());
        assert!(trip.vehicle_id.is_none());
        assert!(trip.final_fare.is_none());
        assert!(trip.driver_assigned_at.is_none());
    }

    #[test]
    fn assignment_sets_driver_fields_exactly_once() {
        let (mut trip, driver_id) = assigned_trip();

        assert_eq!(trip.status, Status::DriverAssigned);
        assert_eq!(trip.driver_id, Some(driver_id));
        assert_eq!(trip.final_fare, Some(6.00));
        assert!(trip.driver_assigned_at.is_some());

        let err = trip
            .assign_driver(Uuid::new_v4(), Uuid::new_v4(), 8.00)
            .unwrap_err();
        assert!(err.is_bad_request());
        assert_eq!(trip.driver_id, Some(driver_id));
    }

    #[test]
    fn start_accepts_assignment_and_arrival() {
        let (mut trip, _) = assigned_trip();
        trip.start().unwrap();
        assert_eq!(trip.status, Status::InProgress);
        assert!(trip.started_at.is_some());

        let (mut trip, _) = assigned_trip();
        trip.arrive().unwrap();
        assert_eq!(trip.status, Status::DriverArrived);
        trip.start().unwrap();
        assert_eq!(trip.status, Status::InProgress);
    }

    #[test]
    fn start_rejects_other_states() {
        let mut trip = pending_trip();
        assert!(trip.start().unwrap_err().is_bad_request());

        let (mut trip, _) = assigned_trip();
        trip.start().unwrap();
        trip.complete().unwrap();
        assert!(trip.start().unwrap_err().is_bad_request());
    }

    #[test]
    fn arrive_requires_an_assigned_driver() {
        let mut trip = pending_trip();
        assert!(trip.arrive().unwrap_err().is_bad_request());

        let (mut trip, _) = assigned_trip();
        trip.start().unwrap();
        assert!(trip.arrive().unwrap_err().is_bad_request());
    }

    #[test]
    fn complete_requires_a_started_trip() {
        let (mut trip, _) = assigned_trip();
        assert!(trip.complete().unwrap_err().is_bad_request());

        trip.start().unwrap();
        trip.complete().unwrap();
        assert_eq!(trip.status, Status::Completed);
        assert!(trip.completed_at.is_some());
    }

    #[test]
    fn cancellation_records_reason_and_actor() {
        let mut trip = pending_trip();
        trip.cancel(Some("changed my mind".into()), CancelledBy::Rider)
            .unwrap();

        assert_eq!(trip.status, Status::Cancelled);
        assert_eq!(trip.cancellation_reason.as_deref(), Some("changed my mind"));
        assert_eq!(trip.cancelled_by, Some(CancelledBy::Rider));
        assert!(trip.cancelled_at.is_some());
    }

    #[test]
    fn terminal_trips_cannot_be_cancelled() {
        let (mut trip, _) = assigned_trip();
        trip.start().unwrap();
        trip.complete().unwrap();

        let err = trip.cancel(None, CancelledBy::Rider).unwrap_err();
        assert!(err.is_bad_request());
        assert_eq!(err.to_string(), "Trip cannot be cancelled");

        let mut trip = pending_trip();
        trip.cancel(None, CancelledBy::System).unwrap();
        assert!(trip.cancel(None, CancelledBy::System).unwrap_err().is_bad_request());
    }

    #[test]
    fn in_progress_trips_can_still_be_cancelled() {
        let (mut trip, _) = assigned_trip();
        trip.start().unwrap();

        trip.cancel(Some("rider unreachable".into()), CancelledBy::Driver)
            .unwrap();
        assert_eq!(trip.cancelled_by, Some(CancelledBy::Driver));
    }

    #[test]
    fn status_strings_round_trip() {
        for status in [
            Status::Pending,
            Status::DriverAssigned,
            Status::DriverArrived,
            Status::InProgress,
            Status::Completed,
            Status::Cancelled,
        ] {
            assert_eq!(Status::parse(status.as_str()), Some(status));
        }

        assert_eq!(Status::parse("accepted"), None);
    }
}
