use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::User;
use crate::entities::{
    Bid, BidStatus, Coordinates, Driver, FeeStatus, Place, Rider, Status, Trip, Vehicle,
};
use crate::error::Error;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CreateTripParams {
    pub origin: Place,
    pub destination: Place,
    pub notes: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UpdateTripStatusParams {
    pub status: String,
    pub reason: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CreateBidParams {
    pub trip_id: Uuid,
    pub amount: f64,
    pub message: Option<String>,
    pub eta_minutes: Option<i32>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegisterVehicleParams {
    pub make: String,
    pub model: String,
    pub plate: String,
}

/// A trip hydrated for presentation: parties, vehicle and the bid board
/// (ascending by amount).
#[derive(Clone, Debug, Serialize)]
pub struct TripDetail {
    pub trip: Trip,
    pub rider: Rider,
    pub driver: Option<Driver>,
    pub vehicle: Option<Vehicle>,
    pub bids: Vec<BidDetail>,
}

/// A bid annotated with the bidding driver and their first approved vehicle.
#[derive(Clone, Debug, Serialize)]
pub struct BidDetail {
    pub bid: Bid,
    pub driver: Driver,
    pub vehicle: Option<Vehicle>,
}

/// A bid as seen by the driver who placed it.
#[derive(Clone, Debug, Serialize)]
pub struct DriverBid {
    pub bid: Bid,
    pub trip: Trip,
    pub rider: Rider,
}

/// A pending trip projected for a prospecting driver. No bid board, just
/// the deadhead distance and whether this driver already has a bid in.
#[derive(Clone, Debug, Serialize)]
pub struct NearbyTrip {
    pub id: Uuid,
    pub origin: Place,
    pub destination: Place,
    pub distance_km: f64,
    pub estimated_fare: f64,
    pub created_at: DateTime<Utc>,
    pub distance_from_driver_km: f64,
    pub has_bid: bool,
}

impl NearbyTrip {
    pub fn new(trip: Trip, distance_from_driver_km: f64, has_bid: bool) -> Self {
        Self {
            id: trip.id,
            origin: trip.origin,
            destination: trip.destination,
            distance_km: trip.distance_km,
            estimated_fare: trip.estimated_fare,
            created_at: trip.created_at,
            distance_from_driver_km,
            has_bid,
        }
    }
}

#[async_trait]
pub trait TripAPI {
    async fn create_trip(&self, user: User, params: CreateTripParams) -> Result<Trip, Error>;
    async fn find_trip(&self, user: User, id: Uuid) -> Result<TripDetail, Error>;
    async fn accept_trip(&self, user: User, id: Uuid) -> Result<Trip, Error>;
    async fn update_trip_status(
        &self,
        user: User,
        id: Uuid,
        params: UpdateTripStatusParams,
    ) -> Result<Trip, Error>;
    async fn rider_trips(&self, user: User, status: Option<Status>) -> Result<Vec<Trip>, Error>;
    async fn driver_trips(&self, user: User, status: Option<Status>) -> Result<Vec<Trip>, Error>;
}

#[async_trait]
pub trait BidAPI {
    async fn create_bid(&self, user: User, params: CreateBidParams) -> Result<BidDetail, Error>;
    async fn find_trip_bids(&self, user: User, trip_id: Uuid) -> Result<Vec<BidDetail>, Error>;
    async fn accept_bid(&self, user: User, id: Uuid) -> Result<TripDetail, Error>;
    async fn driver_bids(
        &self,
        user: User,
        status: Option<BidStatus>,
    ) -> Result<Vec<DriverBid>, Error>;
}

#[async_trait]
pub trait SearchAPI {
    async fn nearby_trips(
        &self,
        user: User,
        radius_km: Option<f64>,
    ) -> Result<Vec<NearbyTrip>, Error>;
}

#[async_trait]
pub trait ProfileAPI {
    async fn create_rider(&self, user: User, name: String) -> Result<Rider, Error>;
    async fn create_driver(&self, user: User, name: String) -> Result<Driver, Error>;
    async fn register_vehicle(
        &self,
        user: User,
        params: RegisterVehicleParams,
    ) -> Result<Vehicle, Error>;
    async fn approve_vehicle(&self, user: User, id: Uuid) -> Result<Vehicle, Error>;
    async fn update_fee_status(
        &self,
        user: User,
        driver_id: Uuid,
        fee_status: FeeStatus,
    ) -> Result<Driver, Error>;
    async fn update_driver_location(
        &self,
        user: User,
        coordinates: Coordinates,
    ) -> Result<(), Error>;
}

/// Best-effort realtime collaborator. Implementations must never be relied
/// on for correctness: the engine treats every call as fire-and-forget and
/// swallows delivery failures after the state change has committed.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn broadcast_to_drivers(&self, event: &str, payload: Value) -> Result<(), Error>;
    async fn broadcast_trip_status(
        &self,
        trip_id: Uuid,
        status: &str,
        payload: Value,
    ) -> Result<(), Error>;
    async fn notify_user(&self, user_id: Uuid, role: &str, payload: Value) -> Result<(), Error>;
}

pub trait API: TripAPI + BidAPI + SearchAPI + ProfileAPI {}

pub type DynAPI = Arc<dyn API + Send + Sync>;
