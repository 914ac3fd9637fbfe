use super::helpers::{
    driver_has_bid, fetch_driver, fetch_driver_for_update, fetch_rider, fetch_trip,
    fetch_trip_for_update, first_approved_vehicle, load_trip_detail, reject_pending_bids,
    update_driver, update_trip,
};
use super::Engine;

use async_trait::async_trait;
use serde_json::json;
use sqlx::{types::Json, Acquire, Executor, PgConnection, Row};
use uuid::Uuid;

use crate::{
    api::{CreateTripParams, TripAPI, TripDetail, UpdateTripStatusParams},
    auth::User,
    entities::{CancelledBy, Status, Trip},
    error::Error,
};

const PAGE_SIZE: i64 = 20;

#[async_trait]
impl TripAPI for Engine {
    #[tracing::instrument(skip(self))]
    async fn create_trip(&self, user: User, params: CreateTripParams) -> Result<Trip, Error> {
        let mut conn = self.pool.acquire().await?;

        let rider = fetch_rider(&mut conn, &user.id).await?;

        let trip = Trip::new(rider.id, params.origin, params.destination, params.notes);

        conn.execute(
            sqlx::query("INSERT INTO trips (id, status, rider_id, driver_id, created_at, data) VALUES ($1, $2, $3, $4, $5, $6)")
                .bind(&trip.id)
                .bind(trip.status.as_str())
                .bind(&trip.rider_id)
                .bind(&trip.driver_id)
                .bind(&trip.created_at)
                .bind(Json(&trip)),
        )
        .await?;

        self.broadcast_to_drivers(
            "trip:new",
            json!({
                "trip_id": trip.id,
                "pickup_address": trip.origin.address,
                "distance_km": trip.distance_km,
                "estimated_fare": trip.estimated_fare,
            }),
        )
        .await;

        Ok(trip)
    }

    #[tracing::instrument(skip(self))]
    async fn find_trip(&self, user: User, id: Uuid) -> Result<TripDetail, Error> {
        let mut conn = self.pool.acquire().await?;

        let trip = fetch_trip(&mut conn, &id).await?;

        if let Err(err) = self.authorize(user.clone(), "read", trip.clone()) {
            if !err.is_forbidden() {
                return Err(err);
            }

            // a driver who bid on the trip keeps access after it leaves pending
            let bidder = user.has_role("driver".into())
                && driver_has_bid(&mut conn, &trip.id, &user.id).await?;

            if !bidder {
                return Err(Error::forbidden());
            }
        }

        load_trip_detail(&mut conn, trip).await
    }

    /// Direct acceptance: an eligible driver claims a pending trip at its
    /// estimated fare, bypassing the bid board. The pending check runs under
    /// the trip row lock, so of two competing drivers exactly one wins.
    #[tracing::instrument(skip(self))]
    async fn accept_trip(&self, user: User, id: Uuid) -> Result<Trip, Error> {
        let mut conn = self.pool.acquire().await?;

        let driver = fetch_driver(&mut conn, &user.id).await?;

        if !driver.has_active_subscription() {
            return Err(Error::bad_request(
                "Active subscription required to accept trips",
            ));
        }

        let vehicle = first_approved_vehicle(&mut conn, &driver.id)
            .await?
            .ok_or_else(|| Error::bad_request("An approved vehicle is required to accept trips"))?;

        let mut tx = conn.begin().await?;

        let mut trip = fetch_trip_for_update(&mut tx, &id).await?;

        if !trip.is_pending() {
            return Err(Error::bad_request("Trip is no longer available"));
        }

        let fare = trip.estimated_fare;
        trip.assign_driver(driver.id, vehicle.id, fare)?;

        // assignment is the only thing that settles bids, so a direct
        // acceptance rejects whatever is still on the board
        reject_pending_bids(&mut tx, &trip.id, None).await?;
        update_trip(&mut tx, &trip).await?;

        tx.commit().await?;

        self.broadcast_trip_status(&trip, json!({ "driver_id": driver.id })).await;
        self.notify_user(
            trip.rider_id,
            "rider",
            json!({
                "event": "trip:driver_assigned",
                "trip_id": trip.id,
                "final_fare": trip.final_fare,
            }),
        )
        .await;

        Ok(trip)
    }

    #[tracing::instrument(skip(self))]
    async fn update_trip_status(
        &self,
        user: User,
        id: Uuid,
        params: UpdateTripStatusParams,
    ) -> Result<Trip, Error> {
        let desired =
            Status::parse(&params.status).ok_or_else(|| Error::bad_request("Invalid status"))?;

        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin().await?;

        let mut trip = fetch_trip_for_update(&mut tx, &id).await?;

        match desired {
            Status::DriverArrived => {
                self.authorize(user.clone(), "progress", trip.clone())?;
                trip.arrive()?;
            }
            Status::InProgress => {
                self.authorize(user.clone(), "progress", trip.clone())?;
                trip.start()?;
            }
            Status::Completed => {
                self.authorize(user.clone(), "progress", trip.clone())?;
                trip.complete()?;

                if let Some(driver_id) = trip.driver_id {
                    let mut driver = fetch_driver_for_update(&mut tx, &driver_id).await?;
                    driver.record_completed_trip();
                    update_driver(&mut tx, &driver).await?;
                }
            }
            Status::Cancelled => {
                self.authorize(user.clone(), "cancel", trip.clone())?;

                let cancelled_by = if user.id == trip.rider_id {
                    CancelledBy::Rider
                } else if trip.driver_id == Some(user.id) {
                    CancelledBy::Driver
                } else {
                    CancelledBy::System
                };

                trip.cancel(params.reason.clone(), cancelled_by)?;
            }
            _ => return Err(Error::bad_request("Invalid status")),
        }

        update_trip(&mut tx, &trip).await?;

        tx.commit().await?;

        // the transition is durable from here; notification is best-effort
        self.broadcast_trip_status(&trip, json!({ "trip_id": trip.id })).await;

        match trip.status {
            Status::Completed => {
                self.notify_user(
                    trip.rider_id,
                    "rider",
                    json!({
                        "event": "trip:completed",
                        "trip_id": trip.id,
                        "action": "rate_driver",
                    }),
                )
                .await;
            }
            Status::Cancelled => {
                let payload = json!({
                    "event": "trip:cancelled",
                    "trip_id": trip.id,
                    "reason": trip.cancellation_reason,
                });

                match trip.cancelled_by {
                    Some(CancelledBy::Rider) => {
                        if let Some(driver_id) = trip.driver_id {
                            self.notify_user(driver_id, "driver", payload).await;
                        }
                    }
                    _ => self.notify_user(trip.rider_id, "rider", payload).await,
                }
            }
            _ => {}
        }

        Ok(trip)
    }

    #[tracing::instrument(skip(self))]
    async fn rider_trips(&self, user: User, status: Option<Status>) -> Result<Vec<Trip>, Error> {
        let mut conn = self.pool.acquire().await?;

        fetch_rider(&mut conn, &user.id).await?;

        list_trips(&mut conn, "rider_id", &user.id, status).await
    }

    #[tracing::instrument(skip(self))]
    async fn driver_trips(&self, user: User, status: Option<Status>) -> Result<Vec<Trip>, Error> {
        let mut conn = self.pool.acquire().await?;

        fetch_driver(&mut conn, &user.id).await?;

        list_trips(&mut conn, "driver_id", &user.id, status).await
    }
}

#[tracing::instrument(skip(conn))]
async fn list_trips(
    conn: &mut PgConnection,
    column: &str,
    id: &Uuid,
    status: Option<Status>,
) -> Result<Vec<Trip>, Error> {
    let query = format!(
        "SELECT data FROM trips WHERE {} = $1 AND ($2::varchar IS NULL OR status = $2) ORDER BY created_at DESC LIMIT $3",
        column
    );

    let rows = conn
        .fetch_all(
            sqlx::query(&query)
                .bind(id)
                .bind(status.map(|s| s.as_str()))
                .bind(PAGE_SIZE),
        )
        .await?;

    let mut trips = Vec::with_capacity(rows.len());

    for row in rows.iter() {
        let Json(trip): Json<Trip> = row.try_get("data")?;
        trips.push(trip);
    }

    Ok(trips)
}
