use super::helpers::{
    fetch_bid_for_update, fetch_driver, fetch_rider, fetch_trip, fetch_trip_for_update,
    first_approved_vehicle, is_unique_violation, load_bid_details, load_trip_detail,
    reject_pending_bids, update_bid, update_trip,
};
use super::Engine;

use async_trait::async_trait;
use serde_json::json;
use sqlx::{types::Json, Acquire, Executor, Row};
use uuid::Uuid;

use crate::{
    api::{BidAPI, BidDetail, CreateBidParams, DriverBid, TripDetail},
    auth::User,
    entities::{Bid, BidStatus},
    error::Error,
};

const PAGE_SIZE: i64 = 20;

#[async_trait]
impl BidAPI for Engine {
    #[tracing::instrument(skip(self))]
    async fn create_bid(&self, user: User, params: CreateBidParams) -> Result<BidDetail, Error> {
        if params.amount <= 0.0 {
            return Err(Error::bad_request("Bid amount must be positive"));
        }

        if let Some(eta) = params.eta_minutes {
            if eta <= 0 {
                return Err(Error::bad_request("Estimated arrival time must be positive"));
            }
        }

        let mut conn = self.pool.acquire().await?;

        let driver = fetch_driver(&mut conn, &user.id).await?;

        if !driver.has_active_subscription() {
            return Err(Error::bad_request(
                "Active subscription required to place bids",
            ));
        }

        let vehicle = first_approved_vehicle(&mut conn, &driver.id)
            .await?
            .ok_or_else(|| Error::bad_request("An approved vehicle is required to place bids"))?;

        // weak status check; acceptance re-validates under the trip row lock
        let trip = fetch_trip(&mut conn, &params.trip_id).await?;

        if !trip.is_pending() {
            return Err(Error::bad_request("Trip is no longer accepting bids"));
        }

        let bid = Bid::new(
            trip.id,
            driver.id,
            params.amount,
            params.message,
            params.eta_minutes,
        );

        let result = conn
            .execute(
                sqlx::query("INSERT INTO bids (id, trip_id, driver_id, status, amount, created_at, data) VALUES ($1, $2, $3, $4, $5, $6, $7)")
                    .bind(&bid.id)
                    .bind(&bid.trip_id)
                    .bind(&bid.driver_id)
                    .bind(bid.status.as_str())
                    .bind(bid.amount)
                    .bind(&bid.created_at)
                    .bind(Json(&bid)),
            )
            .await;

        if let Err(err) = result {
            if is_unique_violation(&err) {
                return Err(Error::bad_request(
                    "You have already placed a bid on this trip",
                ));
            }

            return Err(err.into());
        }

        self.notify_user(
            trip.rider_id,
            "rider",
            json!({
                "event": "bid:new",
                "trip_id": trip.id,
                "bid_id": bid.id,
                "amount": bid.amount,
            }),
        )
        .await;

        Ok(BidDetail {
            bid,
            driver,
            vehicle: Some(vehicle),
        })
    }

    #[tracing::instrument(skip(self))]
    async fn find_trip_bids(&self, user: User, trip_id: Uuid) -> Result<Vec<BidDetail>, Error> {
        let mut conn = self.pool.acquire().await?;

        let trip = fetch_trip(&mut conn, &trip_id).await?;

        self.authorize(user.clone(), "list_bids", trip.clone())?;

        load_bid_details(&mut conn, &trip.id).await
    }

    /// Winner selection. The whole read-validate-write sequence runs inside
    /// one transaction with the trip row locked, so of two concurrent
    /// acceptances on the same trip exactly one commits; the other fails the
    /// pending re-validation. Rejecting the losing bids is part of the same
    /// transaction — a trip is never assigned while losers stay pending.
    #[tracing::instrument(skip(self))]
    async fn accept_bid(&self, user: User, id: Uuid) -> Result<TripDetail, Error> {
        let mut conn = self.pool.acquire().await?;

        fetch_rider(&mut conn, &user.id).await.map_err(|err| {
            if err.is_not_found() {
                Error::bad_request("Rider profile not found")
            } else {
                err
            }
        })?;

        let mut tx = conn.begin().await?;

        // resolve the parent trip before locking; the bid itself is re-read
        // under the trip lock
        let Json(bid): Json<Bid> = tx
            .fetch_optional(sqlx::query("SELECT data FROM bids WHERE id = $1").bind(&id))
            .await?
            .ok_or_else(|| Error::not_found("Bid not found"))?
            .try_get("data")?;

        let mut trip = fetch_trip_for_update(&mut tx, &bid.trip_id).await?;

        self.authorize(user.clone(), "accept_bid", trip.clone())?;

        if !trip.is_pending() {
            return Err(Error::bad_request("Trip is no longer accepting bids"));
        }

        let mut bid = fetch_bid_for_update(&mut tx, &id).await?;

        if !bid.is_pending() {
            return Err(Error::bad_request("Bid is no longer available"));
        }

        let vehicle = first_approved_vehicle(&mut tx, &bid.driver_id)
            .await?
            .ok_or_else(|| Error::bad_request("Driver no longer has an approved vehicle"))?;

        trip.assign_driver(bid.driver_id, vehicle.id, bid.amount)?;
        bid.accept()?;

        update_trip(&mut tx, &trip).await?;
        update_bid(&mut tx, &bid).await?;
        reject_pending_bids(&mut tx, &trip.id, Some(&bid.id)).await?;

        tx.commit().await?;

        self.broadcast_trip_status(
            &trip,
            json!({ "driver_id": bid.driver_id, "final_fare": trip.final_fare }),
        )
        .await;
        self.notify_user(
            bid.driver_id,
            "driver",
            json!({
                "event": "bid:accepted",
                "trip_id": trip.id,
                "bid_id": bid.id,
            }),
        )
        .await;

        load_trip_detail(&mut conn, trip).await
    }

    #[tracing::instrument(skip(self))]
    async fn driver_bids(
        &self,
        user: User,
        status: Option<BidStatus>,
    ) -> Result<Vec<DriverBid>, Error> {
        let mut conn = self.pool.acquire().await?;

        fetch_driver(&mut conn, &user.id).await?;

        let rows = conn
            .fetch_all(
                sqlx::query("SELECT data FROM bids WHERE driver_id = $1 AND ($2::varchar IS NULL OR status = $2) ORDER BY created_at DESC LIMIT $3")
                    .bind(&user.id)
                    .bind(status.map(|s| s.as_str()))
                    .bind(PAGE_SIZE),
            )
            .await?;

        let mut bids = Vec::with_capacity(rows.len());

        for row in rows.iter() {
            let Json(bid): Json<Bid> = row.try_get("data")?;

            let trip = fetch_trip(&mut conn, &bid.trip_id).await?;
            let rider = fetch_rider(&mut conn, &trip.rider_id).await?;

            bids.push(DriverBid { bid, trip, rider });
        }

        Ok(bids)
    }
}
