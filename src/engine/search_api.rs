use super::helpers::{driver_coordinates, fetch_driver};
use super::Engine;

use async_trait::async_trait;
use futures::TryStreamExt;
use sqlx::{types::Json, Executor, Row};
use std::collections::HashSet;
use uuid::Uuid;

use crate::{
    api::{NearbyTrip, SearchAPI},
    auth::User,
    entities::Trip,
    error::Error,
    geo,
};

const DEFAULT_SEARCH_RADIUS_KM: f64 = 10.0;

#[async_trait]
impl SearchAPI for Engine {
    /// Pending trips within reach of a prospecting driver, closest first.
    /// Distance is driver-to-pickup deadhead, computed against the driver's
    /// last reported coordinates.
    #[tracing::instrument(skip(self))]
    async fn nearby_trips(
        &self,
        user: User,
        radius_km: Option<f64>,
    ) -> Result<Vec<NearbyTrip>, Error> {
        let radius_km = radius_km.unwrap_or(DEFAULT_SEARCH_RADIUS_KM);

        let mut conn = self.pool.acquire().await?;

        let driver = fetch_driver(&mut conn, &user.id).await?;

        if !driver.has_active_subscription() {
            return Err(Error::bad_request(
                "Active subscription required to view nearby trips",
            ));
        }

        let origin = driver_coordinates(&mut conn, &driver.id)
            .await?
            .ok_or_else(|| Error::bad_request("Driver location unknown"))?;

        // trips this driver already has a bid on, for the has_bid flag
        let bid_rows = conn
            .fetch_all(sqlx::query("SELECT trip_id FROM bids WHERE driver_id = $1").bind(&driver.id))
            .await?;

        let mut bid_trip_ids = HashSet::with_capacity(bid_rows.len());

        for row in bid_rows.iter() {
            bid_trip_ids.insert(row.try_get::<Uuid, _>("trip_id")?);
        }

        let mut results = conn.fetch(sqlx::query("SELECT data FROM trips WHERE status = 'pending'"));

        let mut nearby = vec![];

        while let Some(row) = results.try_next().await? {
            let Json(trip): Json<Trip> = row.try_get("data")?;

            let distance = geo::distance_km(&origin, &trip.origin.coordinates);

            if distance > radius_km {
                continue;
            }

            let has_bid = bid_trip_ids.contains(&trip.id);

            nearby.push(NearbyTrip::new(trip, distance, has_bid));
        }

        nearby.sort_by(|a, b| {
            a.distance_from_driver_km
                .total_cmp(&b.distance_from_driver_km)
        });

        Ok(nearby)
    }
}
