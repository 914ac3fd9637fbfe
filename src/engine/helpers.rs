use sqlx::{types::Json, Executor, PgConnection, Row};
use uuid::Uuid;

use crate::{
    api::{BidDetail, TripDetail},
    entities::{Bid, Coordinates, Driver, Rider, Trip, Vehicle},
    error::Error,
};

#[tracing::instrument(skip(conn))]
pub async fn fetch_trip(conn: &mut PgConnection, id: &Uuid) -> Result<Trip, Error> {
    let Json(trip): Json<Trip> = conn
        .fetch_optional(sqlx::query("SELECT data FROM trips WHERE id = $1").bind(id))
        .await?
        .ok_or_else(|| Error::not_found("Trip not found"))?
        .try_get("data")?;

    Ok(trip)
}

#[tracing::instrument(skip(conn))]
pub async fn fetch_trip_for_update(conn: &mut PgConnection, id: &Uuid) -> Result<Trip, Error> {
    let Json(trip): Json<Trip> = conn
        .fetch_optional(sqlx::query("SELECT data FROM trips WHERE id = $1 FOR UPDATE").bind(id))
        .await?
        .ok_or_else(|| Error::not_found("Trip not found"))?
        .try_get("data")?;

    Ok(trip)
}

#[tracing::instrument(skip(conn))]
pub async fn fetch_bid_for_update(conn: &mut PgConnection, id: &Uuid) -> Result<Bid, Error> {
    let Json(bid): Json<Bid> = conn
        .fetch_optional(sqlx::query("SELECT data FROM bids WHERE id = $1 FOR UPDATE").bind(id))
        .await?
        .ok_or_else(|| Error::not_found("Bid not found"))?
        .try_get("data")?;

    Ok(bid)
}

#[tracing::instrument(skip(conn))]
pub async fn fetch_rider(conn: &mut PgConnection, id: &Uuid) -> Result<Rider, Error> {
    let Json(rider): Json<Rider> = conn
        .fetch_optional(sqlx::query("SELECT data FROM riders WHERE id = $1").bind(id))
        .await?
        .ok_or_else(|| Error::not_found("Rider profile not found"))?
        .try_get("data")?;

    Ok(rider)
}

#[tracing::instrument(skip(conn))]
pub async fn fetch_driver(conn: &mut PgConnection, id: &Uuid) -> Result<Driver, Error> {
    let Json(driver): Json<Driver> = conn
        .fetch_optional(sqlx::query("SELECT data FROM drivers WHERE id = $1").bind(id))
        .await?
        .ok_or_else(|| Error::not_found("Driver profile not found"))?
        .try_get("data")?;

    Ok(driver)
}

#[tracing::instrument(skip(conn))]
pub async fn fetch_driver_for_update(conn: &mut PgConnection, id: &Uuid) -> Result<Driver, Error> {
    let Json(driver): Json<Driver> = conn
        .fetch_optional(sqlx::query("SELECT data FROM drivers WHERE id = $1 FOR UPDATE").bind(id))
        .await?
        .ok_or_else(|| Error::not_found("Driver profile not found"))?
        .try_get("data")?;

    Ok(driver)
}

#[tracing::instrument(skip(conn))]
pub async fn fetch_vehicle(conn: &mut PgConnection, id: &Uuid) -> Result<Vehicle, Error> {
    let Json(vehicle): Json<Vehicle> = conn
        .fetch_optional(sqlx::query("SELECT data FROM vehicles WHERE id = $1").bind(id))
        .await?
        .ok_or_else(|| Error::not_found("Vehicle not found"))?
        .try_get("data")?;

    Ok(vehicle)
}

#[tracing::instrument(skip(conn))]
pub async fn fetch_vehicle_for_update(conn: &mut PgConnection, id: &Uuid) -> Result<Vehicle, Error> {
    let Json(vehicle): Json<Vehicle> = conn
        .fetch_optional(sqlx::query("SELECT data FROM vehicles WHERE id = $1 FOR UPDATE").bind(id))
        .await?
        .ok_or_else(|| Error::not_found("Vehicle not found"))?
        .try_get("data")?;

    Ok(vehicle)
}

/// The driver's oldest approved vehicle, if any — the one used when the
/// driver wins a trip.
#[tracing::instrument(skip(conn))]
pub async fn first_approved_vehicle(
    conn: &mut PgConnection,
    driver_id: &Uuid,
) -> Result<Option<Vehicle>, Error> {
    let maybe_result = conn
        .fetch_optional(
            sqlx::query("SELECT data FROM vehicles WHERE driver_id = $1 AND status = 'approved' ORDER BY created_at ASC LIMIT 1")
                .bind(driver_id),
        )
        .await?;

    match maybe_result {
        Some(result) => {
            let Json(vehicle): Json<Vehicle> = result.try_get("data")?;
            Ok(Some(vehicle))
        }
        None => Ok(None),
    }
}

/// The driver's last reported coordinates, unless the report has expired.
#[tracing::instrument(skip(conn))]
pub async fn driver_coordinates(
    conn: &mut PgConnection,
    driver_id: &Uuid,
) -> Result<Option<Coordinates>, Error> {
    let maybe_result = conn
        .fetch_optional(
            sqlx::query("SELECT latitude, longitude FROM driver_locations WHERE driver_id = $1 AND expiry > now()")
                .bind(driver_id),
        )
        .await?;

    match maybe_result {
        Some(result) => Ok(Some(Coordinates {
            latitude: result.try_get("latitude")?,
            longitude: result.try_get("longitude")?,
        })),
        None => Ok(None),
    }
}

#[tracing::instrument(skip(conn))]
pub async fn driver_has_bid(
    conn: &mut PgConnection,
    trip_id: &Uuid,
    driver_id: &Uuid,
) -> Result<bool, Error> {
    let maybe_result = conn
        .fetch_optional(
            sqlx::query("SELECT id FROM bids WHERE trip_id = $1 AND driver_id = $2")
                .bind(trip_id)
                .bind(driver_id),
        )
        .await?;

    Ok(maybe_result.is_some())
}

#[tracing::instrument(skip(conn))]
pub async fn update_trip(conn: &mut PgConnection, trip: &Trip) -> Result<(), Error> {
    conn.execute(
        sqlx::query("UPDATE trips SET status = $2, driver_id = $3, data = $4 WHERE id = $1")
            .bind(&trip.id)
            .bind(trip.status.as_str())
            .bind(&trip.driver_id)
            .bind(Json(trip)),
    )
    .await?;

    Ok(())
}

#[tracing::instrument(skip(conn))]
pub async fn update_driver(conn: &mut PgConnection, driver: &Driver) -> Result<(), Error> {
    conn.execute(
        sqlx::query("UPDATE drivers SET data = $2 WHERE id = $1")
            .bind(&driver.id)
            .bind(Json(driver)),
    )
    .await?;

    Ok(())
}

#[tracing::instrument(skip(conn))]
pub async fn update_vehicle(conn: &mut PgConnection, vehicle: &Vehicle) -> Result<(), Error> {
    conn.execute(
        sqlx::query("UPDATE vehicles SET status = $2, data = $3 WHERE id = $1")
            .bind(&vehicle.id)
            .bind(vehicle.status.as_str())
            .bind(Json(vehicle)),
    )
    .await?;

    Ok(())
}

#[tracing::instrument(skip(conn))]
pub async fn update_bid(conn: &mut PgConnection, bid: &Bid) -> Result<(), Error> {
    conn.execute(
        sqlx::query("UPDATE bids SET status = $2, data = $3 WHERE id = $1")
            .bind(&bid.id)
            .bind(bid.status.as_str())
            .bind(Json(bid)),
    )
    .await?;

    Ok(())
}

/// Reject every pending bid on a trip, skipping the winner when there is
/// one. Must run inside the transaction that assigns the trip.
#[tracing::instrument(skip(conn))]
pub async fn reject_pending_bids(
    conn: &mut PgConnection,
    trip_id: &Uuid,
    winner: Option<&Uuid>,
) -> Result<(), Error> {
    let rows = conn
        .fetch_all(
            sqlx::query("SELECT data FROM bids WHERE trip_id = $1 AND status = 'pending' FOR UPDATE")
                .bind(trip_id),
        )
        .await?;

    for row in rows.iter() {
        let Json(mut bid): Json<Bid> = row.try_get("data")?;

        if winner.map_or(false, |id| *id == bid.id) {
            continue;
        }

        bid.reject();
        update_bid(conn, &bid).await?;
    }

    Ok(())
}

/// All bids on a trip, lowest amount first, each annotated with its driver
/// and the driver's first approved vehicle.
#[tracing::instrument(skip(conn))]
pub async fn load_bid_details(
    conn: &mut PgConnection,
    trip_id: &Uuid,
) -> Result<Vec<BidDetail>, Error> {
    let rows = conn
        .fetch_all(
            sqlx::query("SELECT data FROM bids WHERE trip_id = $1 ORDER BY amount ASC, created_at ASC")
                .bind(trip_id),
        )
        .await?;

    let mut details = Vec::with_capacity(rows.len());

    for row in rows.iter() {
        let Json(bid): Json<Bid> = row.try_get("data")?;

        let driver = fetch_driver(conn, &bid.driver_id).await?;
        let vehicle = first_approved_vehicle(conn, &bid.driver_id).await?;

        details.push(BidDetail {
            bid,
            driver,
            vehicle,
        });
    }

    Ok(details)
}

#[tracing::instrument(skip(conn, trip))]
pub async fn load_trip_detail(conn: &mut PgConnection, trip: Trip) -> Result<TripDetail, Error> {
    let rider = fetch_rider(conn, &trip.rider_id).await?;

    let driver = match &trip.driver_id {
        Some(id) => Some(fetch_driver(conn, id).await?),
        None => None,
    };

    let vehicle = match &trip.vehicle_id {
        Some(id) => Some(fetch_vehicle(conn, id).await?),
        None => None,
    };

    let bids = load_bid_details(conn, &trip.id).await?;

    Ok(TripDetail {
        trip,
        rider,
        driver,
        vehicle,
        bids,
    })
}

pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(err) => err.code().as_deref() == Some("23505"),
        _ => false,
    }
}
