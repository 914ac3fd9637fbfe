use super::helpers::{
    fetch_driver, fetch_driver_for_update, fetch_vehicle_for_update, update_driver, update_vehicle,
};
use super::Engine;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use sqlx::{types::Json, Acquire, Executor};
use uuid::Uuid;

use crate::{
    api::{ProfileAPI, RegisterVehicleParams},
    auth::User,
    entities::{Coordinates, Driver, FeeStatus, Rider, Vehicle},
    error::Error,
};

#[async_trait]
impl ProfileAPI for Engine {
    #[tracing::instrument(skip(self))]
    async fn create_rider(&self, user: User, name: String) -> Result<Rider, Error> {
        let rider = Rider::new(user.id, name);

        let mut conn = self.pool.acquire().await?;

        conn.execute(
            sqlx::query("INSERT INTO riders (id, data) VALUES ($1, $2)")
                .bind(&rider.id)
                .bind(Json(&rider)),
        )
        .await?;

        Ok(rider)
    }

    #[tracing::instrument(skip(self))]
    async fn create_driver(&self, user: User, name: String) -> Result<Driver, Error> {
        let driver = Driver::new(user.id, name);

        let mut conn = self.pool.acquire().await?;

        conn.execute(
            sqlx::query("INSERT INTO drivers (id, data) VALUES ($1, $2)")
                .bind(&driver.id)
                .bind(Json(&driver)),
        )
        .await?;

        Ok(driver)
    }

    #[tracing::instrument(skip(self))]
    async fn register_vehicle(
        &self,
        user: User,
        params: RegisterVehicleParams,
    ) -> Result<Vehicle, Error> {
        let mut conn = self.pool.acquire().await?;

        let driver = fetch_driver(&mut conn, &user.id).await?;

        let vehicle = Vehicle::new(driver.id, params.make, params.model, params.plate);

        conn.execute(
            sqlx::query("INSERT INTO vehicles (id, driver_id, status, created_at, data) VALUES ($1, $2, $3, $4, $5)")
                .bind(&vehicle.id)
                .bind(&vehicle.driver_id)
                .bind(vehicle.status.as_str())
                .bind(&vehicle.created_at)
                .bind(Json(&vehicle)),
        )
        .await?;

        Ok(vehicle)
    }

    #[tracing::instrument(skip(self))]
    async fn approve_vehicle(&self, user: User, id: Uuid) -> Result<Vehicle, Error> {
        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin().await?;

        let mut vehicle = fetch_vehicle_for_update(&mut tx, &id).await?;
        let driver = fetch_driver(&mut tx, &vehicle.driver_id).await?;

        self.authorize(user.clone(), "approve_vehicle", driver)?;

        vehicle.approve()?;

        update_vehicle(&mut tx, &vehicle).await?;

        tx.commit().await?;

        Ok(vehicle)
    }

    #[tracing::instrument(skip(self))]
    async fn update_fee_status(
        &self,
        user: User,
        driver_id: Uuid,
        fee_status: FeeStatus,
    ) -> Result<Driver, Error> {
        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin().await?;

        let mut driver = fetch_driver_for_update(&mut tx, &driver_id).await?;

        self.authorize(user.clone(), "update_fee_status", driver.clone())?;

        driver.set_fee_status(fee_status);

        update_driver(&mut tx, &driver).await?;

        tx.commit().await?;

        Ok(driver)
    }

    #[tracing::instrument(skip(self))]
    async fn update_driver_location(
        &self,
        user: User,
        coordinates: Coordinates,
    ) -> Result<(), Error> {
        let mut conn = self.pool.acquire().await?;

        let driver = fetch_driver(&mut conn, &user.id).await?;

        self.authorize(user.clone(), "update_location", driver.clone())?;

        let expiry = Utc::now() + Duration::minutes(5);

        conn.execute(
            sqlx::query("INSERT INTO driver_locations (driver_id, latitude, longitude, expiry) VALUES ($1, $2, $3, $4) ON CONFLICT (driver_id) DO UPDATE SET latitude = $2, longitude = $3, expiry = $4")
                .bind(&driver.id)
                .bind(coordinates.latitude)
                .bind(coordinates.longitude)
                .bind(expiry),
        )
        .await?;

        Ok(())
    }
}
