mod bid_api;
mod helpers;
mod profile_api;
mod search_api;
mod trip_api;

use std::sync::Arc;

use oso::Oso;
use serde_json::Value;
use sqlx::{Executor, Pool, Postgres};
use uuid::Uuid;

use crate::{
    api::{Notifier, API},
    auth::authorizor,
    entities::Trip,
    error::Error,
};

type Database = Postgres;

/// The marketplace engine: trip lifecycle, bid matching and nearby-trip
/// discovery over a shared transactional store. Stateless between calls —
/// every operation is an independent unit of work against the pool.
pub struct Engine {
    pool: Pool<Database>,
    authorizor: Oso,
    notifier: Option<Arc<dyn Notifier>>,
}

impl Engine {
    #[tracing::instrument(name = "Engine::new", skip_all)]
    pub async fn new(pool: Pool<Database>) -> Result<Self, Error> {
        // TODO: move schema bootstrap to sqlx migrations

        pool.execute("CREATE TABLE IF NOT EXISTS riders (id UUID PRIMARY KEY, data JSONB NOT NULL)")
            .await?;

        pool.execute("CREATE TABLE IF NOT EXISTS drivers (id UUID PRIMARY KEY, data JSONB NOT NULL)")
            .await?;

        pool.execute("CREATE TABLE IF NOT EXISTS vehicles (id UUID PRIMARY KEY, driver_id UUID NOT NULL REFERENCES drivers(id), status VARCHAR NOT NULL, created_at TIMESTAMPTZ NOT NULL, data JSONB NOT NULL)")
            .await?;

        pool.execute("CREATE TABLE IF NOT EXISTS driver_locations (driver_id UUID PRIMARY KEY REFERENCES drivers(id), latitude DOUBLE PRECISION NOT NULL, longitude DOUBLE PRECISION NOT NULL, expiry TIMESTAMPTZ NOT NULL)")
            .await?;

        pool.execute("CREATE TABLE IF NOT EXISTS trips (id UUID PRIMARY KEY, status VARCHAR NOT NULL, rider_id UUID NOT NULL, driver_id UUID, created_at TIMESTAMPTZ NOT NULL, data JSONB NOT NULL)")
            .await?;

        // the UNIQUE (trip_id, driver_id) constraint is what closes the
        // duplicate-bid race between concurrent submissions
        pool.execute("CREATE TABLE IF NOT EXISTS bids (id UUID PRIMARY KEY, trip_id UUID NOT NULL REFERENCES trips(id), driver_id UUID NOT NULL REFERENCES drivers(id), status VARCHAR NOT NULL, amount DOUBLE PRECISION NOT NULL, created_at TIMESTAMPTZ NOT NULL, data JSONB NOT NULL, CONSTRAINT bids_trip_driver_key UNIQUE (trip_id, driver_id))")
            .await?;

        Ok(Self {
            pool,
            authorizor: authorizor::new(),
            notifier: None,
        })
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }
}

impl Engine {
    pub fn authorize<Actor, Action, Resource>(
        &self,
        actor: Actor,
        action: Action,
        resource: Resource,
    ) -> Result<(), Error>
    where
        Actor: oso::ToPolar,
        Action: oso::ToPolar,
        Resource: oso::ToPolar,
    {
        if self.authorizor.is_allowed(actor, action, resource)? {
            return Ok(());
        }

        Err(Error::forbidden())
    }
}

// Notification dispatch is fire-and-forget: the state change has already
// committed by the time these run, so a delivery failure is logged and
// swallowed, never surfaced to the caller.
impl Engine {
    pub(crate) async fn broadcast_to_drivers(&self, event: &str, payload: Value) {
        if let Some(notifier) = &self.notifier {
            if let Err(err) = notifier.broadcast_to_drivers(event, payload).await {
                tracing::warn!(%err, event, "driver broadcast failed");
            }
        }
    }

    pub(crate) async fn broadcast_trip_status(&self, trip: &Trip, payload: Value) {
        if let Some(notifier) = &self.notifier {
            if let Err(err) = notifier
                .broadcast_trip_status(trip.id, trip.status.as_str(), payload)
                .await
            {
                tracing::warn!(%err, trip_id = %trip.id, "trip status broadcast failed");
            }
        }
    }

    pub(crate) async fn notify_user(&self, user_id: Uuid, role: &str, payload: Value) {
        if let Some(notifier) = &self.notifier {
            if let Err(err) = notifier.notify_user(user_id, role, payload).await {
                tracing::warn!(%err, %user_id, role, "user notification failed");
            }
        }
    }
}

impl API for Engine {}

#[test]
#[ignore = "requires a postgres instance at DATABASE_URL"]
fn new_engine() {
    use crate::db::PgPool;
    use tokio_test::block_on;

    let PgPool(pool) = block_on(PgPool::from_env()).unwrap();

    block_on(Engine::new(pool)).unwrap();
}
