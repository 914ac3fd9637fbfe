use sqlx::{postgres::PgPoolOptions, Pool, Postgres};
use std::env;

use crate::error::Error;

pub struct PgPool(pub Pool<Postgres>);

impl PgPool {
    pub async fn new(db_uri: &str, max_connections: u32) -> Result<Self, Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(db_uri)
            .await?;

        Ok(Self(pool))
    }

    /// Pool configured from the environment (`DATABASE_URL`), loading a
    /// `.env` file if one is present.
    pub async fn from_env() -> Result<Self, Error> {
        dotenv::dotenv().ok();

        let db_uri = env::var("DATABASE_URL")?;

        Self::new(&db_uri, 5).await
    }
}
