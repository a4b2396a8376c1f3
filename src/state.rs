use std::sync::Arc;

use anyhow::Context;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};

use crate::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        let db = SqlitePoolOptions::new()
            .max_connections(10)
            .connect(&config.database_url)
            .await
            .context("connect to database")?;
        Ok(Self { db, config })
    }

    pub fn from_parts(db: SqlitePool, config: Arc<AppConfig>) -> Self {
        Self { db, config }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::config::AuthConfig;

    /// Fresh state over a private in-memory database with the schema applied.
    pub async fn state() -> AppState {
        // A single connection keeps every query on the same in-memory database.
        let db = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory pool");
        sqlx::migrate!("./migrations")
            .run(&db)
            .await
            .expect("run migrations");
        let config = Arc::new(AppConfig {
            database_url: "sqlite::memory:".into(),
            auth: AuthConfig {
                secret: "test-secret".into(),
                token_ttl_minutes: 30,
            },
        });
        AppState::from_parts(db, config)
    }
}
