// src/cursor/postgres.rs
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

use super::CursorBackend;
use crate::error::CursorError;

const CURSOR_KEY: &str = "last_id";

/// Cursor mirrored into a tiny key-value table, for hosts whose disk does
/// not survive a redeploy.
pub struct PgCursor {
    pool: PgPool,
}

impl PgCursor {
    pub async fn connect(database_url: &str) -> Result<Self, CursorError> {
        let pool = PgPoolOptions::new()
            .max_connections(2)
            .acquire_timeout(Duration::from_secs(10))
            .connect(database_url)
            .await?;

        sqlx::query("CREATE TABLE IF NOT EXISTS bot_kv (key TEXT PRIMARY KEY, value TEXT)")
            .execute(&pool)
            .await?;

        tracing::info!("connected to Postgres for cursor storage");
        Ok(Self { pool })
    }
}

#[async_trait]
impl CursorBackend for PgCursor {
    async fn load(&self) -> Result<Option<String>, CursorError> {
        let row: Option<(Option<String>,)> =
            sqlx::query_as("SELECT value FROM bot_kv WHERE key = $1")
                .bind(CURSOR_KEY)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.and_then(|(v,)| v))
    }

    async fn save(&self, id: &str) -> Result<(), CursorError> {
        sqlx::query(
            "INSERT INTO bot_kv (key, value) VALUES ($1, $2) \
             ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value",
        )
        .bind(CURSOR_KEY)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "postgres"
    }
}
