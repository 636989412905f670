use std::str::FromStr;

use anyhow::Context;
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    PgPool,
};
use tracing::{info, warn};

use crate::config::AppConfig;

pub async fn connect(config: &AppConfig) -> anyhow::Result<PgPool> {
    let mut options =
        PgConnectOptions::from_str(&config.database_url).context("parse DB_URL")?;
    if let Some(name) = &config.database_name {
        options = options.database(name);
    }

    let db = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(config.db_timeout)
        .connect_with(options)
        .await
        .context("connect to database")?;
    info!("connected to database");
    Ok(db)
}

/// Creates the users table if missing and tries to add the unique e-mail index.
///
/// A failed index creation is logged and startup continues.
pub async fn ensure_schema(db: &PgPool) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id            UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            first_name    TEXT NOT NULL DEFAULT '',
            last_name     TEXT NOT NULL DEFAULT '',
            email         TEXT NOT NULL,
            phone         TEXT NOT NULL DEFAULT '',
            role          TEXT NOT NULL DEFAULT '',
            password_hash TEXT NOT NULL,
            is_blocked    BOOLEAN NOT NULL DEFAULT FALSE,
            created_at    TIMESTAMPTZ NOT NULL DEFAULT now()
        )
        "#,
    )
    .execute(db)
    .await
    .context("create users table")?;

    if let Err(e) = sqlx::query("CREATE UNIQUE INDEX IF NOT EXISTS users_email_key ON users (email)")
        .execute(db)
        .await
    {
        warn!(error = %e, "creating unique email index failed; continuing");
    }
    Ok(())
}
