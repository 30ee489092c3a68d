use anyhow::Context;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;
use tracing::info;

/// Opens a connection pool to the task database
pub async fn connect_sqlx(db_url: &str) -> Result<PgPool, anyhow::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .acquire_timeout(Duration::from_secs(2))
        .connect(db_url)
        .await
        .context("connecting to the task database")
}

/// Brings the schema up to date with the migrations in `./migrations`
pub async fn run_migrations(pool: &PgPool) -> Result<(), anyhow::Error> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("running database migrations")?;
    info!("Database schema is up to date");

    Ok(())
}
