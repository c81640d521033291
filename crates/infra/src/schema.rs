//! Database schema bootstrap.

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use crate::store::StoreError;
use crate::store::postgres::map_sqlx_error;

/// DDL for every table the ledger reads or writes.
pub const SCHEMA_SQL: &str = include_str!("schema.sql");

/// Apply [`SCHEMA_SQL`]. Safe to run on every start.
pub async fn migrate(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::raw_sql(SCHEMA_SQL)
        .execute(pool)
        .await
        .map_err(|e| map_sqlx_error("migrate", e))?;
    info!("material store schema is up to date");
    Ok(())
}

/// Open a pool and bring the schema up to date.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<PgPool, StoreError> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
        .map_err(|e| map_sqlx_error("connect", e))?;
    migrate(&pool).await?;
    Ok(pool)
}
