//! PostgreSQL adapters for the persistence ports.

mod access_repository;
mod package_reader;
mod transaction_repository;

pub use access_repository::PostgresAccessRepository;
pub use package_reader::PostgresPackageReader;
pub use transaction_repository::PostgresTransactionRepository;

use crate::config::DatabaseConfig;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Builds a connection pool from the database configuration.
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .min_connections(config.min_connections)
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout())
        .idle_timeout(config.idle_timeout())
        .max_lifetime(config.max_lifetime())
        .connect(&config.url)
        .await
}
