//! PostgreSQL implementation of PackageReader.

use crate::domain::catalog::Package;
use crate::domain::foundation::{Money, PackageId, Timestamp};
use crate::domain::transaction::EngineError;
use crate::ports::PackageReader;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

/// PostgreSQL implementation of the PackageReader port.
pub struct PostgresPackageReader {
    pool: PgPool,
}

impl PostgresPackageReader {
    /// Creates a new reader with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a package.
#[derive(Debug, sqlx::FromRow)]
struct PackageRow {
    id: Uuid,
    name: String,
    description: String,
    price: i64,
    duration_days: i32,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<PackageRow> for Package {
    type Error = EngineError;

    fn try_from(row: PackageRow) -> Result<Self, Self::Error> {
        let duration_days = u32::try_from(row.duration_days)
            .map_err(|_| EngineError::infrastructure("invalid duration_days"))?;

        Ok(Package {
            id: PackageId::from_uuid(row.id),
            name: row.name,
            description: row.description,
            price: Money::new(row.price)
                .map_err(|e| EngineError::infrastructure(format!("invalid price: {}", e)))?,
            duration_days,
            is_active: row.is_active,
            created_at: Timestamp::from_datetime(row.created_at),
        })
    }
}

#[async_trait]
impl PackageReader for PostgresPackageReader {
    async fn find_by_id(&self, id: &PackageId) -> Result<Option<Package>, EngineError> {
        let row: Option<PackageRow> = sqlx::query_as(
            r#"
            SELECT id, name, description, price, duration_days, is_active, created_at
            FROM packages
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| EngineError::infrastructure(format!("failed to find package: {}", e)))?;

        row.map(Package::try_from).transpose()
    }

    async fn list_active(&self) -> Result<Vec<Package>, EngineError> {
        let rows: Vec<PackageRow> = sqlx::query_as(
            r#"
            SELECT id, name, description, price, duration_days, is_active, created_at
            FROM packages
            WHERE is_active = true
            ORDER BY price ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| EngineError::infrastructure(format!("failed to list packages: {}", e)))?;

        rows.into_iter().map(Package::try_from).collect()
    }
}
