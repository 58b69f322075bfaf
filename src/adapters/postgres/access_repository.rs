//! PostgreSQL implementation of AccessRepository.
//!
//! Grants are keyed on session_key; the upsert relies on the unique
//! constraint so concurrent issuers for the same payment converge on a
//! single row and the original granted_at survives renewals.

use crate::domain::access::UserAccess;
use crate::domain::foundation::{PackageId, SessionKey, Timestamp, TransactionId};
use crate::domain::transaction::EngineError;
use crate::ports::AccessRepository;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

/// PostgreSQL implementation of the AccessRepository port.
pub struct PostgresAccessRepository {
    pool: PgPool,
}

impl PostgresAccessRepository {
    /// Creates a new repository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of an access grant.
#[derive(Debug, sqlx::FromRow)]
struct AccessRow {
    session_key: String,
    package_id: Uuid,
    transaction_id: Uuid,
    granted_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    is_active: bool,
}

impl TryFrom<AccessRow> for UserAccess {
    type Error = EngineError;

    fn try_from(row: AccessRow) -> Result<Self, Self::Error> {
        Ok(UserAccess {
            session_key: SessionKey::new(row.session_key)
                .map_err(|e| EngineError::infrastructure(format!("invalid session_key: {}", e)))?,
            package_id: PackageId::from_uuid(row.package_id),
            transaction_id: TransactionId::from_uuid(row.transaction_id),
            granted_at: Timestamp::from_datetime(row.granted_at),
            expires_at: Timestamp::from_datetime(row.expires_at),
            is_active: row.is_active,
        })
    }
}

#[async_trait]
impl AccessRepository for PostgresAccessRepository {
    async fn upsert(&self, access: &UserAccess) -> Result<UserAccess, EngineError> {
        let row: AccessRow = sqlx::query_as(
            r#"
            INSERT INTO user_access (
                session_key, package_id, transaction_id, granted_at, expires_at, is_active
            ) VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (session_key) DO UPDATE SET
                package_id = EXCLUDED.package_id,
                transaction_id = EXCLUDED.transaction_id,
                expires_at = EXCLUDED.expires_at,
                is_active = EXCLUDED.is_active
            RETURNING session_key, package_id, transaction_id, granted_at, expires_at, is_active
            "#,
        )
        .bind(access.session_key.as_str())
        .bind(access.package_id.as_uuid())
        .bind(access.transaction_id.as_uuid())
        .bind(access.granted_at.as_datetime())
        .bind(access.expires_at.as_datetime())
        .bind(access.is_active)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| EngineError::infrastructure(format!("failed to upsert access: {}", e)))?;

        row.try_into()
    }

    async fn find_by_session(
        &self,
        session_key: &SessionKey,
    ) -> Result<Option<UserAccess>, EngineError> {
        let row: Option<AccessRow> = sqlx::query_as(
            r#"
            SELECT session_key, package_id, transaction_id, granted_at, expires_at, is_active
            FROM user_access
            WHERE session_key = $1
            "#,
        )
        .bind(session_key.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| EngineError::infrastructure(format!("failed to find access: {}", e)))?;

        row.map(UserAccess::try_from).transpose()
    }

    async fn update(&self, access: &UserAccess) -> Result<(), EngineError> {
        let result = sqlx::query(
            r#"
            UPDATE user_access SET
                package_id = $2,
                transaction_id = $3,
                expires_at = $4,
                is_active = $5
            WHERE session_key = $1
            "#,
        )
        .bind(access.session_key.as_str())
        .bind(access.package_id.as_uuid())
        .bind(access.transaction_id.as_uuid())
        .bind(access.expires_at.as_datetime())
        .bind(access.is_active)
        .execute(&self.pool)
        .await
        .map_err(|e| EngineError::infrastructure(format!("failed to update access: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(EngineError::not_found(&access.session_key));
        }

        Ok(())
    }
}
