//! PostgreSQL implementation of TransactionRepository.
//!
//! The status transition is a conditional UPDATE so concurrent webhook
//! deliveries, manual verification, and the expiry sweep serialize on
//! the row without holding application locks.

use crate::domain::foundation::{ExternalId, SessionKey, Timestamp, TransactionId};
use crate::domain::transaction::{ChannelKind, EngineError, Transaction, TransactionStatus};
use crate::ports::{TransactionRepository, TransitionReceipt};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

/// PostgreSQL implementation of the TransactionRepository port.
pub struct PostgresTransactionRepository {
    pool: PgPool,
}

impl PostgresTransactionRepository {
    /// Creates a new repository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a transaction.
#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    id: Uuid,
    external_id: String,
    package_id: Uuid,
    session_key: String,
    amount: i64,
    channel: Option<String>,
    invoice_id: Option<String>,
    qr_id: Option<String>,
    provider_payment_id: Option<String>,
    payment_url: Option<String>,
    status: String,
    paid_at: Option<DateTime<Utc>>,
    deadline: DateTime<Utc>,
    last_callback: Option<serde_json::Value>,
    channel_response: Option<serde_json::Value>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = EngineError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        let status = parse_status(&row.status)?;
        let channel = row.channel.as_deref().map(parse_channel).transpose()?;

        Ok(Transaction {
            id: TransactionId::from_uuid(row.id),
            external_id: ExternalId::new(row.external_id)
                .map_err(|e| EngineError::infrastructure(format!("invalid external_id: {}", e)))?,
            package_id: crate::domain::foundation::PackageId::from_uuid(row.package_id),
            session_key: SessionKey::new(row.session_key)
                .map_err(|e| EngineError::infrastructure(format!("invalid session_key: {}", e)))?,
            amount: crate::domain::foundation::Money::new(row.amount)
                .map_err(|e| EngineError::infrastructure(format!("invalid amount: {}", e)))?,
            channel,
            invoice_id: row.invoice_id,
            qr_id: row.qr_id,
            provider_payment_id: row.provider_payment_id,
            payment_url: row.payment_url,
            status,
            paid_at: row.paid_at.map(Timestamp::from_datetime),
            deadline: Timestamp::from_datetime(row.deadline),
            last_callback: row.last_callback,
            channel_response: row.channel_response,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

fn parse_status(s: &str) -> Result<TransactionStatus, EngineError> {
    match s {
        "pending" => Ok(TransactionStatus::Pending),
        "paid" => Ok(TransactionStatus::Paid),
        "failed" => Ok(TransactionStatus::Failed),
        "expired" => Ok(TransactionStatus::Expired),
        _ => Err(EngineError::infrastructure(format!(
            "invalid status value: {}",
            s
        ))),
    }
}

fn status_to_string(status: &TransactionStatus) -> &'static str {
    match status {
        TransactionStatus::Pending => "pending",
        TransactionStatus::Paid => "paid",
        TransactionStatus::Failed => "failed",
        TransactionStatus::Expired => "expired",
    }
}

fn parse_channel(s: &str) -> Result<ChannelKind, EngineError> {
    s.parse::<ChannelKind>()
        .map_err(|_| EngineError::infrastructure(format!("invalid channel value: {}", s)))
}

fn channel_to_string(channel: &ChannelKind) -> String {
    channel.to_string()
}

const COLUMNS: &str = "id, external_id, package_id, session_key, amount, channel, invoice_id, \
     qr_id, provider_payment_id, payment_url, status, paid_at, deadline, last_callback, \
     channel_response, created_at, updated_at";

#[async_trait]
impl TransactionRepository for PostgresTransactionRepository {
    async fn save(&self, transaction: &Transaction) -> Result<(), EngineError> {
        sqlx::query(
            r#"
            INSERT INTO transactions (
                id, external_id, package_id, session_key, amount, channel, invoice_id,
                qr_id, provider_payment_id, payment_url, status, paid_at, deadline,
                last_callback, channel_response, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            "#,
        )
        .bind(transaction.id.as_uuid())
        .bind(transaction.external_id.as_str())
        .bind(transaction.package_id.as_uuid())
        .bind(transaction.session_key.as_str())
        .bind(transaction.amount.as_rupiah())
        .bind(transaction.channel.as_ref().map(channel_to_string))
        .bind(&transaction.invoice_id)
        .bind(&transaction.qr_id)
        .bind(&transaction.provider_payment_id)
        .bind(&transaction.payment_url)
        .bind(status_to_string(&transaction.status))
        .bind(transaction.paid_at.as_ref().map(|t| *t.as_datetime()))
        .bind(transaction.deadline.as_datetime())
        .bind(&transaction.last_callback)
        .bind(&transaction.channel_response)
        .bind(transaction.created_at.as_datetime())
        .bind(transaction.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| EngineError::infrastructure(format!("failed to save transaction: {}", e)))?;

        Ok(())
    }

    async fn update(&self, transaction: &Transaction) -> Result<(), EngineError> {
        // Status and paid_at only move through `transition`.
        let result = sqlx::query(
            r#"
            UPDATE transactions SET
                channel = $2,
                invoice_id = $3,
                qr_id = $4,
                provider_payment_id = $5,
                payment_url = $6,
                last_callback = $7,
                channel_response = $8,
                updated_at = $9
            WHERE id = $1
            "#,
        )
        .bind(transaction.id.as_uuid())
        .bind(transaction.channel.as_ref().map(channel_to_string))
        .bind(&transaction.invoice_id)
        .bind(&transaction.qr_id)
        .bind(&transaction.provider_payment_id)
        .bind(&transaction.payment_url)
        .bind(&transaction.last_callback)
        .bind(&transaction.channel_response)
        .bind(transaction.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| EngineError::infrastructure(format!("failed to update transaction: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(EngineError::not_found(transaction.id));
        }

        Ok(())
    }

    async fn find_by_id(&self, id: &TransactionId) -> Result<Option<Transaction>, EngineError> {
        let row: Option<TransactionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM transactions WHERE id = $1",
            COLUMNS
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| EngineError::infrastructure(format!("failed to find transaction: {}", e)))?;

        row.map(Transaction::try_from).transpose()
    }

    async fn find_by_external_id(
        &self,
        external_id: &ExternalId,
    ) -> Result<Option<Transaction>, EngineError> {
        let row: Option<TransactionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM transactions WHERE external_id = $1",
            COLUMNS
        ))
        .bind(external_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| EngineError::infrastructure(format!("failed to find transaction: {}", e)))?;

        row.map(Transaction::try_from).transpose()
    }

    async fn transition(
        &self,
        id: &TransactionId,
        target: TransactionStatus,
    ) -> Result<TransitionReceipt, EngineError> {
        // CAS: only a pending row moves, and only to a different status.
        let updated: Option<TransactionRow> = sqlx::query_as(&format!(
            r#"
            UPDATE transactions SET
                status = $2,
                paid_at = CASE WHEN $2 = 'paid' THEN now() ELSE paid_at END,
                updated_at = now()
            WHERE id = $1 AND status = 'pending' AND status <> $2
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(id.as_uuid())
        .bind(status_to_string(&target))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            EngineError::infrastructure(format!("failed to transition transaction: {}", e))
        })?;

        if let Some(row) = updated {
            return Ok(TransitionReceipt {
                transaction: row.try_into()?,
                changed: true,
            });
        }

        // The CAS missed: the row is absent, already in the target
        // status (a replay), or sitting in a different terminal status.
        let current = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| EngineError::not_found(id))?;

        if current.status == target {
            return Ok(TransitionReceipt {
                transaction: current,
                changed: false,
            });
        }

        Err(EngineError::InvalidTransition {
            current: current.status,
            target,
        })
    }

    async fn find_pending_past_deadline(
        &self,
        now: &Timestamp,
    ) -> Result<Vec<Transaction>, EngineError> {
        let rows: Vec<TransactionRow> = sqlx::query_as(&format!(
            r#"
            SELECT {}
            FROM transactions
            WHERE status = 'pending' AND deadline < $1
            ORDER BY deadline ASC
            "#,
            COLUMNS
        ))
        .bind(now.as_datetime())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            EngineError::infrastructure(format!("failed to list overdue transactions: {}", e))
        })?;

        rows.into_iter().map(Transaction::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_status_works_for_all_values() {
        assert_eq!(parse_status("pending").unwrap(), TransactionStatus::Pending);
        assert_eq!(parse_status("paid").unwrap(), TransactionStatus::Paid);
        assert_eq!(parse_status("failed").unwrap(), TransactionStatus::Failed);
        assert_eq!(parse_status("expired").unwrap(), TransactionStatus::Expired);
    }

    #[test]
    fn parse_status_rejects_invalid_values() {
        assert!(parse_status("invalid").is_err());
        assert!(parse_status("").is_err());
        assert!(parse_status("PAID").is_err());
    }

    #[test]
    fn roundtrip_status_conversion() {
        for status in [
            TransactionStatus::Pending,
            TransactionStatus::Paid,
            TransactionStatus::Failed,
            TransactionStatus::Expired,
        ] {
            let s = status_to_string(&status);
            let parsed = parse_status(s).unwrap();
            assert_eq!(status, parsed);
        }
    }

    #[test]
    fn roundtrip_channel_conversion() {
        for channel in ChannelKind::all() {
            let s = channel_to_string(&channel);
            let parsed = parse_channel(&s).unwrap();
            assert_eq!(channel, parsed);
        }
    }

    #[test]
    fn parse_channel_rejects_invalid_values() {
        assert!(parse_channel("wire_transfer").is_err());
    }
}
