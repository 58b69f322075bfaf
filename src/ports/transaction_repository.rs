//! Transaction ledger port (write side).
//!
//! # Design
//!
//! - **Linearizable transitions**: `transition` is the only way to move a
//!   stored transaction between statuses, and implementations must apply
//!   it atomically (compare-and-set on the current status)
//! - **Correlation lookup**: inbound provider notifications are matched
//!   through `find_by_external_id`

use crate::domain::foundation::{ExternalId, Timestamp, TransactionId};
use crate::domain::transaction::{EngineError, Transaction, TransactionStatus};
use async_trait::async_trait;

/// Result of an atomic status transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionReceipt {
    /// The transaction as stored after the operation.
    pub transaction: Transaction,

    /// True if the status actually changed; false for a replay that
    /// targeted the status the row was already in.
    pub changed: bool,
}

/// Repository port for transaction ledger persistence.
#[async_trait]
pub trait TransactionRepository: Send + Sync {
    /// Persist a newly created transaction.
    ///
    /// # Errors
    ///
    /// - `Infrastructure` on persistence failure
    async fn save(&self, transaction: &Transaction) -> Result<(), EngineError>;

    /// Update channel details and audit payloads of an existing row.
    ///
    /// Never used to change status; that goes through [`Self::transition`].
    ///
    /// # Errors
    ///
    /// - `NotFound` if the transaction does not exist
    /// - `Infrastructure` on persistence failure
    async fn update(&self, transaction: &Transaction) -> Result<(), EngineError>;

    /// Find a transaction by its internal ID.
    async fn find_by_id(&self, id: &TransactionId) -> Result<Option<Transaction>, EngineError>;

    /// Find a transaction by the correlation key the provider echoes back.
    async fn find_by_external_id(
        &self,
        external_id: &ExternalId,
    ) -> Result<Option<Transaction>, EngineError>;

    /// Atomically transition a transaction to a target status.
    ///
    /// Implementations must compare-and-set: the row moves only if it is
    /// currently Pending. When the row already sits in the target status
    /// the receipt comes back with `changed: false`.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the transaction does not exist
    /// - `InvalidTransition` if the row is in a different terminal status
    /// - `Infrastructure` on persistence failure
    async fn transition(
        &self,
        id: &TransactionId,
        target: TransactionStatus,
    ) -> Result<TransitionReceipt, EngineError>;

    /// List pending transactions whose deadline passed before `now`.
    ///
    /// Used by the expiry sweep.
    async fn find_pending_past_deadline(
        &self,
        now: &Timestamp,
    ) -> Result<Vec<Transaction>, EngineError>;
}
