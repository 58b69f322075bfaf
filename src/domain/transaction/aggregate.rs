//! Transaction aggregate: the ledger row for a single purchase attempt.
//!
//! # Invariants
//!
//! - `external_id` is generated once at creation and never changes
//! - Status transitions follow the lifecycle state machine
//! - `paid_at` is set if and only if status is Paid
//! - At most one payment channel is ever attached

use crate::domain::foundation::{
    ExternalId, Money, PackageId, SessionKey, StateMachine, Timestamp, TransactionId,
};
use serde::{Deserialize, Serialize};

use super::{ChannelKind, EngineError, TransactionStatus};

/// A single purchase attempt in the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique identifier for this transaction.
    pub id: TransactionId,

    /// Correlation key handed to the payment provider.
    pub external_id: ExternalId,

    /// Package being purchased.
    pub package_id: PackageId,

    /// Session identity of the purchasing visitor.
    pub session_key: SessionKey,

    /// Amount owed, snapshotted from the package at creation.
    pub amount: Money,

    /// Payment channel, attached when instructions are first requested.
    pub channel: Option<ChannelKind>,

    /// Provider-side invoice identifier (invoice channel).
    pub invoice_id: Option<String>,

    /// Provider-side QR identifier (QR channel).
    pub qr_id: Option<String>,

    /// Provider-side payment or charge identifier.
    pub provider_payment_id: Option<String>,

    /// Hosted payment page URL, when the channel produces one.
    pub payment_url: Option<String>,

    /// Current lifecycle state.
    pub status: TransactionStatus,

    /// When payment was confirmed. Set exactly when status becomes Paid.
    pub paid_at: Option<Timestamp>,

    /// Payment deadline. Pending transactions past this are swept to Expired.
    pub deadline: Timestamp,

    /// Raw body of the most recent provider notification, kept for audit.
    pub last_callback: Option<serde_json::Value>,

    /// Raw provider response from channel creation, kept for audit.
    pub channel_response: Option<serde_json::Value>,

    /// When the transaction was created.
    pub created_at: Timestamp,

    /// When the transaction was last updated.
    pub updated_at: Timestamp,
}

impl Transaction {
    /// Creates a new pending transaction with a fresh correlation key.
    pub fn create(
        package_id: PackageId,
        session_key: SessionKey,
        amount: Money,
        deadline: Timestamp,
    ) -> Self {
        let now = Timestamp::now();
        Self {
            id: TransactionId::new(),
            external_id: ExternalId::generate(),
            package_id,
            session_key,
            amount,
            channel: None,
            invoice_id: None,
            qr_id: None,
            provider_payment_id: None,
            payment_url: None,
            status: TransactionStatus::Pending,
            paid_at: None,
            deadline,
            last_callback: None,
            channel_response: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Attaches a payment channel to this transaction.
    ///
    /// # Errors
    ///
    /// Returns error if a different channel is already attached. Attaching
    /// the same channel again is a no-op so retried checkouts stay safe.
    pub fn attach_channel(&mut self, channel: ChannelKind) -> Result<(), EngineError> {
        match self.channel {
            None => {
                self.channel = Some(channel);
                self.updated_at = Timestamp::now();
                Ok(())
            }
            Some(existing) if existing == channel => Ok(()),
            Some(existing) => Err(EngineError::Validation(
                crate::domain::foundation::ValidationError::invalid_value(
                    "channel",
                    format!("channel {existing} already attached"),
                ),
            )),
        }
    }

    /// Records the raw provider response from channel creation.
    pub fn record_channel_response(&mut self, response: serde_json::Value) {
        self.channel_response = Some(response);
        self.updated_at = Timestamp::now();
    }

    /// Records the raw body of an inbound provider notification.
    pub fn record_callback(&mut self, payload: serde_json::Value) {
        self.last_callback = Some(payload);
        self.updated_at = Timestamp::now();
    }

    /// Applies a lifecycle transition.
    ///
    /// Returns `Ok(true)` when the status changed, `Ok(false)` when the
    /// target equals the current status (a replayed notification).
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidTransition`] when the target differs
    /// from the current status and the state machine forbids the move.
    pub fn transition(&mut self, target: TransactionStatus) -> Result<bool, EngineError> {
        if self.status == target {
            return Ok(false);
        }
        if !self.status.can_transition_to(&target) {
            return Err(EngineError::InvalidTransition {
                current: self.status,
                target,
            });
        }
        self.status = target;
        if target == TransactionStatus::Paid {
            self.paid_at = Some(Timestamp::now());
        }
        self.updated_at = Timestamp::now();
        Ok(true)
    }

    /// Returns true if the payment deadline has passed.
    pub fn is_past_deadline(&self, now: &Timestamp) -> bool {
        self.deadline.is_before(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_transaction() -> Transaction {
        Transaction::create(
            PackageId::new(),
            SessionKey::new("sess-abc").unwrap(),
            Money::new(150_000).unwrap(),
            Timestamp::now().add_hours(24),
        )
    }

    // Construction tests

    #[test]
    fn create_starts_pending_without_channel() {
        let txn = test_transaction();
        assert_eq!(txn.status, TransactionStatus::Pending);
        assert!(txn.channel.is_none());
        assert!(txn.paid_at.is_none());
        assert!(txn.external_id.as_str().starts_with("payment_"));
    }

    // Channel attachment tests

    #[test]
    fn attach_channel_sets_channel_once() {
        let mut txn = test_transaction();
        txn.attach_channel(ChannelKind::Invoice).unwrap();
        assert_eq!(txn.channel, Some(ChannelKind::Invoice));
    }

    #[test]
    fn reattaching_same_channel_is_noop() {
        let mut txn = test_transaction();
        txn.attach_channel(ChannelKind::Qr).unwrap();
        assert!(txn.attach_channel(ChannelKind::Qr).is_ok());
    }

    #[test]
    fn attaching_different_channel_is_rejected() {
        let mut txn = test_transaction();
        txn.attach_channel(ChannelKind::Qr).unwrap();
        assert!(txn.attach_channel(ChannelKind::Card).is_err());
    }

    // Transition tests

    #[test]
    fn pending_to_paid_stamps_paid_at() {
        let mut txn = test_transaction();
        let changed = txn.transition(TransactionStatus::Paid).unwrap();
        assert!(changed);
        assert_eq!(txn.status, TransactionStatus::Paid);
        assert!(txn.paid_at.is_some());
    }

    #[test]
    fn pending_to_failed_does_not_stamp_paid_at() {
        let mut txn = test_transaction();
        txn.transition(TransactionStatus::Failed).unwrap();
        assert!(txn.paid_at.is_none());
    }

    #[test]
    fn same_status_transition_reports_unchanged() {
        let mut txn = test_transaction();
        txn.transition(TransactionStatus::Paid).unwrap();
        let first_paid_at = txn.paid_at;

        let changed = txn.transition(TransactionStatus::Paid).unwrap();
        assert!(!changed);
        assert_eq!(txn.paid_at, first_paid_at);
    }

    #[test]
    fn expired_cannot_become_paid() {
        let mut txn = test_transaction();
        txn.transition(TransactionStatus::Expired).unwrap();

        let result = txn.transition(TransactionStatus::Paid);
        assert!(matches!(
            result,
            Err(EngineError::InvalidTransition {
                current: TransactionStatus::Expired,
                target: TransactionStatus::Paid,
            })
        ));
        assert_eq!(txn.status, TransactionStatus::Expired);
        assert!(txn.paid_at.is_none());
    }

    #[test]
    fn paid_cannot_become_expired() {
        let mut txn = test_transaction();
        txn.transition(TransactionStatus::Paid).unwrap();
        assert!(txn.transition(TransactionStatus::Expired).is_err());
        assert_eq!(txn.status, TransactionStatus::Paid);
    }

    // Deadline tests

    #[test]
    fn deadline_in_future_is_not_past() {
        let txn = test_transaction();
        assert!(!txn.is_past_deadline(&Timestamp::now()));
    }

    #[test]
    fn deadline_in_past_is_past() {
        let mut txn = test_transaction();
        txn.deadline = Timestamp::now().add_hours(-1);
        assert!(txn.is_past_deadline(&Timestamp::now()));
    }

    // Audit payload tests

    #[test]
    fn record_callback_keeps_latest_payload() {
        let mut txn = test_transaction();
        txn.record_callback(serde_json::json!({"status": "PAID"}));
        txn.record_callback(serde_json::json!({"status": "SETTLED"}));
        assert_eq!(
            txn.last_callback,
            Some(serde_json::json!({"status": "SETTLED"}))
        );
    }
}
