//! UserAccess entity: the access grant keyed by session.
//!
//! One row per session key. A session that buys again gets its existing
//! grant renewed rather than a second row.

use crate::domain::foundation::{PackageId, SessionKey, Timestamp, TransactionId};
use serde::{Deserialize, Serialize};

/// An access grant for a visitor session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccess {
    /// Session this grant belongs to. Unique per grant.
    pub session_key: SessionKey,

    /// Package whose purchase unlocked this grant.
    pub package_id: PackageId,

    /// Transaction that paid for the current grant period.
    pub transaction_id: TransactionId,

    /// When access was first granted. Preserved across renewals.
    pub granted_at: Timestamp,

    /// When access lapses.
    pub expires_at: Timestamp,

    /// Whether the grant is live. Lazily flipped off once expired.
    pub is_active: bool,
}

impl UserAccess {
    /// Creates a fresh grant for a paid transaction.
    pub fn grant(
        session_key: SessionKey,
        package_id: PackageId,
        transaction_id: TransactionId,
        duration_days: u32,
    ) -> Self {
        let now = Timestamp::now();
        Self {
            session_key,
            package_id,
            transaction_id,
            granted_at: now,
            expires_at: now.add_days(i64::from(duration_days)),
            is_active: true,
        }
    }

    /// Renews an existing grant from a new paid transaction.
    ///
    /// The expiry restarts from now, not from the old expiry, and the
    /// original `granted_at` is kept.
    pub fn renew(
        &mut self,
        package_id: PackageId,
        transaction_id: TransactionId,
        duration_days: u32,
    ) {
        self.package_id = package_id;
        self.transaction_id = transaction_id;
        self.expires_at = Timestamp::now().add_days(i64::from(duration_days));
        self.is_active = true;
    }

    /// Returns true if the grant is active and not yet expired.
    ///
    /// The expiry boundary is inclusive: a read at exactly
    /// `expires_at` still has access.
    pub fn is_valid(&self, now: &Timestamp) -> bool {
        self.is_active && !now.is_after(&self.expires_at)
    }

    /// Deactivates the grant.
    pub fn deactivate(&mut self) {
        self.is_active = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_grant(duration_days: u32) -> UserAccess {
        UserAccess::grant(
            SessionKey::new("sess-abc").unwrap(),
            PackageId::new(),
            TransactionId::new(),
            duration_days,
        )
    }

    #[test]
    fn fresh_grant_is_valid() {
        let grant = test_grant(7);
        assert!(grant.is_valid(&Timestamp::now()));
    }

    #[test]
    fn grant_expires_after_duration() {
        let grant = test_grant(7);
        let after_expiry = Timestamp::now().add_days(8);
        assert!(!grant.is_valid(&after_expiry));
    }

    #[test]
    fn grant_is_still_valid_at_exact_expiry_instant() {
        let grant = test_grant(7);
        assert!(grant.is_valid(&grant.expires_at));
    }

    #[test]
    fn deactivated_grant_is_invalid_even_before_expiry() {
        let mut grant = test_grant(7);
        grant.deactivate();
        assert!(!grant.is_valid(&Timestamp::now()));
    }

    #[test]
    fn renew_restarts_expiry_and_keeps_granted_at() {
        let mut grant = test_grant(7);
        let original_granted_at = grant.granted_at;
        let new_package = PackageId::new();
        let new_transaction = TransactionId::new();

        grant.renew(new_package, new_transaction, 30);

        assert_eq!(grant.granted_at, original_granted_at);
        assert_eq!(grant.package_id, new_package);
        assert_eq!(grant.transaction_id, new_transaction);
        assert!(grant.is_valid(&Timestamp::now().add_days(20)));
    }

    #[test]
    fn renew_reactivates_a_deactivated_grant() {
        let mut grant = test_grant(7);
        grant.deactivate();
        grant.renew(PackageId::new(), TransactionId::new(), 7);
        assert!(grant.is_valid(&Timestamp::now()));
    }
}
