//! GrantAccessHandler - issues the access grant for a paid transaction.
//!
//! This is the single grant call site shared by webhook ingestion,
//! manual verification, simulated payments, and immediate card captures.

use std::sync::Arc;

use tracing::info;

use crate::domain::access::UserAccess;
use crate::domain::transaction::{EngineError, Transaction};
use crate::ports::{AccessRepository, PackageReader};

/// Command to grant access for a paid transaction.
#[derive(Debug, Clone)]
pub struct GrantAccessCommand {
    /// The transaction that just won its Pending->Paid transition.
    pub transaction: Transaction,
}

/// Handler that issues access grants idempotently.
pub struct GrantAccessHandler {
    access: Arc<dyn AccessRepository>,
    packages: Arc<dyn PackageReader>,
}

impl GrantAccessHandler {
    pub fn new(access: Arc<dyn AccessRepository>, packages: Arc<dyn PackageReader>) -> Self {
        Self { access, packages }
    }

    /// Grant or renew access for the transaction's session.
    ///
    /// Replaying the same transaction returns the stored grant without
    /// touching it, so a racing webhook and manual verify converge on
    /// one row with one expiry.
    pub async fn handle(&self, cmd: GrantAccessCommand) -> Result<UserAccess, EngineError> {
        let txn = &cmd.transaction;

        let package = self
            .packages
            .find_by_id(&txn.package_id)
            .await?
            .ok_or(EngineError::InvalidPackage)?;

        let existing = self.access.find_by_session(&txn.session_key).await?;

        if let Some(existing) = &existing {
            if existing.transaction_id == txn.id {
                return Ok(existing.clone());
            }
        }

        let grant = match existing {
            Some(mut grant) => {
                grant.renew(package.id, txn.id, package.duration_days);
                grant
            }
            None => UserAccess::grant(
                txn.session_key.clone(),
                package.id,
                txn.id,
                package.duration_days,
            ),
        };

        let stored = self.access.upsert(&grant).await?;

        info!(
            session_key = %stored.session_key,
            transaction_id = %txn.id,
            expires_at = ?stored.expires_at,
            "access granted"
        );

        Ok(stored)
    }
}
