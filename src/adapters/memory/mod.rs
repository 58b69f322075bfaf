//! In-memory adapter implementations.
//!
//! Mutex-backed stores used by tests and local development. The
//! transition CAS holds the store lock for the whole read-check-write,
//! which gives the same linearizability the Postgres adapter gets from
//! its conditional UPDATE.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::access::UserAccess;
use crate::domain::catalog::Package;
use crate::domain::foundation::{ExternalId, PackageId, SessionKey, Timestamp, TransactionId};
use crate::domain::transaction::{EngineError, Transaction, TransactionStatus};
use crate::ports::{
    AccessRepository, PackageReader, TransactionRepository, TransitionReceipt,
};

/// In-memory transaction ledger.
#[derive(Default)]
pub struct InMemoryTransactionRepository {
    rows: Mutex<Vec<Transaction>>,
}

impl InMemoryTransactionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all stored transactions, for test assertions.
    pub fn all(&self) -> Vec<Transaction> {
        self.rows.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl TransactionRepository for InMemoryTransactionRepository {
    async fn save(&self, transaction: &Transaction) -> Result<(), EngineError> {
        let mut rows = self.rows.lock().unwrap_or_else(|e| e.into_inner());
        rows.push(transaction.clone());
        Ok(())
    }

    async fn update(&self, transaction: &Transaction) -> Result<(), EngineError> {
        let mut rows = self.rows.lock().unwrap_or_else(|e| e.into_inner());
        let row = rows
            .iter_mut()
            .find(|t| t.id == transaction.id)
            .ok_or_else(|| EngineError::not_found(transaction.id))?;
        // Status is owned by `transition`; keep the stored one.
        let status = row.status;
        let paid_at = row.paid_at;
        *row = transaction.clone();
        row.status = status;
        row.paid_at = paid_at;
        Ok(())
    }

    async fn find_by_id(&self, id: &TransactionId) -> Result<Option<Transaction>, EngineError> {
        let rows = self.rows.lock().unwrap_or_else(|e| e.into_inner());
        Ok(rows.iter().find(|t| &t.id == id).cloned())
    }

    async fn find_by_external_id(
        &self,
        external_id: &ExternalId,
    ) -> Result<Option<Transaction>, EngineError> {
        let rows = self.rows.lock().unwrap_or_else(|e| e.into_inner());
        Ok(rows.iter().find(|t| &t.external_id == external_id).cloned())
    }

    async fn transition(
        &self,
        id: &TransactionId,
        target: TransactionStatus,
    ) -> Result<TransitionReceipt, EngineError> {
        let mut rows = self.rows.lock().unwrap_or_else(|e| e.into_inner());
        let row = rows
            .iter_mut()
            .find(|t| &t.id == id)
            .ok_or_else(|| EngineError::not_found(id))?;
        let changed = row.transition(target)?;
        Ok(TransitionReceipt {
            transaction: row.clone(),
            changed,
        })
    }

    async fn find_pending_past_deadline(
        &self,
        now: &Timestamp,
    ) -> Result<Vec<Transaction>, EngineError> {
        let rows = self.rows.lock().unwrap_or_else(|e| e.into_inner());
        Ok(rows
            .iter()
            .filter(|t| t.status == TransactionStatus::Pending && t.is_past_deadline(now))
            .cloned()
            .collect())
    }
}

/// In-memory access grant store.
#[derive(Default)]
pub struct InMemoryAccessRepository {
    grants: Mutex<Vec<UserAccess>>,
}

impl InMemoryAccessRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all stored grants, for test assertions.
    pub fn all(&self) -> Vec<UserAccess> {
        self.grants
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl AccessRepository for InMemoryAccessRepository {
    async fn upsert(&self, access: &UserAccess) -> Result<UserAccess, EngineError> {
        let mut grants = self.grants.lock().unwrap_or_else(|e| e.into_inner());
        match grants
            .iter_mut()
            .find(|g| g.session_key == access.session_key)
        {
            Some(existing) => {
                let granted_at = existing.granted_at;
                *existing = access.clone();
                existing.granted_at = granted_at;
                Ok(existing.clone())
            }
            None => {
                grants.push(access.clone());
                Ok(access.clone())
            }
        }
    }

    async fn find_by_session(
        &self,
        session_key: &SessionKey,
    ) -> Result<Option<UserAccess>, EngineError> {
        let grants = self.grants.lock().unwrap_or_else(|e| e.into_inner());
        Ok(grants
            .iter()
            .find(|g| &g.session_key == session_key)
            .cloned())
    }

    async fn update(&self, access: &UserAccess) -> Result<(), EngineError> {
        let mut grants = self.grants.lock().unwrap_or_else(|e| e.into_inner());
        let grant = grants
            .iter_mut()
            .find(|g| g.session_key == access.session_key)
            .ok_or_else(|| EngineError::not_found(&access.session_key))?;
        *grant = access.clone();
        Ok(())
    }
}

/// In-memory package catalog.
#[derive(Default)]
pub struct InMemoryPackageReader {
    packages: Mutex<Vec<Package>>,
}

impl InMemoryPackageReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_packages(packages: Vec<Package>) -> Self {
        Self {
            packages: Mutex::new(packages),
        }
    }

    pub fn add(&self, package: Package) {
        self.packages
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(package);
    }
}

#[async_trait]
impl PackageReader for InMemoryPackageReader {
    async fn find_by_id(&self, id: &PackageId) -> Result<Option<Package>, EngineError> {
        let packages = self.packages.lock().unwrap_or_else(|e| e.into_inner());
        Ok(packages.iter().find(|p| &p.id == id).cloned())
    }

    async fn list_active(&self) -> Result<Vec<Package>, EngineError> {
        let packages = self.packages.lock().unwrap_or_else(|e| e.into_inner());
        Ok(packages.iter().filter(|p| p.is_active).cloned().collect())
    }
}
