//! Package catalog port (read side).

use crate::domain::catalog::Package;
use crate::domain::foundation::PackageId;
use crate::domain::transaction::EngineError;
use async_trait::async_trait;

/// Read-only port over the package catalog.
#[async_trait]
pub trait PackageReader: Send + Sync {
    /// Find a package by ID. Returns `None` if unknown.
    async fn find_by_id(&self, id: &PackageId) -> Result<Option<Package>, EngineError>;

    /// List packages currently on sale.
    async fn list_active(&self) -> Result<Vec<Package>, EngineError>;
}
