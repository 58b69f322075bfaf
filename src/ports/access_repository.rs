//! Access grant port.
//!
//! # Design
//!
//! - **One row per session**: `upsert` keys on the session so repeat
//!   purchases renew the existing grant instead of inserting a second one
//! - **Idempotent**: replaying the same grant for the same transaction
//!   leaves the stored row unchanged

use crate::domain::access::UserAccess;
use crate::domain::foundation::SessionKey;
use crate::domain::transaction::EngineError;
use async_trait::async_trait;

/// Repository port for access grant persistence.
#[async_trait]
pub trait AccessRepository: Send + Sync {
    /// Insert a grant, or renew the existing grant for the session.
    ///
    /// Implementations must preserve the original `granted_at` when the
    /// session already holds a grant, and must be atomic so concurrent
    /// issuers for the same transaction converge on one row.
    ///
    /// Returns the grant as stored.
    async fn upsert(&self, access: &UserAccess) -> Result<UserAccess, EngineError>;

    /// Find the grant for a session, if any.
    async fn find_by_session(
        &self,
        session_key: &SessionKey,
    ) -> Result<Option<UserAccess>, EngineError>;

    /// Persist a mutated grant (deactivation).
    ///
    /// # Errors
    ///
    /// - `NotFound` if the session holds no grant
    async fn update(&self, access: &UserAccess) -> Result<(), EngineError>;
}
