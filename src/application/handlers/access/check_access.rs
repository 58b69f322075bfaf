//! CheckAccessHandler - query for a session's access state.

use std::sync::Arc;

use tracing::debug;

use crate::domain::access::UserAccess;
use crate::domain::foundation::{SessionKey, Timestamp};
use crate::domain::transaction::EngineError;
use crate::ports::AccessRepository;

/// Query for a session's current access.
#[derive(Debug, Clone)]
pub struct CheckAccessQuery {
    pub session_key: SessionKey,
}

/// Result of an access check.
#[derive(Debug, Clone)]
pub struct CheckAccessResult {
    pub has_access: bool,
    pub access: Option<UserAccess>,
}

/// Handler for access checks.
///
/// A grant found past its expiry is deactivated on the way out. The
/// write is last-write-wins and safe under concurrent readers; losing
/// the race just means another reader already flipped the flag.
pub struct CheckAccessHandler {
    access: Arc<dyn AccessRepository>,
}

impl CheckAccessHandler {
    pub fn new(access: Arc<dyn AccessRepository>) -> Self {
        Self { access }
    }

    pub async fn handle(&self, query: CheckAccessQuery) -> Result<CheckAccessResult, EngineError> {
        let Some(mut grant) = self.access.find_by_session(&query.session_key).await? else {
            return Ok(CheckAccessResult {
                has_access: false,
                access: None,
            });
        };

        let now = Timestamp::now();
        if grant.is_valid(&now) {
            return Ok(CheckAccessResult {
                has_access: true,
                access: Some(grant),
            });
        }

        if grant.is_active {
            debug!(session_key = %grant.session_key, "deactivating lapsed grant");
            grant.deactivate();
            self.access.update(&grant).await?;
        }

        Ok(CheckAccessResult {
            has_access: false,
            access: Some(grant),
        })
    }
}
