//! Transaction lifecycle state machine.
//!
//! A transaction starts Pending and moves exactly once to one of the
//! terminal states. Terminal states never transition to anything else.

use crate::domain::foundation::StateMachine;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a payment transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Awaiting payment. The only state that accepts transitions.
    Pending,

    /// Payment confirmed. Grants access.
    Paid,

    /// Payment attempted and rejected by the provider.
    Failed,

    /// Payment deadline passed without confirmation.
    Expired,
}

impl TransactionStatus {
    /// Returns true if this status unlocks content access.
    pub fn grants_access(&self) -> bool {
        matches!(self, TransactionStatus::Paid)
    }
}

impl StateMachine for TransactionStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use TransactionStatus::*;
        matches!(
            (self, target),
            (Pending, Paid) | (Pending, Failed) | (Pending, Expired)
        )
    }

    fn is_terminal(&self) -> bool {
        !matches!(self, TransactionStatus::Pending)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Paid => "paid",
            TransactionStatus::Failed => "failed",
            TransactionStatus::Expired => "expired",
        };
        write!(f, "{s}")
    }
}
