//! Engine-wide error taxonomy for the reconciliation core.

use thiserror::Error;

use crate::domain::foundation::ValidationError;
use crate::domain::transaction::{ChannelKind, TransactionStatus};

/// Errors surfaced by transaction lifecycle operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The requested package does not exist or is not purchasable.
    #[error("package is unknown or not purchasable")]
    InvalidPackage,

    /// No transaction matches the given identifier.
    #[error("transaction not found: {0}")]
    NotFound(String),

    /// A status transition violated the lifecycle state machine.
    #[error("invalid transition from {current} to {target}")]
    InvalidTransition {
        current: TransactionStatus,
        target: TransactionStatus,
    },

    /// The provider reported a status outside the known vocabulary.
    #[error("unrecognized provider status '{raw}' for channel {channel}")]
    UnknownProviderStatus { channel: ChannelKind, raw: String },

    /// The payment provider rejected or failed the request.
    #[error("payment provider error: {0}")]
    Provider(String),

    /// Operation is not allowed with the current configuration.
    #[error("operation not permitted: {0}")]
    NotPermitted(String),

    /// A value object failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Storage or other infrastructure failure.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}

impl EngineError {
    /// Creates a not-found error for any identifier type.
    pub fn not_found(id: impl ToString) -> Self {
        EngineError::NotFound(id.to_string())
    }

    /// Creates an infrastructure error from any display-able source.
    pub fn infrastructure(source: impl ToString) -> Self {
        EngineError::Infrastructure(source.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_transition_displays_both_states() {
        let err = EngineError::InvalidTransition {
            current: TransactionStatus::Expired,
            target: TransactionStatus::Paid,
        };
        assert_eq!(err.to_string(), "invalid transition from expired to paid");
    }

    #[test]
    fn unknown_provider_status_displays_channel_and_raw() {
        let err = EngineError::UnknownProviderStatus {
            channel: ChannelKind::Invoice,
            raw: "WEIRD_STATUS".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "unrecognized provider status 'WEIRD_STATUS' for channel invoice"
        );
    }

    #[test]
    fn validation_errors_convert_transparently() {
        let err: EngineError = ValidationError::empty_field("session_key").into();
        assert!(matches!(err, EngineError::Validation(_)));
    }
}
