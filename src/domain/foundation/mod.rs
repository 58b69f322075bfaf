//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers, and error types that form the
//! vocabulary of the payment engine domain.

mod errors;
mod ids;
mod money;
mod state_machine;
mod timestamp;

pub use errors::ValidationError;
pub use ids::{ExternalId, PackageId, SessionKey, TransactionId};
pub use money::Money;
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
