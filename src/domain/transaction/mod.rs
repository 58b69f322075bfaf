//! Transaction bounded context.
//!
//! The transaction ledger is the source of truth for every purchase
//! attempt: its lifecycle state machine, the payment channel attached to
//! it, and the normalization of provider status vocabularies into the
//! canonical set.

mod aggregate;
mod channel;
mod errors;
mod normalizer;
mod status;

pub use aggregate::Transaction;
pub use channel::ChannelKind;
pub use errors::EngineError;
pub use normalizer::{normalize_status, CanonicalStatus};
pub use status::TransactionStatus;
