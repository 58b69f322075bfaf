//! Reconciliation handlers.

mod expire_sweep;
mod verify_payment;

pub use expire_sweep::{ExpireSweepHandler, SweepReport};
pub use verify_payment::{VerifyOutcome, VerifyPaymentCommand, VerifyPaymentHandler};
