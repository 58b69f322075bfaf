//! Checkout handlers.

mod create_transaction;
mod simulate_payment;

pub use create_transaction::{
    CreateTransactionCommand, CreateTransactionHandler, CreateTransactionResult,
};
pub use simulate_payment::{SimulateOutcome, SimulatePaymentCommand, SimulatePaymentHandler};
