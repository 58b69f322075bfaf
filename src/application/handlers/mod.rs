//! Command/query handlers, one per engine operation.

pub mod access;
pub mod checkout;
pub mod reconcile;
pub mod webhook;
