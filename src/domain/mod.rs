//! Domain layer: pure business logic with no I/O.
//!
//! Organized by bounded context:
//! - `foundation`: shared value objects (ids, money, timestamps)
//! - `catalog`: purchasable content packages
//! - `transaction`: payment transaction lifecycle and status normalization
//! - `access`: access grants unlocked by paid transactions

pub mod access;
pub mod catalog;
pub mod foundation;
pub mod transaction;
