//! Monetary amount value object.
//!
//! Amounts are whole Indonesian rupiah stored as i64 (IDR has no fractional
//! unit in practice). Never floats.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ValidationError;

/// A non-negative amount of whole rupiah.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Creates a new amount, rejecting negative values.
    pub fn new(rupiah: i64) -> Result<Self, ValidationError> {
        if rupiah < 0 {
            return Err(ValidationError::invalid_value(
                "amount",
                "must not be negative",
            ));
        }
        Ok(Self(rupiah))
    }

    /// Returns the amount in whole rupiah.
    pub fn as_rupiah(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rp {}", self.0)
    }
}
