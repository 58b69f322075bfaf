//! Payment channel kinds supported by the provider adapter.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::ValidationError;

/// The payment mechanism attached to a transaction.
///
/// A transaction is created without a channel; exactly one channel is
/// attached when payment instructions are first requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    /// Hosted invoice page. The visitor is redirected to the provider.
    Invoice,

    /// Bank-specific virtual account number for manual transfer.
    VirtualAccount,

    /// QRIS code scanned from any participating wallet app.
    Qr,

    /// Tokenized card charge (two-step: tokenize, then charge).
    Card,
}

impl ChannelKind {
    /// Returns all supported channels.
    pub fn all() -> [ChannelKind; 4] {
        [
            ChannelKind::Invoice,
            ChannelKind::VirtualAccount,
            ChannelKind::Qr,
            ChannelKind::Card,
        ]
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChannelKind::Invoice => "invoice",
            ChannelKind::VirtualAccount => "virtual_account",
            ChannelKind::Qr => "qr",
            ChannelKind::Card => "card",
        };
        write!(f, "{s}")
    }
}

impl FromStr for ChannelKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "invoice" => Ok(ChannelKind::Invoice),
            "virtual_account" => Ok(ChannelKind::VirtualAccount),
            "qr" => Ok(ChannelKind::Qr),
            "card" => Ok(ChannelKind::Card),
            other => Err(ValidationError::invalid_value(
                "channel",
                format!("unknown channel '{other}'"),
            )),
        }
    }
}
