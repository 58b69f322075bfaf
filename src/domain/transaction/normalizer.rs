//! Provider status normalization.
//!
//! Each payment channel speaks its own status vocabulary. This module
//! maps every raw provider string to the canonical set, channel by
//! channel. Strings outside the table map to [`CanonicalStatus::Unknown`]
//! and are never coerced into a lifecycle transition.

use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::domain::transaction::ChannelKind;

/// Canonical status vocabulary the lifecycle understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanonicalStatus {
    Paid,
    Pending,
    Failed,
    Expired,
    /// Not in the known vocabulary for the channel. Never acted on.
    Unknown,
}

type StatusTable = HashMap<(ChannelKind, &'static str), CanonicalStatus>;

static STATUS_TABLE: Lazy<StatusTable> = Lazy::new(|| {
    use CanonicalStatus::*;
    use ChannelKind::*;

    let mut table = StatusTable::new();
    let mut insert = |channel, raw, canonical| {
        table.insert((channel, raw), canonical);
    };

    // Hosted invoice lifecycle.
    insert(Invoice, "PAID", Paid);
    insert(Invoice, "SETTLED", Paid);
    insert(Invoice, "COMPLETED", Paid);
    insert(Invoice, "SUCCESS", Paid);
    insert(Invoice, "PENDING", Pending);
    insert(Invoice, "UNPAID", Pending);
    insert(Invoice, "EXPIRED", Expired);
    insert(Invoice, "INACTIVE", Expired);
    insert(Invoice, "FAILED", Failed);

    // Virtual account: ACTIVE means the number exists and awaits transfer.
    insert(VirtualAccount, "PAID", Paid);
    insert(VirtualAccount, "COMPLETED", Paid);
    insert(VirtualAccount, "SETTLED", Paid);
    insert(VirtualAccount, "PENDING", Pending);
    insert(VirtualAccount, "ACTIVE", Pending);
    insert(VirtualAccount, "INACTIVE", Expired);
    insert(VirtualAccount, "EXPIRED", Expired);
    insert(VirtualAccount, "FAILED", Failed);

    // QR codes: ACTIVE until scanned, COMPLETED once a wallet pays.
    insert(Qr, "COMPLETED", Paid);
    insert(Qr, "SUCCEEDED", Paid);
    insert(Qr, "ACTIVE", Pending);
    insert(Qr, "PENDING", Pending);
    insert(Qr, "INACTIVE", Expired);
    insert(Qr, "EXPIRED", Expired);
    insert(Qr, "FAILED", Failed);

    // Card charges: AUTHORISED means captured later in the flow.
    insert(Card, "CAPTURED", Paid);
    insert(Card, "SUCCEEDED", Paid);
    insert(Card, "SETTLED", Paid);
    insert(Card, "AUTHORISED", Pending);
    insert(Card, "AUTHORIZED", Pending);
    insert(Card, "PENDING", Pending);
    insert(Card, "FAILED", Failed);
    insert(Card, "FAILED_CAPTURE", Failed);
    insert(Card, "EXPIRED", Expired);

    table
});

/// Maps a raw provider status string to the canonical vocabulary.
///
/// Lookup is case-insensitive on the raw string. Anything outside the
/// channel's table returns [`CanonicalStatus::Unknown`].
pub fn normalize_status(channel: ChannelKind, raw: &str) -> CanonicalStatus {
    let upper = raw.trim().to_ascii_uppercase();
    STATUS_TABLE
        .get(&(channel, upper.as_str()))
        .copied()
        .unwrap_or(CanonicalStatus::Unknown)
}
