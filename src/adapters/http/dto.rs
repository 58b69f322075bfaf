//! HTTP DTOs for the paywall API.
//!
//! These types define the JSON request/response structure and form the
//! boundary between HTTP and the application layer.

use crate::domain::access::UserAccess;
use crate::domain::catalog::Package;
use crate::domain::transaction::{ChannelKind, Transaction, TransactionStatus};
use crate::ports::PaymentInstructions;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Request to create a transaction and open a payment channel.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTransactionRequest {
    /// Package being purchased.
    pub package_id: Uuid,

    /// Payment channel to open.
    pub channel: ChannelKind,

    /// Bank code, required for the virtual_account channel.
    #[serde(default)]
    pub bank_code: Option<String>,

    /// Single-use card token, required for the card channel.
    #[serde(default)]
    pub card_token: Option<String>,

    /// Payer email forwarded to the provider.
    #[serde(default)]
    pub payer_email: Option<String>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Transaction details for API responses.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionResponse {
    pub id: String,
    pub external_id: String,
    pub package_id: String,
    pub amount: i64,
    pub channel: Option<ChannelKind>,
    pub status: TransactionStatus,
    pub payment_url: Option<String>,
    /// When payment was confirmed (ISO 8601).
    pub paid_at: Option<String>,
    /// Payment deadline (ISO 8601).
    pub deadline: String,
    pub created_at: String,
}

impl From<Transaction> for TransactionResponse {
    fn from(txn: Transaction) -> Self {
        Self {
            id: txn.id.to_string(),
            external_id: txn.external_id.to_string(),
            package_id: txn.package_id.to_string(),
            amount: txn.amount.as_rupiah(),
            channel: txn.channel,
            status: txn.status,
            payment_url: txn.payment_url,
            paid_at: txn.paid_at.map(|t| t.as_datetime().to_rfc3339()),
            deadline: txn.deadline.as_datetime().to_rfc3339(),
            created_at: txn.created_at.as_datetime().to_rfc3339(),
        }
    }
}

/// Access grant details for API responses.
#[derive(Debug, Clone, Serialize)]
pub struct AccessResponse {
    pub package_id: String,
    pub transaction_id: String,
    pub granted_at: String,
    pub expires_at: String,
    pub is_active: bool,
}

impl From<UserAccess> for AccessResponse {
    fn from(access: UserAccess) -> Self {
        Self {
            package_id: access.package_id.to_string(),
            transaction_id: access.transaction_id.to_string(),
            granted_at: access.granted_at.as_datetime().to_rfc3339(),
            expires_at: access.expires_at.as_datetime().to_rfc3339(),
            is_active: access.is_active,
        }
    }
}

/// Response for transaction creation.
#[derive(Debug, Clone, Serialize)]
pub struct CreateTransactionResponse {
    pub transaction: TransactionResponse,
    pub instructions: PaymentInstructions,
    /// Set when the channel settled immediately.
    pub access: Option<AccessResponse>,
}

/// Response for manual verification.
#[derive(Debug, Clone, Serialize)]
pub struct VerifyResponse {
    pub outcome: &'static str,
    pub status: TransactionStatus,
    /// Raw provider status when the payment is still pending.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access: Option<AccessResponse>,
}

/// Response for simulated payment.
#[derive(Debug, Clone, Serialize)]
pub struct SimulateResponse {
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access: Option<AccessResponse>,
}

/// Response for an access check.
#[derive(Debug, Clone, Serialize)]
pub struct AccessCheckResponse {
    pub has_access: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access: Option<AccessResponse>,
}

/// Package details for the catalog listing.
#[derive(Debug, Clone, Serialize)]
pub struct PackageResponse {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: i64,
    pub duration_days: u32,
}

impl From<Package> for PackageResponse {
    fn from(package: Package) -> Self {
        Self {
            id: package.id.to_string(),
            name: package.name,
            description: package.description,
            price: package.price.as_rupiah(),
            duration_days: package.duration_days,
        }
    }
}

/// Acknowledgement body for processed webhooks.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookAck {
    pub outcome: &'static str,
}

/// Standard error response body.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{Money, PackageId, SessionKey, Timestamp};

    #[test]
    fn transaction_response_carries_status_and_amount() {
        let txn = Transaction::create(
            PackageId::new(),
            SessionKey::new("sess-1").unwrap(),
            Money::new(50_000).unwrap(),
            Timestamp::now().add_hours(24),
        );
        let response = TransactionResponse::from(txn.clone());

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "pending");
        assert_eq!(json["amount"], 50_000);
        assert_eq!(json["external_id"], txn.external_id.to_string());
        assert!(json["paid_at"].is_null());
    }

    #[test]
    fn create_request_accepts_minimal_body() {
        let body = r#"{"package_id": "550e8400-e29b-41d4-a716-446655440000", "channel": "invoice"}"#;
        let request: CreateTransactionRequest = serde_json::from_str(body).unwrap();
        assert_eq!(request.channel, ChannelKind::Invoice);
        assert!(request.bank_code.is_none());
    }

    #[test]
    fn verify_response_omits_empty_fields() {
        let response = VerifyResponse {
            outcome: "already_paid",
            status: TransactionStatus::Paid,
            raw_status: None,
            access: None,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("raw_status").is_none());
        assert!(json.get("access").is_none());
    }
}
