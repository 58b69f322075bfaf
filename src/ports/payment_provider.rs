//! Payment provider port for external payment channel management.
//!
//! Defines the contract the reconciliation core holds against the
//! payment gateway. One trait covers the four supported channels so
//! handlers stay channel-generic.
//!
//! # Design
//!
//! - **Correlation by external_id**: every channel creation carries the
//!   ledger's correlation key so notifications can be matched back
//! - **Raw statuses pass through**: the adapter returns provider status
//!   strings untouched; normalization happens in the domain

use crate::domain::foundation::{ExternalId, Money};
use crate::domain::transaction::ChannelKind;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Port for payment provider integrations.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Create a hosted invoice page for the transaction.
    async fn create_invoice(
        &self,
        request: CreateChannelRequest,
    ) -> Result<ChannelBundle, ProviderError>;

    /// Create a bank virtual account number for the transaction.
    async fn create_virtual_account(
        &self,
        request: CreateChannelRequest,
        bank_code: &str,
    ) -> Result<ChannelBundle, ProviderError>;

    /// Create a QR code for the transaction.
    async fn create_qr(
        &self,
        request: CreateChannelRequest,
    ) -> Result<ChannelBundle, ProviderError>;

    /// Charge a previously tokenized card.
    ///
    /// The single-use token comes from the caller; raw card details
    /// never touch the engine.
    async fn charge_card(
        &self,
        request: CreateChannelRequest,
        token: &str,
    ) -> Result<ChannelBundle, ProviderError>;

    /// Fetch the current raw status of an invoice.
    async fn fetch_invoice_status(&self, invoice_id: &str) -> Result<String, ProviderError>;

    /// Fetch the current raw status of a QR code.
    async fn fetch_qr_status(&self, qr_id: &str) -> Result<String, ProviderError>;

    /// Trigger a simulated payment against a QR code.
    ///
    /// Only meaningful against the provider's sandbox; production
    /// credentials must never reach this call.
    async fn simulate_qr_payment(
        &self,
        qr_id: &str,
        amount: Money,
    ) -> Result<(), ProviderError>;
}

/// Parameters shared by every channel creation call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateChannelRequest {
    /// Ledger correlation key, echoed back in notifications.
    pub external_id: ExternalId,

    /// Amount to collect, in whole rupiah.
    pub amount: Money,

    /// Human-readable description shown to the payer.
    pub description: String,

    /// Payer email for providers that require one.
    pub payer_email: Option<String>,

    /// Where to send the payer after successful payment.
    pub success_redirect_url: Option<String>,

    /// Where to send the payer after failed or abandoned payment.
    pub failure_redirect_url: Option<String>,
}

/// Everything a channel creation call produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelBundle {
    /// Which channel was created.
    pub channel: ChannelKind,

    /// Provider-side invoice identifier, when the channel has one.
    pub invoice_id: Option<String>,

    /// Provider-side QR identifier, when the channel has one.
    pub qr_id: Option<String>,

    /// Provider-side payment or charge identifier, when known.
    pub provider_payment_id: Option<String>,

    /// What the payer must do to complete payment.
    pub instructions: PaymentInstructions,

    /// Raw provider status string at creation time.
    pub raw_status: String,

    /// Full provider response body, kept for audit.
    pub raw_response: serde_json::Value,
}

/// Channel-specific payment instructions handed to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PaymentInstructions {
    /// Redirect the payer to a hosted payment page.
    RedirectUrl { url: String },

    /// Show a virtual account number for manual bank transfer.
    VirtualAccountNumber {
        bank_code: String,
        account_number: String,
    },

    /// Render a QR code for wallet apps to scan.
    ///
    /// `is_synthetic` marks locally generated placeholder payloads that
    /// the sandbox returns instead of a scannable string.
    QrCode { payload: String, is_synthetic: bool },

    /// The card was charged immediately; nothing more to do.
    CardCharged { charge_id: String },
}

/// Errors from payment provider operations.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// Network failure or provider outage. Retryable.
    #[error("provider unavailable: {message}")]
    Unavailable { message: String },

    /// The provider understood and refused the request.
    #[error("provider rejected request: {message}")]
    Rejected {
        message: String,
        status: Option<u16>,
    },

    /// Operation not permitted with the configured credentials.
    #[error("operation not permitted: {message}")]
    NotPermitted { message: String },
}

impl ProviderError {
    /// Create an unavailability error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        ProviderError::Unavailable {
            message: message.into(),
        }
    }

    /// Create a rejection error with the HTTP status the provider sent.
    pub fn rejected(message: impl Into<String>, status: Option<u16>) -> Self {
        ProviderError::Rejected {
            message: message.into(),
            status,
        }
    }

    /// Create a credentials-mode error.
    pub fn not_permitted(message: impl Into<String>) -> Self {
        ProviderError::NotPermitted {
            message: message.into(),
        }
    }

    /// Check if this error type is typically retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ProviderError::Unavailable { .. })
    }
}

impl From<ProviderError> for crate::domain::transaction::EngineError {
    fn from(err: ProviderError) -> Self {
        crate::domain::transaction::EngineError::Provider(err.to_string())
    }
}
