//! IngestCallbackHandler - normalizes and applies provider notifications.
//!
//! Processing order: authenticate, parse, resolve, persist the raw
//! payload, normalize, transition, grant. Identical redelivery produces
//! the same outcome with no duplicate grant.

use std::sync::Arc;

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;
use tracing::{info, warn};

use crate::domain::access::UserAccess;
use crate::domain::transaction::{
    normalize_status, CanonicalStatus, ChannelKind, EngineError, TransactionStatus,
};
use crate::ports::TransactionRepository;

use super::super::access::{GrantAccessCommand, GrantAccessHandler};

type HmacSha256 = Hmac<Sha256>;

/// Command carrying one inbound provider notification.
#[derive(Debug, Clone)]
pub struct IngestCallbackCommand {
    /// Value of the x-callback-token header, if present.
    pub callback_token: Option<String>,

    /// Hex HMAC-SHA256 signature of the body, if present.
    pub signature: Option<String>,

    /// Raw request body.
    pub payload: Vec<u8>,
}

/// Outcome of processing a notification. All variants acknowledge.
#[derive(Debug, Clone)]
pub enum IngestOutcome {
    /// The notification won the Pending->Paid transition; access granted.
    PaidAndGranted { access: UserAccess },

    /// A non-paid terminal transition was applied.
    TransitionApplied { status: TransactionStatus },

    /// Redelivery of a status the transaction already holds.
    Replayed,

    /// The provider still reports the transaction as pending.
    StillPending,

    /// Status outside the channel vocabulary; transaction untouched.
    UnrecognizedStatus { raw: String },

    /// Late notification against a settled transaction; ignored.
    ConflictIgnored {
        current: TransactionStatus,
        target: TransactionStatus,
    },
}

/// Errors that reject a notification.
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("callback authentication failed")]
    Unauthorized,

    #[error("malformed callback payload: {0}")]
    MalformedPayload(String),

    #[error("no transaction for external id {0}")]
    UnknownTransaction(String),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Handler for inbound provider notifications.
pub struct IngestCallbackHandler {
    transactions: Arc<dyn TransactionRepository>,
    grant_issuer: Arc<GrantAccessHandler>,
    callback_token: SecretString,
    signing_key: Option<SecretString>,
}

impl IngestCallbackHandler {
    pub fn new(
        transactions: Arc<dyn TransactionRepository>,
        grant_issuer: Arc<GrantAccessHandler>,
        callback_token: SecretString,
        signing_key: Option<SecretString>,
    ) -> Self {
        Self {
            transactions,
            grant_issuer,
            callback_token,
            signing_key,
        }
    }

    pub async fn handle(
        &self,
        cmd: IngestCallbackCommand,
    ) -> Result<IngestOutcome, WebhookError> {
        // 1. Authenticate before reading anything else
        self.authenticate(&cmd)?;

        // 2. Parse
        let payload: serde_json::Value = serde_json::from_slice(&cmd.payload)
            .map_err(|e| WebhookError::MalformedPayload(e.to_string()))?;

        let external_id = extract_str(&payload, "external_id")
            .or_else(|| extract_str(&payload, "reference_id"))
            .ok_or_else(|| WebhookError::MalformedPayload("missing external_id".to_string()))?;
        let raw_status = extract_str(&payload, "status")
            .ok_or_else(|| WebhookError::MalformedPayload("missing status".to_string()))?;

        // 3. Resolve the transaction
        let parsed_external_id = crate::domain::foundation::ExternalId::new(external_id.clone())
            .map_err(|e| WebhookError::MalformedPayload(e.to_string()))?;
        let mut txn = self
            .transactions
            .find_by_external_id(&parsed_external_id)
            .await?
            .ok_or(WebhookError::UnknownTransaction(external_id))?;

        // 4. Persist the raw payload regardless of what happens next
        txn.record_callback(payload.clone());
        if txn.provider_payment_id.is_none() {
            txn.provider_payment_id = extract_str(&payload, "payment_id");
        }
        self.transactions.update(&txn).await?;

        // 5. Normalize per attached channel
        let channel = txn.channel.unwrap_or(ChannelKind::Invoice);
        let target = match normalize_status(channel, &raw_status) {
            CanonicalStatus::Paid => TransactionStatus::Paid,
            CanonicalStatus::Failed => TransactionStatus::Failed,
            CanonicalStatus::Expired => TransactionStatus::Expired,
            CanonicalStatus::Pending => return Ok(IngestOutcome::StillPending),
            CanonicalStatus::Unknown => {
                warn!(
                    transaction_id = %txn.id,
                    channel = %channel,
                    raw_status = %raw_status,
                    "unrecognized provider status, transaction left pending"
                );
                return Ok(IngestOutcome::UnrecognizedStatus { raw: raw_status });
            }
        };

        // 6. Transition and grant
        let receipt = match self.transactions.transition(&txn.id, target).await {
            Ok(receipt) => receipt,
            Err(EngineError::InvalidTransition { current, target }) => {
                warn!(
                    transaction_id = %txn.id,
                    current = %current,
                    target = %target,
                    "late notification against settled transaction ignored"
                );
                return Ok(IngestOutcome::ConflictIgnored { current, target });
            }
            Err(err) => return Err(err.into()),
        };

        if !receipt.changed {
            // A Paid redelivery re-asserts the grant. The issuer is
            // idempotent per transaction, so this only matters when the
            // process died between the transition and the grant.
            if target == TransactionStatus::Paid {
                self.grant_issuer
                    .handle(GrantAccessCommand {
                        transaction: receipt.transaction,
                    })
                    .await?;
            }
            return Ok(IngestOutcome::Replayed);
        }

        info!(
            transaction_id = %receipt.transaction.id,
            status = %target,
            "notification applied"
        );

        if target == TransactionStatus::Paid {
            let access = self
                .grant_issuer
                .handle(GrantAccessCommand {
                    transaction: receipt.transaction,
                })
                .await?;
            return Ok(IngestOutcome::PaidAndGranted { access });
        }

        Ok(IngestOutcome::TransitionApplied { status: target })
    }

    fn authenticate(&self, cmd: &IngestCallbackCommand) -> Result<(), WebhookError> {
        let token = cmd.callback_token.as_deref().unwrap_or("");
        let expected = self.callback_token.expose_secret();
        if token.as_bytes().ct_eq(expected.as_bytes()).unwrap_u8() != 1 {
            return Err(WebhookError::Unauthorized);
        }

        // Body signature is checked only when a signing key is configured.
        if let Some(key) = &self.signing_key {
            let signature = cmd.signature.as_deref().ok_or(WebhookError::Unauthorized)?;
            let mut mac = HmacSha256::new_from_slice(key.expose_secret().as_bytes())
                .map_err(|_| WebhookError::Unauthorized)?;
            mac.update(&cmd.payload);
            let computed: String = mac
                .finalize()
                .into_bytes()
                .iter()
                .map(|b| format!("{b:02x}"))
                .collect();
            let provided = signature.to_ascii_lowercase();
            if computed.as_bytes().ct_eq(provided.as_bytes()).unwrap_u8() != 1 {
                return Err(WebhookError::Unauthorized);
            }
        }

        Ok(())
    }
}

/// Looks up a string field at the top level or under `data`.
fn extract_str(payload: &serde_json::Value, field: &str) -> Option<String> {
    payload
        .get(field)
        .or_else(|| payload.get("data").and_then(|d| d.get(field)))
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}
