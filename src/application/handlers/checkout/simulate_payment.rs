//! SimulatePaymentHandler - sandbox-only payment completion.

use std::sync::Arc;

use tracing::info;

use crate::domain::access::UserAccess;
use crate::domain::foundation::TransactionId;
use crate::domain::transaction::{ChannelKind, EngineError, TransactionStatus};
use crate::ports::{PaymentProvider, TransactionRepository};

use super::super::access::{GrantAccessCommand, GrantAccessHandler};

/// Command to simulate payment of a pending transaction.
#[derive(Debug, Clone)]
pub struct SimulatePaymentCommand {
    pub transaction_id: TransactionId,
}

/// Outcome of a simulated payment.
#[derive(Debug, Clone)]
pub enum SimulateOutcome {
    /// A sandbox QR payment was triggered; the webhook completes the flow.
    Triggered,

    /// The transaction was marked paid locally and access granted.
    MarkedPaid { access: UserAccess },

    /// The transaction was already paid.
    AlreadyPaid,
}

/// Handler for simulated payments.
///
/// Refuses to run outside test mode so a production deployment can
/// never conjure a paid transaction out of thin air.
pub struct SimulatePaymentHandler {
    transactions: Arc<dyn TransactionRepository>,
    provider: Arc<dyn PaymentProvider>,
    grant_issuer: Arc<GrantAccessHandler>,
    test_mode: bool,
}

impl SimulatePaymentHandler {
    pub fn new(
        transactions: Arc<dyn TransactionRepository>,
        provider: Arc<dyn PaymentProvider>,
        grant_issuer: Arc<GrantAccessHandler>,
        test_mode: bool,
    ) -> Self {
        Self {
            transactions,
            provider,
            grant_issuer,
            test_mode,
        }
    }

    pub async fn handle(
        &self,
        cmd: SimulatePaymentCommand,
    ) -> Result<SimulateOutcome, EngineError> {
        if !self.test_mode {
            return Err(EngineError::NotPermitted(
                "payment simulation requires sandbox credentials".to_string(),
            ));
        }

        let txn = self
            .transactions
            .find_by_id(&cmd.transaction_id)
            .await?
            .ok_or_else(|| EngineError::not_found(cmd.transaction_id))?;

        if txn.status == TransactionStatus::Paid {
            return Ok(SimulateOutcome::AlreadyPaid);
        }

        // A QR channel can be simulated provider-side; the resulting
        // callback then drives the normal webhook path.
        if txn.channel == Some(ChannelKind::Qr) {
            if let Some(qr_id) = &txn.qr_id {
                self.provider.simulate_qr_payment(qr_id, txn.amount).await?;
                info!(transaction_id = %txn.id, qr_id, "sandbox QR payment triggered");
                return Ok(SimulateOutcome::Triggered);
            }
        }

        // Other channels settle locally through the same CAS + grant path.
        let receipt = self
            .transactions
            .transition(&txn.id, TransactionStatus::Paid)
            .await?;

        if !receipt.changed {
            return Ok(SimulateOutcome::AlreadyPaid);
        }

        let access = self
            .grant_issuer
            .handle(GrantAccessCommand {
                transaction: receipt.transaction,
            })
            .await?;

        info!(transaction_id = %txn.id, "payment simulated");
        Ok(SimulateOutcome::MarkedPaid { access })
    }
}
