//! CreateTransactionHandler - opens a transaction and its payment channel.

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::CheckoutConfig;
use crate::domain::access::UserAccess;
use crate::domain::foundation::{PackageId, SessionKey, Timestamp, ValidationError};
use crate::domain::transaction::{
    normalize_status, CanonicalStatus, ChannelKind, EngineError, Transaction, TransactionStatus,
};
use crate::ports::{
    CreateChannelRequest, PaymentInstructions, PaymentProvider, PackageReader,
    TransactionRepository,
};

use super::super::access::{GrantAccessCommand, GrantAccessHandler};

/// Command to create a transaction and open a payment channel.
#[derive(Debug, Clone)]
pub struct CreateTransactionCommand {
    pub package_id: PackageId,
    pub session_key: SessionKey,
    pub channel: ChannelKind,

    /// Bank code, required for the virtual account channel.
    pub bank_code: Option<String>,

    /// Single-use card token, required for the card channel.
    pub card_token: Option<String>,

    /// Payer email forwarded to the provider when present.
    pub payer_email: Option<String>,
}

/// Result of transaction creation.
#[derive(Debug, Clone)]
pub struct CreateTransactionResult {
    pub transaction: Transaction,
    pub instructions: PaymentInstructions,

    /// Set when the channel settled immediately (card capture).
    pub access: Option<UserAccess>,
}

/// Handler that creates the ledger row, opens the channel, and handles
/// immediate settlement.
pub struct CreateTransactionHandler {
    transactions: Arc<dyn TransactionRepository>,
    packages: Arc<dyn PackageReader>,
    provider: Arc<dyn PaymentProvider>,
    grant_issuer: Arc<GrantAccessHandler>,
    checkout: CheckoutConfig,
}

impl CreateTransactionHandler {
    pub fn new(
        transactions: Arc<dyn TransactionRepository>,
        packages: Arc<dyn PackageReader>,
        provider: Arc<dyn PaymentProvider>,
        grant_issuer: Arc<GrantAccessHandler>,
        checkout: CheckoutConfig,
    ) -> Self {
        Self {
            transactions,
            packages,
            provider,
            grant_issuer,
            checkout,
        }
    }

    pub async fn handle(
        &self,
        cmd: CreateTransactionCommand,
    ) -> Result<CreateTransactionResult, EngineError> {
        // 1. Resolve and gate the package
        let package = self
            .packages
            .find_by_id(&cmd.package_id)
            .await?
            .filter(|p| p.is_purchasable())
            .ok_or(EngineError::InvalidPackage)?;

        // 2. Create the ledger row before touching the provider
        let deadline =
            Timestamp::now().add_hours(i64::from(self.checkout.payment_deadline_hours));
        let mut txn = Transaction::create(
            package.id,
            cmd.session_key.clone(),
            package.price,
            deadline,
        );
        self.transactions.save(&txn).await?;

        // 3. Open the payment channel
        let request = CreateChannelRequest {
            external_id: txn.external_id.clone(),
            amount: txn.amount,
            description: package.name.clone(),
            payer_email: cmd.payer_email.clone(),
            success_redirect_url: self.checkout.success_redirect_url.clone(),
            failure_redirect_url: self.checkout.failure_redirect_url.clone(),
        };

        let bundle = match cmd.channel {
            ChannelKind::Invoice => self.provider.create_invoice(request).await,
            ChannelKind::VirtualAccount => {
                let bank_code = cmd
                    .bank_code
                    .as_deref()
                    .ok_or_else(|| ValidationError::empty_field("bank_code"))?;
                self.provider.create_virtual_account(request, bank_code).await
            }
            ChannelKind::Qr => self.provider.create_qr(request).await,
            ChannelKind::Card => {
                let token = cmd
                    .card_token
                    .as_deref()
                    .ok_or_else(|| ValidationError::empty_field("card_token"))?;
                self.provider.charge_card(request, token).await
            }
        };

        let bundle = match bundle {
            Ok(bundle) => bundle,
            Err(err) => {
                // Row stays Pending; the expiry sweep collects it later.
                warn!(
                    transaction_id = %txn.id,
                    channel = %cmd.channel,
                    error = %err,
                    "channel creation failed"
                );
                return Err(err.into());
            }
        };

        // 4. Record the channel on the transaction
        txn.attach_channel(cmd.channel)?;
        txn.invoice_id = bundle.invoice_id.clone();
        txn.qr_id = bundle.qr_id.clone();
        txn.provider_payment_id = bundle.provider_payment_id.clone();
        if let PaymentInstructions::RedirectUrl { url } = &bundle.instructions {
            txn.payment_url = Some(url.clone());
        }
        txn.record_channel_response(bundle.raw_response.clone());
        self.transactions.update(&txn).await?;

        info!(
            transaction_id = %txn.id,
            external_id = %txn.external_id,
            channel = %cmd.channel,
            amount = %txn.amount,
            "transaction created"
        );

        // 5. Card charges can settle synchronously
        let mut access = None;
        if normalize_status(cmd.channel, &bundle.raw_status) == CanonicalStatus::Paid {
            let receipt = self
                .transactions
                .transition(&txn.id, TransactionStatus::Paid)
                .await?;
            txn = receipt.transaction.clone();
            if receipt.changed {
                access = Some(
                    self.grant_issuer
                        .handle(GrantAccessCommand {
                            transaction: receipt.transaction,
                        })
                        .await?,
                );
            }
        }

        Ok(CreateTransactionResult {
            transaction: txn,
            instructions: bundle.instructions,
            access,
        })
    }
}
