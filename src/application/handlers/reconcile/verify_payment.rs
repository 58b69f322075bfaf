//! VerifyPaymentHandler - pull-based reconciliation against the provider.

use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::access::UserAccess;
use crate::domain::foundation::TransactionId;
use crate::domain::transaction::{
    normalize_status, CanonicalStatus, ChannelKind, EngineError, TransactionStatus,
};
use crate::ports::{PaymentProvider, TransactionRepository};

use super::super::access::{GrantAccessCommand, GrantAccessHandler};

/// Command to verify a transaction against the provider.
#[derive(Debug, Clone)]
pub struct VerifyPaymentCommand {
    pub transaction_id: TransactionId,
}

/// Outcome of a verification attempt.
#[derive(Debug, Clone)]
pub enum VerifyOutcome {
    /// Already paid locally; the provider was not consulted.
    AlreadyPaid,

    /// The provider confirmed payment; this call won the transition.
    Confirmed { access: UserAccess },

    /// The provider still reports the payment as pending.
    StillPending { raw_status: String },

    /// The transaction is settled as failed or expired.
    FailedOrExpired { status: TransactionStatus },
}

/// Handler that reconciles a single transaction on demand.
pub struct VerifyPaymentHandler {
    transactions: Arc<dyn TransactionRepository>,
    provider: Arc<dyn PaymentProvider>,
    grant_issuer: Arc<GrantAccessHandler>,
}

impl VerifyPaymentHandler {
    pub fn new(
        transactions: Arc<dyn TransactionRepository>,
        provider: Arc<dyn PaymentProvider>,
        grant_issuer: Arc<GrantAccessHandler>,
    ) -> Self {
        Self {
            transactions,
            provider,
            grant_issuer,
        }
    }

    pub async fn handle(&self, cmd: VerifyPaymentCommand) -> Result<VerifyOutcome, EngineError> {
        let txn = self
            .transactions
            .find_by_id(&cmd.transaction_id)
            .await?
            .ok_or_else(|| EngineError::not_found(cmd.transaction_id))?;

        // Settled rows never need a provider round trip.
        match txn.status {
            TransactionStatus::Paid => return Ok(VerifyOutcome::AlreadyPaid),
            TransactionStatus::Failed | TransactionStatus::Expired => {
                return Ok(VerifyOutcome::FailedOrExpired { status: txn.status })
            }
            TransactionStatus::Pending => {}
        }

        // Pull the provider-side status for channels that support it.
        let raw_status = match (txn.channel, &txn.invoice_id, &txn.qr_id) {
            (Some(ChannelKind::Invoice), Some(invoice_id), _) => {
                self.provider.fetch_invoice_status(invoice_id).await?
            }
            (Some(ChannelKind::Qr), _, Some(qr_id)) => {
                self.provider.fetch_qr_status(qr_id).await?
            }
            // Virtual accounts and card charges are push-only; the
            // webhook is their source of truth.
            _ => {
                return Ok(VerifyOutcome::StillPending {
                    raw_status: "PENDING".to_string(),
                })
            }
        };

        let channel = txn.channel.unwrap_or(ChannelKind::Invoice);
        let target = match normalize_status(channel, &raw_status) {
            CanonicalStatus::Paid => TransactionStatus::Paid,
            CanonicalStatus::Failed => TransactionStatus::Failed,
            CanonicalStatus::Expired => TransactionStatus::Expired,
            CanonicalStatus::Pending => {
                return Ok(VerifyOutcome::StillPending { raw_status })
            }
            CanonicalStatus::Unknown => {
                warn!(
                    transaction_id = %txn.id,
                    channel = %channel,
                    raw_status = %raw_status,
                    "unrecognized provider status during verify"
                );
                return Ok(VerifyOutcome::StillPending { raw_status });
            }
        };

        let receipt = match self.transactions.transition(&txn.id, target).await {
            Ok(receipt) => receipt,
            // A racing webhook settled the row between our read and CAS.
            Err(EngineError::InvalidTransition { current, .. }) => {
                return Ok(match current {
                    TransactionStatus::Paid => VerifyOutcome::AlreadyPaid,
                    status => VerifyOutcome::FailedOrExpired { status },
                });
            }
            Err(err) => return Err(err),
        };

        if target != TransactionStatus::Paid {
            return Ok(VerifyOutcome::FailedOrExpired { status: target });
        }

        if !receipt.changed {
            return Ok(VerifyOutcome::AlreadyPaid);
        }

        info!(transaction_id = %txn.id, "payment confirmed by verification");
        let access = self
            .grant_issuer
            .handle(GrantAccessCommand {
                transaction: receipt.transaction,
            })
            .await?;
        Ok(VerifyOutcome::Confirmed { access })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{
        InMemoryAccessRepository, InMemoryPackageReader, InMemoryTransactionRepository,
    };
    use crate::domain::catalog::Package;
    use crate::domain::foundation::{Money, PackageId, SessionKey, Timestamp};
    use crate::domain::transaction::Transaction;
    use crate::ports::{ChannelBundle, CreateChannelRequest, ProviderError};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    // ════════════════════════════════════════════════════════════════════════════
    // Mock Implementations
    // ════════════════════════════════════════════════════════════════════════════

    struct MockPaymentProvider {
        invoice_status: &'static str,
        fetch_calls: AtomicUsize,
    }

    impl MockPaymentProvider {
        fn reporting(invoice_status: &'static str) -> Self {
            Self {
                invoice_status,
                fetch_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl PaymentProvider for MockPaymentProvider {
        async fn create_invoice(
            &self,
            _request: CreateChannelRequest,
        ) -> Result<ChannelBundle, ProviderError> {
            Err(ProviderError::unavailable("not used"))
        }

        async fn create_virtual_account(
            &self,
            _request: CreateChannelRequest,
            _bank_code: &str,
        ) -> Result<ChannelBundle, ProviderError> {
            Err(ProviderError::unavailable("not used"))
        }

        async fn create_qr(
            &self,
            _request: CreateChannelRequest,
        ) -> Result<ChannelBundle, ProviderError> {
            Err(ProviderError::unavailable("not used"))
        }

        async fn charge_card(
            &self,
            _request: CreateChannelRequest,
            _token: &str,
        ) -> Result<ChannelBundle, ProviderError> {
            Err(ProviderError::unavailable("not used"))
        }

        async fn fetch_invoice_status(&self, _invoice_id: &str) -> Result<String, ProviderError> {
            self.fetch_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.invoice_status.to_string())
        }

        async fn fetch_qr_status(&self, _qr_id: &str) -> Result<String, ProviderError> {
            self.fetch_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.invoice_status.to_string())
        }

        async fn simulate_qr_payment(
            &self,
            _qr_id: &str,
            _amount: Money,
        ) -> Result<(), ProviderError> {
            Ok(())
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Test Helpers
    // ════════════════════════════════════════════════════════════════════════════

    struct Fixture {
        transactions: Arc<InMemoryTransactionRepository>,
        access: Arc<InMemoryAccessRepository>,
        provider: Arc<MockPaymentProvider>,
        package: Package,
        handler: VerifyPaymentHandler,
    }

    fn fixture(invoice_status: &'static str) -> Fixture {
        let package = Package::new(
            PackageId::new(),
            "7 Day Pass",
            "",
            Money::new(50_000).unwrap(),
            7,
        )
        .unwrap();
        let transactions = Arc::new(InMemoryTransactionRepository::new());
        let access = Arc::new(InMemoryAccessRepository::new());
        let packages = Arc::new(InMemoryPackageReader::with_packages(vec![package.clone()]));
        let grant_issuer = Arc::new(GrantAccessHandler::new(access.clone(), packages));
        let provider = Arc::new(MockPaymentProvider::reporting(invoice_status));
        let handler = VerifyPaymentHandler::new(
            transactions.clone(),
            provider.clone(),
            grant_issuer,
        );
        Fixture {
            transactions,
            access,
            provider,
            package,
            handler,
        }
    }

    async fn pending_invoice_txn(f: &Fixture) -> Transaction {
        let mut txn = Transaction::create(
            f.package.id,
            SessionKey::new("sess-1").unwrap(),
            f.package.price,
            Timestamp::now().add_hours(24),
        );
        txn.attach_channel(ChannelKind::Invoice).unwrap();
        txn.invoice_id = Some("inv_123".to_string());
        f.transactions.save(&txn).await.unwrap();
        txn
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn already_paid_short_circuits_without_provider_call() {
        let f = fixture("SETTLED");
        let txn = pending_invoice_txn(&f).await;
        f.transactions
            .transition(&txn.id, TransactionStatus::Paid)
            .await
            .unwrap();

        let outcome = f
            .handler
            .handle(VerifyPaymentCommand { transaction_id: txn.id })
            .await
            .unwrap();

        assert!(matches!(outcome, VerifyOutcome::AlreadyPaid));
        assert_eq!(f.provider.fetch_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn settled_invoice_confirms_and_grants() {
        let f = fixture("SETTLED");
        let txn = pending_invoice_txn(&f).await;

        let outcome = f
            .handler
            .handle(VerifyPaymentCommand { transaction_id: txn.id })
            .await
            .unwrap();

        assert!(matches!(outcome, VerifyOutcome::Confirmed { .. }));
        let stored = f.transactions.find_by_id(&txn.id).await.unwrap().unwrap();
        assert_eq!(stored.status, TransactionStatus::Paid);
        assert_eq!(f.access.all().len(), 1);
    }

    #[tokio::test]
    async fn pending_invoice_reports_still_pending() {
        let f = fixture("PENDING");
        let txn = pending_invoice_txn(&f).await;

        let outcome = f
            .handler
            .handle(VerifyPaymentCommand { transaction_id: txn.id })
            .await
            .unwrap();

        assert!(matches!(outcome, VerifyOutcome::StillPending { .. }));
        assert!(f.access.all().is_empty());
    }

    #[tokio::test]
    async fn expired_invoice_settles_as_expired() {
        let f = fixture("EXPIRED");
        let txn = pending_invoice_txn(&f).await;

        let outcome = f
            .handler
            .handle(VerifyPaymentCommand { transaction_id: txn.id })
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            VerifyOutcome::FailedOrExpired {
                status: TransactionStatus::Expired,
            }
        ));
        assert!(f.access.all().is_empty());
    }

    #[tokio::test]
    async fn unknown_provider_status_reports_pending() {
        let f = fixture("WEIRD_STATUS");
        let txn = pending_invoice_txn(&f).await;

        let outcome = f
            .handler
            .handle(VerifyPaymentCommand { transaction_id: txn.id })
            .await
            .unwrap();

        assert!(matches!(outcome, VerifyOutcome::StillPending { .. }));
        let stored = f.transactions.find_by_id(&txn.id).await.unwrap().unwrap();
        assert_eq!(stored.status, TransactionStatus::Pending);
    }

    #[tokio::test]
    async fn virtual_account_is_push_only() {
        let f = fixture("SETTLED");
        let mut txn = Transaction::create(
            f.package.id,
            SessionKey::new("sess-1").unwrap(),
            f.package.price,
            Timestamp::now().add_hours(24),
        );
        txn.attach_channel(ChannelKind::VirtualAccount).unwrap();
        f.transactions.save(&txn).await.unwrap();

        let outcome = f
            .handler
            .handle(VerifyPaymentCommand { transaction_id: txn.id })
            .await
            .unwrap();

        assert!(matches!(outcome, VerifyOutcome::StillPending { .. }));
        assert_eq!(f.provider.fetch_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unknown_transaction_is_not_found() {
        let f = fixture("SETTLED");
        let result = f
            .handler
            .handle(VerifyPaymentCommand {
                transaction_id: TransactionId::new(),
            })
            .await;
        assert!(matches!(result, Err(EngineError::NotFound(_))));
    }
}
