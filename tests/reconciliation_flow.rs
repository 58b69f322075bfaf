//! Integration tests for the reconciliation flow.
//!
//! These tests verify the end-to-end paths:
//! 1. Checkout opens a channel and records the pending transaction
//! 2. Webhook ingestion normalizes, transitions, and grants access
//! 3. Manual verification reconciles against the provider on demand
//! 4. Racing confirmations converge on exactly one grant
//!
//! Uses the in-memory adapters so no external services are required.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use secrecy::SecretString;
use serde_json::json;

use paygate::adapters::memory::{
    InMemoryAccessRepository, InMemoryPackageReader, InMemoryTransactionRepository,
};
use paygate::application::handlers::access::{CheckAccessHandler, CheckAccessQuery, GrantAccessHandler};
use paygate::application::handlers::checkout::{
    CreateTransactionCommand, CreateTransactionHandler,
};
use paygate::application::handlers::reconcile::{
    ExpireSweepHandler, VerifyOutcome, VerifyPaymentCommand, VerifyPaymentHandler,
};
use paygate::application::handlers::webhook::{
    IngestCallbackCommand, IngestCallbackHandler, IngestOutcome,
};
use paygate::config::CheckoutConfig;
use paygate::domain::catalog::Package;
use paygate::domain::foundation::{Money, PackageId, SessionKey, Timestamp};
use paygate::domain::transaction::{ChannelKind, Transaction, TransactionStatus};
use paygate::ports::{
    ChannelBundle, CreateChannelRequest, PaymentInstructions, PaymentProvider, ProviderError,
    TransactionRepository,
};

// =============================================================================
// Test Infrastructure
// =============================================================================

const TOKEN: &str = "callback-token";

/// Payment provider stub with a scriptable invoice status.
struct StubProvider {
    invoice_status: Mutex<String>,
    fetch_calls: AtomicUsize,
}

impl StubProvider {
    fn new() -> Self {
        Self {
            invoice_status: Mutex::new("PENDING".to_string()),
            fetch_calls: AtomicUsize::new(0),
        }
    }

    fn set_invoice_status(&self, status: &str) {
        *self.invoice_status.lock().unwrap() = status.to_string();
    }

    fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentProvider for StubProvider {
    async fn create_invoice(
        &self,
        request: CreateChannelRequest,
    ) -> Result<ChannelBundle, ProviderError> {
        Ok(ChannelBundle {
            channel: ChannelKind::Invoice,
            invoice_id: Some("inv_1".to_string()),
            qr_id: None,
            provider_payment_id: None,
            instructions: PaymentInstructions::RedirectUrl {
                url: "https://checkout.example.com/inv_1".to_string(),
            },
            raw_status: "PENDING".to_string(),
            raw_response: json!({"id": "inv_1", "external_id": request.external_id.as_str()}),
        })
    }

    async fn create_virtual_account(
        &self,
        _request: CreateChannelRequest,
        _bank_code: &str,
    ) -> Result<ChannelBundle, ProviderError> {
        Err(ProviderError::unavailable("not scripted"))
    }

    async fn create_qr(
        &self,
        _request: CreateChannelRequest,
    ) -> Result<ChannelBundle, ProviderError> {
        Err(ProviderError::unavailable("not scripted"))
    }

    async fn charge_card(
        &self,
        _request: CreateChannelRequest,
        _token: &str,
    ) -> Result<ChannelBundle, ProviderError> {
        Err(ProviderError::unavailable("not scripted"))
    }

    async fn fetch_invoice_status(&self, _invoice_id: &str) -> Result<String, ProviderError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.invoice_status.lock().unwrap().clone())
    }

    async fn fetch_qr_status(&self, _qr_id: &str) -> Result<String, ProviderError> {
        Ok("ACTIVE".to_string())
    }

    async fn simulate_qr_payment(&self, _qr_id: &str, _amount: Money) -> Result<(), ProviderError> {
        Ok(())
    }
}

struct Harness {
    transactions: Arc<InMemoryTransactionRepository>,
    access: Arc<InMemoryAccessRepository>,
    provider: Arc<StubProvider>,
    package: Package,
    checkout: CreateTransactionHandler,
    ingest: IngestCallbackHandler,
    verify: VerifyPaymentHandler,
    check_access: CheckAccessHandler,
}

fn harness() -> Harness {
    let package = Package::new(
        PackageId::new(),
        "7 Day Pass",
        "One week of full access",
        Money::new(50_000).unwrap(),
        7,
    )
    .unwrap();

    let transactions = Arc::new(InMemoryTransactionRepository::new());
    let access = Arc::new(InMemoryAccessRepository::new());
    let packages = Arc::new(InMemoryPackageReader::with_packages(vec![package.clone()]));
    let provider = Arc::new(StubProvider::new());
    let grant_issuer = Arc::new(GrantAccessHandler::new(access.clone(), packages.clone()));

    let checkout = CreateTransactionHandler::new(
        transactions.clone(),
        packages.clone(),
        provider.clone(),
        grant_issuer.clone(),
        CheckoutConfig::default(),
    );
    let ingest = IngestCallbackHandler::new(
        transactions.clone(),
        grant_issuer.clone(),
        SecretString::new(TOKEN.to_string()),
        None,
    );
    let verify = VerifyPaymentHandler::new(
        transactions.clone(),
        provider.clone(),
        grant_issuer,
    );
    let check_access = CheckAccessHandler::new(access.clone());

    Harness {
        transactions,
        access,
        provider,
        package,
        checkout,
        ingest,
        verify,
        check_access,
    }
}

async fn open_invoice_transaction(h: &Harness, session: &str) -> Transaction {
    h.checkout
        .handle(CreateTransactionCommand {
            package_id: h.package.id,
            session_key: SessionKey::new(session).unwrap(),
            channel: ChannelKind::Invoice,
            bank_code: None,
            card_token: None,
            payer_email: None,
        })
        .await
        .unwrap()
        .transaction
}

fn paid_callback(txn: &Transaction) -> IngestCallbackCommand {
    let body = json!({
        "external_id": txn.external_id.as_str(),
        "status": "SETTLED",
        "payment_id": "pay_1"
    });
    IngestCallbackCommand {
        callback_token: Some(TOKEN.to_string()),
        signature: None,
        payload: serde_json::to_vec(&body).unwrap(),
    }
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn settled_webhook_pays_transaction_and_grants_access() {
    let h = harness();
    let txn = open_invoice_transaction(&h, "sess-1").await;

    let outcome = h.ingest.handle(paid_callback(&txn)).await.unwrap();
    assert!(matches!(outcome, IngestOutcome::PaidAndGranted { .. }));

    let stored = h.transactions.find_by_id(&txn.id).await.unwrap().unwrap();
    assert_eq!(stored.status, TransactionStatus::Paid);
    assert!(stored.paid_at.is_some());
    assert_eq!(stored.provider_payment_id.as_deref(), Some("pay_1"));

    let result = h
        .check_access
        .handle(CheckAccessQuery {
            session_key: SessionKey::new("sess-1").unwrap(),
        })
        .await
        .unwrap();
    assert!(result.has_access);
}

#[tokio::test]
async fn duplicate_webhook_delivery_is_idempotent() {
    let h = harness();
    let txn = open_invoice_transaction(&h, "sess-1").await;

    let first = h.ingest.handle(paid_callback(&txn)).await.unwrap();
    assert!(matches!(first, IngestOutcome::PaidAndGranted { .. }));
    let paid_at = h
        .transactions
        .find_by_id(&txn.id)
        .await
        .unwrap()
        .unwrap()
        .paid_at;

    let second = h.ingest.handle(paid_callback(&txn)).await.unwrap();
    assert!(matches!(second, IngestOutcome::Replayed));

    let stored = h.transactions.find_by_id(&txn.id).await.unwrap().unwrap();
    assert_eq!(stored.paid_at, paid_at);
    assert_eq!(h.access.all().len(), 1);
}

#[tokio::test]
async fn unknown_status_keeps_transaction_pending_with_payload_kept() {
    let h = harness();
    let txn = open_invoice_transaction(&h, "sess-1").await;

    let body = json!({
        "external_id": txn.external_id.as_str(),
        "status": "SOMETHING_NEW"
    });
    let outcome = h
        .ingest
        .handle(IngestCallbackCommand {
            callback_token: Some(TOKEN.to_string()),
            signature: None,
            payload: serde_json::to_vec(&body).unwrap(),
        })
        .await
        .unwrap();

    assert!(matches!(outcome, IngestOutcome::UnrecognizedStatus { .. }));
    let stored = h.transactions.find_by_id(&txn.id).await.unwrap().unwrap();
    assert_eq!(stored.status, TransactionStatus::Pending);
    assert!(stored.last_callback.is_some());
    assert!(h.access.all().is_empty());
}

#[tokio::test]
async fn late_paid_notification_after_expiry_is_ignored() {
    let h = harness();
    let mut txn = open_invoice_transaction(&h, "sess-1").await;

    // Push the deadline into the past, then sweep.
    txn.deadline = Timestamp::now().add_hours(-1);
    h.transactions.update(&txn).await.unwrap();
    let report = ExpireSweepHandler::new(h.transactions.clone())
        .handle()
        .await
        .unwrap();
    assert_eq!(report.expired, 1);

    let outcome = h.ingest.handle(paid_callback(&txn)).await.unwrap();
    assert!(matches!(outcome, IngestOutcome::ConflictIgnored { .. }));

    let stored = h.transactions.find_by_id(&txn.id).await.unwrap().unwrap();
    assert_eq!(stored.status, TransactionStatus::Expired);
    assert!(stored.paid_at.is_none());
    assert!(h.access.all().is_empty());
}

#[tokio::test]
async fn racing_webhook_and_verify_grant_exactly_once() {
    // Repeated to catch interleavings a single run can miss.
    for round in 0..100 {
        let h = harness();
        let txn = open_invoice_transaction(&h, "sess-1").await;
        h.provider.set_invoice_status("SETTLED");

        let (webhook_outcome, verify_outcome) = tokio::join!(
            h.ingest.handle(paid_callback(&txn)),
            h.verify.handle(VerifyPaymentCommand {
                transaction_id: txn.id,
            })
        );
        webhook_outcome.unwrap();
        verify_outcome.unwrap();

        let stored = h.transactions.find_by_id(&txn.id).await.unwrap().unwrap();
        assert_eq!(stored.status, TransactionStatus::Paid, "round {round}");
        assert_eq!(h.access.all().len(), 1, "round {round}");
    }
}

#[tokio::test]
async fn verify_short_circuits_once_paid() {
    let h = harness();
    let txn = open_invoice_transaction(&h, "sess-1").await;
    h.ingest.handle(paid_callback(&txn)).await.unwrap();

    let outcome = h
        .verify
        .handle(VerifyPaymentCommand {
            transaction_id: txn.id,
        })
        .await
        .unwrap();

    assert!(matches!(outcome, VerifyOutcome::AlreadyPaid));
    assert_eq!(h.provider.fetch_calls(), 0);
}

#[tokio::test]
async fn verify_confirms_pending_invoice_against_provider() {
    let h = harness();
    let txn = open_invoice_transaction(&h, "sess-1").await;
    h.provider.set_invoice_status("PAID");

    let outcome = h
        .verify
        .handle(VerifyPaymentCommand {
            transaction_id: txn.id,
        })
        .await
        .unwrap();

    assert!(matches!(outcome, VerifyOutcome::Confirmed { .. }));
    assert_eq!(h.provider.fetch_calls(), 1);
    assert_eq!(h.access.all().len(), 1);
}

#[tokio::test]
async fn repeat_purchase_renews_single_grant() {
    let h = harness();

    let first = open_invoice_transaction(&h, "sess-1").await;
    h.ingest.handle(paid_callback(&first)).await.unwrap();
    let granted_at = h.access.all()[0].granted_at;

    let second = open_invoice_transaction(&h, "sess-1").await;
    h.ingest.handle(paid_callback(&second)).await.unwrap();

    let grants = h.access.all();
    assert_eq!(grants.len(), 1);
    assert_eq!(grants[0].transaction_id, second.id);
    assert_eq!(grants[0].granted_at, granted_at);
}
