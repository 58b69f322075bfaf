//! HTTP handlers for the paywall API.
//!
//! These handlers connect axum routes to application layer command and
//! query handlers.

use std::sync::Arc;

use axum::extract::{Json, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use secrecy::SecretString;
use uuid::Uuid;

use crate::application::handlers::access::{
    CheckAccessHandler, CheckAccessQuery, GrantAccessHandler,
};
use crate::application::handlers::checkout::{
    CreateTransactionCommand, CreateTransactionHandler, SimulateOutcome, SimulatePaymentCommand,
    SimulatePaymentHandler,
};
use crate::application::handlers::reconcile::{
    VerifyOutcome, VerifyPaymentCommand, VerifyPaymentHandler,
};
use crate::application::handlers::webhook::{
    IngestCallbackCommand, IngestCallbackHandler, IngestOutcome, WebhookError,
};
use crate::config::AppConfig;
use crate::domain::foundation::{PackageId, SessionKey, TransactionId};
use crate::domain::transaction::{EngineError, TransactionStatus};
use crate::ports::{AccessRepository, PackageReader, PaymentProvider, TransactionRepository};

use super::dto::{
    AccessCheckResponse, AccessResponse, CreateTransactionRequest, CreateTransactionResponse,
    ErrorResponse, PackageResponse, SimulateResponse, TransactionResponse, VerifyResponse,
    WebhookAck,
};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared application state containing all dependencies.
///
/// Cloned per request; everything inside is Arc-wrapped or cheap.
#[derive(Clone)]
pub struct PaywallAppState {
    pub transactions: Arc<dyn TransactionRepository>,
    pub access: Arc<dyn AccessRepository>,
    pub packages: Arc<dyn PackageReader>,
    pub provider: Arc<dyn PaymentProvider>,
    checkout: crate::config::CheckoutConfig,
    callback_token: SecretString,
    signing_key: Option<SecretString>,
    test_mode: bool,
}

impl PaywallAppState {
    pub fn new(
        transactions: Arc<dyn TransactionRepository>,
        access: Arc<dyn AccessRepository>,
        packages: Arc<dyn PackageReader>,
        provider: Arc<dyn PaymentProvider>,
        config: &AppConfig,
    ) -> Self {
        Self {
            transactions,
            access,
            packages,
            provider,
            checkout: config.checkout.clone(),
            callback_token: SecretString::new(config.provider.callback_token.clone()),
            signing_key: config
                .provider
                .webhook_signing_key
                .clone()
                .map(SecretString::new),
            test_mode: config.provider.is_test_mode(),
        }
    }

    /// Create handlers on demand from the shared state.
    fn grant_issuer(&self) -> Arc<GrantAccessHandler> {
        Arc::new(GrantAccessHandler::new(
            self.access.clone(),
            self.packages.clone(),
        ))
    }

    fn create_transaction_handler(&self) -> CreateTransactionHandler {
        CreateTransactionHandler::new(
            self.transactions.clone(),
            self.packages.clone(),
            self.provider.clone(),
            self.grant_issuer(),
            self.checkout.clone(),
        )
    }

    fn verify_payment_handler(&self) -> VerifyPaymentHandler {
        VerifyPaymentHandler::new(
            self.transactions.clone(),
            self.provider.clone(),
            self.grant_issuer(),
        )
    }

    fn simulate_payment_handler(&self) -> SimulatePaymentHandler {
        SimulatePaymentHandler::new(
            self.transactions.clone(),
            self.provider.clone(),
            self.grant_issuer(),
            self.test_mode,
        )
    }

    fn ingest_callback_handler(&self) -> IngestCallbackHandler {
        IngestCallbackHandler::new(
            self.transactions.clone(),
            self.grant_issuer(),
            self.callback_token.clone(),
            self.signing_key.clone(),
        )
    }

    fn check_access_handler(&self) -> CheckAccessHandler {
        CheckAccessHandler::new(self.access.clone())
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Session Identity
// ════════════════════════════════════════════════════════════════════════════════

/// Visitor session identity extracted from the X-Session-Key header.
///
/// Session issuance itself belongs to the web layer; this API only
/// requires that a key is present.
#[derive(Debug, Clone)]
pub struct SessionIdentity {
    pub session_key: SessionKey,
}

/// Rejection type for SessionIdentity extraction.
pub struct SessionKeyRequired;

impl IntoResponse for SessionKeyRequired {
    fn into_response(self) -> axum::response::Response {
        let error = ErrorResponse::new("SESSION_KEY_REQUIRED", "X-Session-Key header is required");
        (StatusCode::UNAUTHORIZED, Json(error)).into_response()
    }
}

#[async_trait::async_trait]
impl<S> axum::extract::FromRequestParts<S> for SessionIdentity
where
    S: Send + Sync,
{
    type Rejection = SessionKeyRequired;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        let session_key = parts
            .headers
            .get("X-Session-Key")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| SessionKey::new(s).ok())
            .ok_or(SessionKeyRequired)?;

        Ok(SessionIdentity { session_key })
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Handlers
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/transactions - create a transaction and open a channel
pub async fn create_transaction(
    State(state): State<PaywallAppState>,
    session: SessionIdentity,
    Json(request): Json<CreateTransactionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let handler = state.create_transaction_handler();
    let cmd = CreateTransactionCommand {
        package_id: PackageId::from_uuid(request.package_id),
        session_key: session.session_key,
        channel: request.channel,
        bank_code: request.bank_code,
        card_token: request.card_token,
        payer_email: request.payer_email,
    };

    let result = handler.handle(cmd).await?;

    let response = CreateTransactionResponse {
        transaction: TransactionResponse::from(result.transaction),
        instructions: result.instructions,
        access: result.access.map(AccessResponse::from),
    };

    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /api/transactions/:id - status poll
pub async fn get_transaction(
    State(state): State<PaywallAppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let id = TransactionId::from_uuid(id);
    let txn = state
        .transactions
        .find_by_id(&id)
        .await?
        .ok_or_else(|| EngineError::not_found(id))?;

    Ok(Json(TransactionResponse::from(txn)))
}

/// POST /api/transactions/:id/verify - manual reconciliation
pub async fn verify_transaction(
    State(state): State<PaywallAppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let handler = state.verify_payment_handler();
    let outcome = handler
        .handle(VerifyPaymentCommand {
            transaction_id: TransactionId::from_uuid(id),
        })
        .await?;

    let response = match outcome {
        VerifyOutcome::AlreadyPaid => VerifyResponse {
            outcome: "already_paid",
            status: TransactionStatus::Paid,
            raw_status: None,
            access: None,
        },
        VerifyOutcome::Confirmed { access } => VerifyResponse {
            outcome: "confirmed",
            status: TransactionStatus::Paid,
            raw_status: None,
            access: Some(AccessResponse::from(access)),
        },
        VerifyOutcome::StillPending { raw_status } => VerifyResponse {
            outcome: "still_pending",
            status: TransactionStatus::Pending,
            raw_status: Some(raw_status),
            access: None,
        },
        VerifyOutcome::FailedOrExpired { status } => VerifyResponse {
            outcome: "failed_or_expired",
            status,
            raw_status: None,
            access: None,
        },
    };

    Ok(Json(response))
}

/// POST /api/transactions/:id/simulate - test mode only
pub async fn simulate_transaction(
    State(state): State<PaywallAppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let handler = state.simulate_payment_handler();
    let outcome = handler
        .handle(SimulatePaymentCommand {
            transaction_id: TransactionId::from_uuid(id),
        })
        .await?;

    let response = match outcome {
        SimulateOutcome::Triggered => SimulateResponse {
            outcome: "triggered",
            access: None,
        },
        SimulateOutcome::MarkedPaid { access } => SimulateResponse {
            outcome: "marked_paid",
            access: Some(AccessResponse::from(access)),
        },
        SimulateOutcome::AlreadyPaid => SimulateResponse {
            outcome: "already_paid",
            access: None,
        },
    };

    Ok(Json(response))
}

/// GET /api/access - check access for the session key header
pub async fn check_access(
    State(state): State<PaywallAppState>,
    session: SessionIdentity,
) -> Result<impl IntoResponse, ApiError> {
    let handler = state.check_access_handler();
    let result = handler
        .handle(CheckAccessQuery {
            session_key: session.session_key,
        })
        .await?;

    let response = AccessCheckResponse {
        has_access: result.has_access,
        access: result.access.map(AccessResponse::from),
    };

    Ok(Json(response))
}

/// GET /api/packages - list active packages
pub async fn list_packages(
    State(state): State<PaywallAppState>,
) -> Result<impl IntoResponse, ApiError> {
    let packages = state.packages.list_active().await?;
    let response: Vec<PackageResponse> = packages.into_iter().map(PackageResponse::from).collect();
    Ok(Json(response))
}

/// POST /api/webhooks/xendit - provider payment notifications
///
/// Every processed notification acknowledges with 200, including
/// replays and late notifications against settled transactions, so the
/// provider stops redelivering.
pub async fn xendit_webhook(
    State(state): State<PaywallAppState>,
    headers: axum::http::HeaderMap,
    body: axum::body::Bytes,
) -> Result<impl IntoResponse, WebhookApiError> {
    let callback_token = headers
        .get("x-callback-token")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let signature = headers
        .get("x-callback-signature")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let handler = state.ingest_callback_handler();
    let outcome = handler
        .handle(IngestCallbackCommand {
            callback_token,
            signature,
            payload: body.to_vec(),
        })
        .await?;

    let ack = WebhookAck {
        outcome: match outcome {
            IngestOutcome::PaidAndGranted { .. } => "paid",
            IngestOutcome::TransitionApplied { .. } => "applied",
            IngestOutcome::Replayed => "replayed",
            IngestOutcome::StillPending => "pending",
            IngestOutcome::UnrecognizedStatus { .. } => "unrecognized_status",
            IngestOutcome::ConflictIgnored { .. } => "ignored",
        },
    };

    Ok((StatusCode::OK, Json(ack)))
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts engine errors to HTTP responses.
pub struct ApiError(EngineError);

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_code) = match &self.0 {
            EngineError::InvalidPackage => (StatusCode::BAD_REQUEST, "INVALID_PACKAGE"),
            EngineError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_FAILED"),
            EngineError::NotFound(_) => (StatusCode::NOT_FOUND, "TRANSACTION_NOT_FOUND"),
            EngineError::NotPermitted(_) => (StatusCode::FORBIDDEN, "NOT_PERMITTED"),
            EngineError::InvalidTransition { .. } => (StatusCode::CONFLICT, "INVALID_TRANSITION"),
            EngineError::UnknownProviderStatus { .. } => {
                (StatusCode::BAD_GATEWAY, "UNRECOGNIZED_PROVIDER_STATUS")
            }
            EngineError::Provider(_) => (StatusCode::BAD_GATEWAY, "PROVIDER_ERROR"),
            EngineError::Infrastructure(_) => {
                tracing::error!(error = %self.0, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        };

        let body = ErrorResponse::new(error_code, self.0.to_string());
        (status, Json(body)).into_response()
    }
}

/// Webhook error type with provider-facing status codes.
pub struct WebhookApiError(WebhookError);

impl From<WebhookError> for WebhookApiError {
    fn from(err: WebhookError) -> Self {
        Self(err)
    }
}

impl IntoResponse for WebhookApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_code) = match &self.0 {
            WebhookError::Unauthorized => (StatusCode::BAD_REQUEST, "CALLBACK_UNAUTHENTICATED"),
            WebhookError::MalformedPayload(_) => (StatusCode::BAD_REQUEST, "MALFORMED_CALLBACK"),
            WebhookError::UnknownTransaction(_) => {
                (StatusCode::NOT_FOUND, "UNKNOWN_TRANSACTION")
            }
            WebhookError::Engine(_) => {
                tracing::error!(error = %self.0, "webhook processing failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        };

        let body = ErrorResponse::new(error_code, self.0.to_string());
        (status, Json(body)).into_response()
    }
}
