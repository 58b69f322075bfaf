//! Axum router configuration for the paywall API.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{
    check_access, create_transaction, get_transaction, list_packages, simulate_transaction,
    verify_transaction, xendit_webhook, PaywallAppState,
};

/// Create the paywall API router.
///
/// # Routes
///
/// ## Checkout and reconciliation
/// - `POST /transactions` - Create a transaction and open a payment channel
/// - `GET /transactions/:id` - Poll transaction status
/// - `POST /transactions/:id/verify` - Manual reconciliation against the provider
/// - `POST /transactions/:id/simulate` - Simulate payment (test mode only)
///
/// ## Access and catalog
/// - `GET /access` - Check access for the session key header
/// - `GET /packages` - List active packages
pub fn paywall_routes() -> Router<PaywallAppState> {
    Router::new()
        .route("/transactions", post(create_transaction))
        .route("/transactions/:id", get(get_transaction))
        .route("/transactions/:id/verify", post(verify_transaction))
        .route("/transactions/:id/simulate", post(simulate_transaction))
        .route("/access", get(check_access))
        .route("/packages", get(list_packages))
}

/// Create the provider webhook router.
///
/// Separate from the main routes because webhooks carry no session;
/// they authenticate with the callback token and optional signature.
///
/// # Routes
/// - `POST /xendit` - Handle Xendit payment notifications
pub fn webhook_routes() -> Router<PaywallAppState> {
    Router::new().route("/xendit", post(xendit_webhook))
}

/// Create the complete API router, mounted at the server root.
pub fn api_router() -> Router<PaywallAppState> {
    Router::new()
        .nest("/api", paywall_routes())
        .nest("/api/webhooks", webhook_routes())
}
