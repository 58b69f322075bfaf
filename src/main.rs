//! Paygate server binary.
//!
//! Wires configuration, Postgres, the Xendit adapter, and the HTTP API
//! together, and runs the background expiry sweep.

use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderValue;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use paygate::adapters::http::PaywallAppState;
use paygate::adapters::postgres::{
    self, PostgresAccessRepository, PostgresPackageReader, PostgresTransactionRepository,
};
use paygate::adapters::xendit::XenditAdapter;
use paygate::application::handlers::reconcile::ExpireSweepHandler;
use paygate::config::{AppConfig, ServerConfig};
use paygate::ports::TransactionRepository;

/// How often the expiry sweep scans for overdue pending transactions.
const SWEEP_INTERVAL: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;
    init_tracing(&config);

    info!(
        environment = ?config.server.environment,
        credential_mode = if config.provider.is_test_mode() {
            "development"
        } else {
            "production"
        },
        "starting paygate"
    );

    let pool = postgres::connect(&config.database).await?;
    if config.database.run_migrations {
        sqlx::migrate!().run(&pool).await?;
        info!("migrations applied");
    }

    let transactions: Arc<dyn TransactionRepository> =
        Arc::new(PostgresTransactionRepository::new(pool.clone()));
    let access = Arc::new(PostgresAccessRepository::new(pool.clone()));
    let packages = Arc::new(PostgresPackageReader::new(pool));
    let provider = Arc::new(XenditAdapter::new(
        &config.provider,
        config.checkout.payment_deadline_hours,
    ));

    spawn_expiry_sweep(transactions.clone());

    let state = PaywallAppState::new(transactions, access, packages, provider, &config);
    let app = paygate::adapters::http::api_router()
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(cors_layer(&config.server))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));

    let addr = config.server.socket_addr()?;
    info!(%addr, "listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.server.log_level));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if config.server.is_production() {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins_list()
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    if origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

fn spawn_expiry_sweep(transactions: Arc<dyn TransactionRepository>) {
    tokio::spawn(async move {
        let handler = ExpireSweepHandler::new(transactions);
        let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            ticker.tick().await;
            if let Err(err) = handler.handle().await {
                warn!(error = %err, "expiry sweep failed");
            }
        }
    });
}
