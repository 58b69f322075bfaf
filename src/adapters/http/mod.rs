//! HTTP adapter - REST API over the application handlers.

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::PaywallAppState;
pub use routes::api_router;
