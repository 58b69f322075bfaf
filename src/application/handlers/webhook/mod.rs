//! Webhook ingestion handlers.

mod ingest_callback;

pub use ingest_callback::{
    IngestCallbackCommand, IngestCallbackHandler, IngestOutcome, WebhookError,
};
