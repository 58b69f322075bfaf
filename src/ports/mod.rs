//! Ports: contracts between the application core and the outside world.
//!
//! Adapters implement these traits; handlers depend on them as
//! `Arc<dyn Trait>` so the core stays testable with in-memory fakes.

mod access_repository;
mod package_reader;
mod payment_provider;
mod transaction_repository;

pub use access_repository::AccessRepository;
pub use package_reader::PackageReader;
pub use payment_provider::{
    ChannelBundle, CreateChannelRequest, PaymentInstructions, PaymentProvider, ProviderError,
};
pub use transaction_repository::{TransactionRepository, TransitionReceipt};
