//! Access grants unlocked by paid transactions.

mod grant;

pub use grant::UserAccess;
