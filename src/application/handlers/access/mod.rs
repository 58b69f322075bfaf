//! Access grant handlers.

mod check_access;
mod grant_access;

pub use check_access::{CheckAccessHandler, CheckAccessQuery, CheckAccessResult};
pub use grant_access::{GrantAccessCommand, GrantAccessHandler};
