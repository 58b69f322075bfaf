//! Xendit payment gateway adapter.

mod wire;
mod xendit_adapter;

pub use xendit_adapter::XenditAdapter;
