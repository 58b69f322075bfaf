//! Paygate - Transaction Reconciliation Engine
//!
//! This crate sells time-limited access to paid content: it opens
//! payment channels with an external provider, reconciles asynchronous
//! payment notifications against a transaction ledger, and issues
//! idempotent access grants.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
