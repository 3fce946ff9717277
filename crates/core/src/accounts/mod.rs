//! Tenant and webhook provisioning

pub mod service;

pub use service::{AccountService, NewAccount, NewWebhook};
