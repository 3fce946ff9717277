//! # Leadflow Infrastructure
//!
//! Infrastructure implementations of core domain ports.
//!
//! This crate contains:
//! - The SQLite record store (r2d2 pool, versioned migrations)
//! - Configuration loading from environment and files
//! - Notification queue, worker and email adapters
//!
//! ## Architecture
//! - Implements traits defined in `leadflow-core`
//! - Contains all "impure" code (I/O, network)

pub mod config;
pub mod database;
pub mod errors;
pub mod notifications;

pub use database::{sqlite_record_store, DbManager};
pub use errors::InfraError;
pub use notifications::{
    HttpEmailSender, LogEmailSender, NotificationQueue, NotificationWorker,
    NotificationWorkerConfig,
};
