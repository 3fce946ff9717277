//! # Leadflow API
//!
//! HTTP server for the lead CRM core: the public webhook intake, the
//! tenant-scoped lead API and provisioning endpoints.

pub mod context;
pub mod http;
pub mod utils;

pub use context::AppContext;
pub use http::create_app;
