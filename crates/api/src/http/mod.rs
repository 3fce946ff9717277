//! HTTP surface: public webhook intake, tenant API and health check.

use std::sync::Arc;

use axum::http::Method;
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::AppContext;

pub mod errors;
pub mod extractors;
pub mod handlers;
pub mod routes;

pub use errors::ApiError;
pub use extractors::{AccountId, ACCOUNT_HEADER};

/// Build the router with all routes and middleware.
pub fn create_app(context: Arc<AppContext>) -> Router {
    // Third-party forms post from arbitrary origins.
    let webhook_cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    let app = Router::new()
        .merge(routes::health_routes())
        .merge(routes::webhook_routes().layer(webhook_cors))
        .merge(routes::lead_routes())
        .merge(routes::provisioning_routes())
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(context);

    info!("HTTP application created");
    app
}
