//! Shared helpers for driving the router in-process.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use leadflow_api::{create_app, AppContext};
use leadflow_domain::Config;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

pub struct TestApp {
    pub router: Router,
    pub context: Arc<AppContext>,
    _temp_dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    pub async fn with_config(edit: impl FnOnce(&mut Config)) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.database.path = temp_dir.path().join("leadflow.db").to_string_lossy().into_owned();
        config.database.pool_size = 2;
        edit(&mut config);

        let context = Arc::new(AppContext::new(config).await.unwrap());
        Self { router: create_app(Arc::clone(&context)), context, _temp_dir: temp_dir }
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap_or(Value::Null) };
        (status, body)
    }

    /// Create an account and one webhook; returns (account id, public webhook id).
    pub async fn provision(&self, webhook: Value) -> (String, String) {
        let (status, account) = self
            .send(json_request(Method::POST, "/api/accounts", None, &serde_json::json!({"name": "Muster GmbH"})))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let account_id = account["id"].as_str().unwrap().to_string();

        let (status, created) =
            self.send(json_request(Method::POST, "/api/webhooks", Some(&account_id), &webhook)).await;
        assert_eq!(status, StatusCode::CREATED);
        (account_id, created["webhookId"].as_str().unwrap().to_string())
    }
}

pub fn json_request(method: Method, uri: &str, account: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder =
        Request::builder().method(method).uri(uri).header(header::CONTENT_TYPE, "application/json");
    if let Some(account) = account {
        builder = builder.header("x-account-id", account);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn get(uri: &str, account: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(Method::GET).uri(uri);
    if let Some(account) = account {
        builder = builder.header("x-account-id", account);
    }
    builder.body(Body::empty()).unwrap()
}
