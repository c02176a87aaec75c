//! Test helpers for GMC server integration tests
//!
//! Database tests use `#[sqlx::test(migrations = "../../migrations")]`, which
//! hands each test a fresh, migrated database. This module adds:
//! - Fluent fixture builders for catalog rows
//! - Router request helpers for HTTP tests

#![allow(dead_code)]

pub mod fixtures;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use gmc_server::{api, config::CorsConfig, VisibilityPolicy};
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

// Re-export fixtures for convenience
pub use fixtures::*;

/// Full application router over `pool`.
pub fn test_app(pool: PgPool, policy: VisibilityPolicy) -> Router {
    api::create_router(pool, policy, &CorsConfig::default())
}

/// Send a request and decode the JSON body (`Null` for an empty body).
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            request = request.header("content-type", "application/json");
            Body::from(json.to_string())
        },
        None => Body::empty(),
    };

    let response = app.clone().oneshot(request.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };

    (status, json)
}
