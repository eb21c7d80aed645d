//! HTTP handlers.

pub mod auth;
pub mod events;
pub mod media;
pub mod payments;
pub mod plans;
pub mod users;

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::services;

pub async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "service": "moments-service",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

pub async fn readiness_check() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "ready" })))
}

pub async fn metrics() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        services::get_metrics(),
    )
}
