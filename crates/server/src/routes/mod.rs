//! API route handlers
//!
//! Routes are organized by functionality:
//!
//! - `health`: Liveness, readiness, and metrics
//! - `squares`: Listing, reading and placing squares
//! - `canvas`: The packed canvas and its repair

pub mod canvas;
pub mod health;
pub mod squares;

use crate::error::{ServerError, ServerResult};
use axum::Json;
use axum::response::IntoResponse;
use serde::Serialize;
use serde_json::json;

/// Envelope for every successful response: `{"status": true, "data": ...}`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub status: bool,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Json<Self> {
        Json(Self { status: true, data })
    }
}

/// API version and base info
///
/// Returns server information including version and available endpoints.
/// This is the root endpoint (GET /).
pub async fn api_info() -> ServerResult<impl IntoResponse> {
    Ok(Json(json!({
        "name": "Place Server",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": [
            "GET /squares",
            "GET /square?X=&Y=",
            "PUT /squares",
            "GET /canvas",
            "POST /canvas/rebuild",
            "/health",
            "/ready",
            "/metrics"
        ]
    })))
}

/// 404 Not Found handler
pub async fn not_found() -> ServerError {
    ServerError::NotFound
}
