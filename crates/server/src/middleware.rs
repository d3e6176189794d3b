use crate::error::ServerError;
use crate::state::ServerState;
use axum::body::{Body, to_bytes};
use axum::extract::{Request, State};
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use http_body_util::LengthLimitError;
use place::PlacementRequest;
use std::sync::Arc;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Identifier attached to every request and echoed in the response headers.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Placement gate in front of `PUT /squares`.
///
/// Buffers the body, parses it once into a [`PlacementRequest`], validates it
/// and applies the author's cooldown. On success the validated
/// [`place::Placement`] is stored in the request extensions and the original
/// bytes are put back as the body, so the handler sees the request untouched.
pub async fn placement_gate(
    State(state): State<Arc<ServerState>>,
    request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    let limit = state.config.max_body_size();
    let (parts, body) = request.into_parts();
    let bytes = to_bytes(body, limit)
        .await
        .map_err(|err| body_error(err, limit))?;

    let placement_request: PlacementRequest = serde_json::from_slice(&bytes)?;
    let placement = state.service.admit(&placement_request).await?;

    let mut request = Request::from_parts(parts, Body::from(bytes));
    request.extensions_mut().insert(placement);

    Ok(next.run(request).await)
}

fn body_error(err: axum::Error, limit: usize) -> ServerError {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(&err);
    while let Some(cause) = source {
        if cause.is::<LengthLimitError>() {
            return ServerError::PayloadTooLarge { limit };
        }
        source = cause.source();
    }
    ServerError::InvalidInput(format!("unreadable body: {err}"))
}

/// Request ID injection middleware
pub async fn request_id(mut request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    request
        .extensions_mut()
        .insert(RequestId(request_id.clone()));

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}

/// Logging middleware
pub async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = std::time::Instant::now();

    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map(|id| id.0.clone())
        .unwrap_or_default();

    tracing::info!(
        method = %method,
        uri = %uri,
        request_id = %request_id,
        "Request started"
    );

    let response = next.run(request).await;
    let duration = start.elapsed();
    let status = response.status();

    tracing::info!(
        method = %method,
        uri = %uri,
        status = %status,
        duration_ms = %duration.as_millis(),
        request_id = %request_id,
        "Request completed"
    );

    response
}
