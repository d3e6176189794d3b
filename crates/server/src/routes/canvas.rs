use crate::error::ServerResult;
use crate::routes::ApiResponse;
use crate::state::ServerState;
use axum::extract::State;
use axum::response::IntoResponse;
use serde_json::json;
use std::sync::Arc;

/// The packed canvas as a JSON byte array
///
/// Always succeeds; a cold or unreachable cache yields an all-zero canvas.
pub async fn get_canvas(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    let canvas = state.service.canvas().await;
    ApiResponse::ok(canvas.to_vec())
}

/// Rebuild the cached canvas from the square store
pub async fn rebuild_canvas(
    State(state): State<Arc<ServerState>>,
) -> ServerResult<impl IntoResponse> {
    let squares = state.service.rebuild_canvas().await?;
    Ok(ApiResponse::ok(json!({ "squares": squares })))
}
