use crate::error::ServerResult;
use crate::routes::ApiResponse;
use crate::state::ServerState;
use axum::Extension;
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use place::Placement;
use serde::Deserialize;
use std::sync::Arc;

/// Query parameters for a single square
///
/// Kept as raw strings: a missing or unparseable coordinate reads as 0.
#[derive(Debug, Default, Deserialize)]
pub struct SquareQuery {
    #[serde(rename = "X", default)]
    pub x: Option<String>,

    #[serde(rename = "Y", default)]
    pub y: Option<String>,
}

impl SquareQuery {
    pub fn coordinates(&self) -> (u32, u32) {
        (coordinate(self.x.as_deref()), coordinate(self.y.as_deref()))
    }
}

fn coordinate(raw: Option<&str>) -> u32 {
    raw.and_then(|value| value.trim().parse().ok()).unwrap_or(0)
}

/// List every placed square
pub async fn list_squares(
    State(state): State<Arc<ServerState>>,
) -> ServerResult<impl IntoResponse> {
    let squares = state.service.list_squares().await?;
    Ok(ApiResponse::ok(squares))
}

/// Get the square at `?X=..&Y=..`
///
/// A coordinate nobody painted answers with a blank square, not a 404.
/// Missing or non-numeric `X`/`Y` fall back to 0.
pub async fn get_square(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<SquareQuery>,
) -> ServerResult<impl IntoResponse> {
    let (x, y) = query.coordinates();
    let square = state.service.get_square(x, y).await?;
    Ok(ApiResponse::ok(square))
}

/// Place a square
///
/// Runs behind [`crate::middleware::placement_gate`], which has already
/// validated the body and applied the cooldown.
pub async fn put_square(
    State(state): State<Arc<ServerState>>,
    Extension(placement): Extension<Placement>,
) -> ServerResult<impl IntoResponse> {
    let receipt = state.service.commit(placement).await?;
    tracing::info!(
        author = %receipt.author,
        x = receipt.x,
        y = receipt.y,
        color = receipt.color,
        "Square placed"
    );
    Ok(ApiResponse::ok(receipt.message()))
}
