// src/handlers/health.rs

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::{common::error::AppError, config::AppState};

// GET /api/health
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service and store are up"),
        (status = 500, description = "Store unreachable")
    )
)]
pub async fn health(State(app_state): State<AppState>) -> Result<Json<Value>, AppError> {
    app_state.store.ping().await?;
    Ok(Json(json!({ "status": "ok" })))
}
