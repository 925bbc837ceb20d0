use axum::extract::State;
use axum::{Extension, Json};
use devctl_core::api::{self, MetricsResponse, SystemInfoResponse};
use devctl_core::auth::AuthContext;

use super::blocking;
use crate::error::AppError;
use crate::state::AppState;

/// GET /api/health: liveness, no auth.
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// GET /api/system
pub async fn system_info(
    State(app): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<Json<SystemInfoResponse>, AppError> {
    let resp = blocking(move || api::get_system_info(&app.gateway, &ctx)).await?;
    Ok(Json(resp))
}

/// GET /api/metrics
pub async fn metrics(
    State(app): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<Json<MetricsResponse>, AppError> {
    let resp = blocking(move || api::get_metrics(&app.gateway, &ctx)).await?;
    Ok(Json(resp))
}
