use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use devctl_core::api::{self, ContainerStatusResponse, LogsResponse, ManageContainerResponse};
use devctl_core::auth::AuthContext;
use serde::Deserialize;

use super::blocking;
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ManageBody {
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub container: String,
}

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    pub lines: Option<u32>,
}

/// GET /api/containers: every container known to docker.
pub async fn list_containers(
    State(app): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<Json<ContainerStatusResponse>, AppError> {
    let resp = blocking(move || api::get_container_status(&app.gateway, &ctx)).await?;
    Ok(Json(resp))
}

/// POST /api/containers/manage: `{action, container}` in the body.
pub async fn manage(
    State(app): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    body: Result<Json<ManageBody>, JsonRejection>,
) -> Result<Json<ManageContainerResponse>, AppError> {
    let Json(body) = body.map_err(|e| AppError::rejected(e.status(), e.body_text()))?;
    let resp = blocking(move || {
        api::manage_container(&app.gateway, &ctx, &body.action, &body.container)
    })
    .await?;
    Ok(Json(resp))
}

/// POST /api/containers/{name}/{action}
pub async fn manage_by_path(
    State(app): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path((name, action)): Path<(String, String)>,
) -> Result<Json<ManageContainerResponse>, AppError> {
    let resp = blocking(move || api::manage_container(&app.gateway, &ctx, &action, &name)).await?;
    Ok(Json(resp))
}

/// GET /api/containers/{name}/logs?lines=N
pub async fn logs(
    State(app): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(name): Path<String>,
    query: Result<Query<LogsQuery>, QueryRejection>,
) -> Result<Json<LogsResponse>, AppError> {
    let Query(query) = query.map_err(|e| AppError::rejected(e.status(), e.body_text()))?;
    let resp = blocking(move || api::get_logs(&app.gateway, &ctx, &name, query.lines)).await?;
    Ok(Json(resp))
}
