use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::{Extension, Json};
use devctl_core::api::{self, BackupListResponse, BackupRestoreResponse};
use devctl_core::auth::AuthContext;
use serde::Deserialize;

use super::blocking;
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct BackupBody {
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub filename: Option<String>,
}

/// GET /api/backups: artifacts in the backup directory, newest first.
pub async fn list_backups(
    State(app): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<Json<BackupListResponse>, AppError> {
    let resp = blocking(move || api::list_backups(&app.gateway, &ctx)).await?;
    Ok(Json(resp))
}

/// POST /api/backups: `{"action": "backup"}` or `{"action": "restore", "filename": ...}`.
///
/// Dumps can run for minutes; the database timeout bounds them.
pub async fn backup_restore(
    State(app): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    body: Result<Json<BackupBody>, JsonRejection>,
) -> Result<Json<BackupRestoreResponse>, AppError> {
    let Json(body) = body.map_err(|e| AppError::rejected(e.status(), e.body_text()))?;
    let resp = blocking(move || {
        let filename = body.filename.unwrap_or_default();
        api::backup_restore(&app.gateway, &ctx, &body.action, &filename)
    })
    .await?;
    Ok(Json(resp))
}
