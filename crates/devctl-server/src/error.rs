use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use devctl_core::error::DevctlError;

/// Carries an extractor rejection (bad JSON, bad query string) through the
/// `anyhow::Error` chain with its original status.
#[derive(Debug)]
struct RejectedInput(StatusCode, String);

impl std::fmt::Display for RejectedInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.1)
    }
}

impl std::error::Error for RejectedInput {}

/// Unified error type for HTTP responses.
///
/// Subprocess failures never arrive here: they are successful calls that
/// return `success: false`. Only rejections and internal faults do.
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl AppError {
    /// An extractor rejection, keeping axum's status and text.
    pub fn rejected(status: StatusCode, message: impl Into<String>) -> Self {
        Self(RejectedInput(status, message.into()).into())
    }

    pub fn status(&self) -> StatusCode {
        if let Some(r) = self.0.downcast_ref::<RejectedInput>() {
            return r.0;
        }
        let Some(e) = self.0.downcast_ref::<DevctlError>() else {
            return StatusCode::INTERNAL_SERVER_ERROR;
        };
        match e {
            DevctlError::InvalidAction(_)
            | DevctlError::InvalidTargetName(_)
            | DevctlError::MissingFilename => StatusCode::BAD_REQUEST,
            DevctlError::PermissionDenied { .. } => StatusCode::FORBIDDEN,
            DevctlError::FileNotFound(_) => StatusCode::NOT_FOUND,
            DevctlError::BackupExists(_) => StatusCode::CONFLICT,
            DevctlError::Disabled => StatusCode::SERVICE_UNAVAILABLE,
            DevctlError::SubprocessFailed { .. }
            | DevctlError::TimedOut { .. }
            | DevctlError::NotInitialized
            | DevctlError::Io(_)
            | DevctlError::Yaml(_)
            | DevctlError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// `{"success": false, "message": ...}` with the given status.
pub fn failure(status: StatusCode, message: impl Into<String>) -> Response {
    let body = serde_json::json!({ "success": false, "message": message.into() });
    (status, axum::Json(body)).into_response()
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }
        failure(status, self.0.to_string())
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
