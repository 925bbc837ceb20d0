pub mod backups;
pub mod containers;
pub mod system;

use crate::error::AppError;

/// Run a blocking core call on tokio's blocking pool.
///
/// The child process is not tied to the HTTP connection: if the client goes
/// away the call still runs to completion or to its timeout.
pub(crate) async fn blocking<T, F>(f: F) -> Result<T, AppError>
where
    F: FnOnce() -> devctl_core::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let result = tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;
    Ok(result)
}
