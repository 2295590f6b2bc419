//! Result download.

use std::path::Path;

use tracing::{debug, info};

use crate::auth::SessionToken;
use crate::error::ClientError;
use crate::http::HttpClient;

/// Result endpoint path for a task.
#[must_use]
pub fn result_path(task_id: &str) -> String {
    format!("/task/{task_id}/result")
}

/// Download a completed task's artifact to `destination`.
///
/// Parent directories are created as needed. A zero-byte artifact counts as
/// a failed download and the empty file is removed.
///
/// # Errors
/// Returns [`ClientError::Download`] if the request fails or yields no bytes,
/// and [`ClientError::Io`] if the file cannot be written.
pub async fn fetch_result(
    http: &HttpClient,
    token: &SessionToken,
    task_id: &str,
    destination: &Path,
) -> Result<u64, ClientError> {
    debug!(task_id = %task_id, path = %destination.display(), "Downloading result");

    let response = http
        .get(&result_path(task_id), Some(token.bearer()))
        .await
        .map_err(|e| ClientError::Download(e.to_string()))?;

    if !response.is_success() {
        return Err(ClientError::Download(format!(
            "HTTP {} - {}",
            response.status.as_u16(),
            response.text()
        )));
    }

    if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(destination, &response.body).await?;

    let written = tokio::fs::metadata(destination).await?.len();
    if written == 0 {
        let _ = tokio::fs::remove_file(destination).await;
        return Err(ClientError::Download(format!(
            "result for task {task_id} is empty"
        )));
    }

    info!(task_id = %task_id, path = %destination.display(), bytes = written, "Result saved");
    Ok(written)
}
