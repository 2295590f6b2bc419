//! Generation request submission.

use serde_json::Value;
use tracing::info;

use crate::auth::SessionToken;
use crate::error::ClientError;
use crate::http::{extract_str, HttpClient};
use crate::request::GenerationRequest;
use crate::task::{Submission, TaskStatus};

/// Post a generation request and read back the task id.
///
/// A `completed` status in the response means the server answered from its
/// cache and no polling is needed.
///
/// # Errors
/// Returns [`ClientError::Config`] for requests the server would refuse,
/// [`ClientError::Submission`] when the response carries no `task_id`, and
/// [`ClientError::Transport`] if the server is unreachable.
pub async fn submit(
    http: &HttpClient,
    token: &SessionToken,
    request: &GenerationRequest,
) -> Result<Submission, ClientError> {
    request.validate()?;
    post_request(http, token, request).await
}

/// [`submit`] for a request the caller has already validated.
pub(crate) async fn post_request(
    http: &HttpClient,
    token: &SessionToken,
    request: &GenerationRequest,
) -> Result<Submission, ClientError> {
    let payload = request.to_payload()?;

    let response = http
        .post(request.endpoint(), Some(token.bearer()), &payload)
        .await?;
    let body = response.json().unwrap_or(Value::Null);

    let Ok(task_id) = extract_str(&body, "task_id") else {
        let reason = body
            .get("error")
            .and_then(Value::as_str)
            .map_or_else(|| response.text(), str::to_string);
        return Err(ClientError::Submission(format!(
            "no task_id in response (HTTP {}): {reason}",
            response.status.as_u16()
        )));
    };

    let cached = body.get("cached").and_then(Value::as_bool).unwrap_or(false);
    let submission = Submission {
        task_id: task_id.to_string(),
        status: if cached {
            TaskStatus::Completed
        } else {
            TaskStatus::from_document(&body)
        },
        estimated_time: body.get("estimated_time").and_then(Value::as_u64),
        cached,
    };

    info!(
        task_id = %submission.task_id,
        status = %submission.status,
        estimated_secs = submission.estimated_time,
        cached = submission.cached,
        "Task submitted"
    );
    Ok(submission)
}
