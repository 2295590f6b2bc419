//! Task status polling.
//!
//! One client polls one task: query the status endpoint every `interval`
//! until the task is `completed` or `failed`, or until `timeout` of wall-clock
//! time has passed. A failed query (connection error, non-2xx, bad JSON) is
//! treated as "status unknown" and the loop carries on.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::auth::SessionToken;
use crate::error::ClientError;
use crate::http::HttpClient;
use crate::task::TaskStatus;

/// Default delay between status queries.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

/// Default wall-clock budget for a task.
pub const DEFAULT_POLL_TIMEOUT_SECS: u64 = 600;

/// Status endpoint path for a task.
#[must_use]
pub fn status_path(task_id: &str) -> String {
    format!("/task/{task_id}/status")
}

/// Poll timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    /// Delay between queries.
    pub interval: Duration,
    /// Total wall-clock budget.
    pub timeout: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            timeout: Duration::from_secs(DEFAULT_POLL_TIMEOUT_SECS),
        }
    }
}

/// Anything that can report a task's status document.
#[async_trait]
pub trait StatusSource: Send + Sync {
    /// Fetch the current status document for a task.
    async fn task_status(
        &self,
        token: &SessionToken,
        task_id: &str,
    ) -> Result<Value, ClientError>;
}

#[async_trait]
impl StatusSource for HttpClient {
    async fn task_status(
        &self,
        token: &SessionToken,
        task_id: &str,
    ) -> Result<Value, ClientError> {
        self.get(&status_path(task_id), Some(token.bearer()))
            .await?
            .require_success()?
            .json()
    }
}

/// Block until the task is terminal or the budget runs out.
///
/// Returns the full status document of the completed task.
///
/// # Errors
/// Returns [`ClientError::TaskFailed`] as soon as the server reports
/// `failed`, and [`ClientError::PollTimeout`] once `settings.timeout` has
/// elapsed without a terminal status.
pub async fn poll_until_done<S>(
    source: &S,
    token: &SessionToken,
    task_id: &str,
    settings: &PollSettings,
) -> Result<Value, ClientError>
where
    S: StatusSource + ?Sized,
{
    info!(
        task_id = %task_id,
        interval_secs = settings.interval.as_secs(),
        timeout_secs = settings.timeout.as_secs(),
        "Waiting for task"
    );

    let start = Instant::now();
    let mut attempt: u32 = 0;

    loop {
        let elapsed = start.elapsed();
        if elapsed >= settings.timeout {
            warn!(task_id = %task_id, attempts = attempt, "Task did not finish in time");
            return Err(ClientError::PollTimeout {
                task_id: task_id.to_string(),
                waited: elapsed,
            });
        }

        attempt += 1;
        let doc = match source.task_status(token, task_id).await {
            Ok(doc) => doc,
            Err(e) => {
                warn!(task_id = %task_id, attempt, error = %e, "Status query failed, retrying");
                Value::Null
            }
        };

        match TaskStatus::from_document(&doc) {
            TaskStatus::Completed => {
                info!(task_id = %task_id, attempts = attempt, "Task completed");
                return Ok(doc);
            }
            TaskStatus::Failed => {
                let message = doc
                    .get("error")
                    .and_then(Value::as_str)
                    .unwrap_or("server reported failure without a message")
                    .to_string();
                warn!(task_id = %task_id, error = %message, "Task failed");
                return Err(ClientError::TaskFailed {
                    task_id: task_id.to_string(),
                    message,
                    payload: doc,
                });
            }
            status => {
                debug!(
                    task_id = %task_id,
                    attempt,
                    status = %status,
                    elapsed_secs = elapsed.as_secs(),
                    "Task still running"
                );
            }
        }

        sleep(settings.interval).await;
    }
}
