//! Error taxonomy for the generation client.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while talking to the generation API.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Bad input detected before any network call.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Connection failure or a non-success status where success was required.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Response body was not valid JSON or lacked the requested field.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Token exchange was rejected or returned no access token.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// The server did not accept the generation request.
    #[error("Submission rejected: {0}")]
    Submission(String),

    /// The task did not reach a terminal state within the polling budget.
    #[error("Task {task_id} still not finished after {}s", .waited.as_secs())]
    PollTimeout { task_id: String, waited: Duration },

    /// The server reported the task as failed.
    #[error("Task {task_id} failed: {message}")]
    TaskFailed {
        task_id: String,
        message: String,
        payload: serde_json::Value,
    },

    /// The result download did not produce a usable artifact.
    #[error("Download failed: {0}")]
    Download(String),

    /// Local file system error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// Stable short name for the error category, printed by the CLI.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Transport(_) => "transport",
            Self::Parse(_) => "parse",
            Self::Auth(_) => "auth",
            Self::Submission(_) => "submission",
            Self::PollTimeout { .. } => "poll-timeout",
            Self::TaskFailed { .. } => "task-failed",
            Self::Download(_) => "download",
            Self::Io(_) => "io",
        }
    }

    /// Process exit code for this category.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) => 2,
            Self::Transport(_) => 3,
            Self::Parse(_) => 4,
            Self::Auth(_) => 5,
            Self::Submission(_) => 6,
            Self::PollTimeout { .. } => 7,
            Self::TaskFailed { .. } => 8,
            Self::Download(_) => 9,
            Self::Io(_) => 10,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn every_variant() -> Vec<ClientError> {
        vec![
            ClientError::Config(String::new()),
            ClientError::Transport(String::new()),
            ClientError::Parse(String::new()),
            ClientError::Auth(String::new()),
            ClientError::Submission(String::new()),
            ClientError::PollTimeout {
                task_id: "abc".to_string(),
                waited: Duration::from_secs(1),
            },
            ClientError::TaskFailed {
                task_id: "abc".to_string(),
                message: String::new(),
                payload: serde_json::Value::Null,
            },
            ClientError::Download(String::new()),
            ClientError::Io(std::io::Error::other("disk full")),
        ]
    }

    #[test]
    fn test_categories_and_exit_codes_are_distinct() {
        let errors = every_variant();
        let categories: HashSet<_> = errors.iter().map(ClientError::category).collect();
        let codes: HashSet<_> = errors.iter().map(ClientError::exit_code).collect();

        assert_eq!(categories.len(), errors.len());
        assert_eq!(codes.len(), errors.len());
        assert!(!codes.contains(&0));
        assert_eq!(
            errors.iter().map(ClientError::category).collect::<Vec<_>>(),
            [
                "config",
                "transport",
                "parse",
                "auth",
                "submission",
                "poll-timeout",
                "task-failed",
                "download",
                "io"
            ]
        );
    }

    #[test]
    fn test_timeout_and_failure_are_distinguishable() {
        let timeout = ClientError::PollTimeout {
            task_id: "abc".to_string(),
            waited: Duration::from_secs(600),
        };
        let failed = ClientError::TaskFailed {
            task_id: "abc".to_string(),
            message: "CUDA out of memory".to_string(),
            payload: serde_json::json!({"status": "failed"}),
        };

        assert_ne!(timeout.category(), failed.category());
        assert_ne!(timeout.exit_code(), failed.exit_code());
        assert_eq!(timeout.to_string(), "Task abc still not finished after 600s");
        assert!(failed.to_string().contains("CUDA out of memory"));
    }
}
