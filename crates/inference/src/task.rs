//! Task lifecycle types.

use serde_json::Value;

/// Server-side task status.
///
/// `Completed` and `Failed` are terminal; anything unrecognised is treated
/// as still in progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    /// Task is queued or running.
    Processing,
    /// Result is ready for download.
    Completed,
    /// Generation failed on the server.
    Failed,
    /// Status missing or not recognised.
    Unknown,
}

impl TaskStatus {
    /// Read the `status` field of a task document; absent means `Unknown`.
    #[must_use]
    pub fn from_document(doc: &Value) -> Self {
        match doc.get("status").and_then(Value::as_str) {
            Some("processing") => Self::Processing,
            Some("completed") => Self::Completed,
            Some("failed") => Self::Failed,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Processing => write!(f, "processing"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Immediate answer to a generation request.
#[derive(Debug, Clone)]
pub struct Submission {
    /// Server-assigned task identifier.
    pub task_id: String,
    /// Status at submission time; `Completed` on a server cache hit.
    pub status: TaskStatus,
    /// Server's estimate in seconds, if given.
    pub estimated_time: Option<u64>,
    /// Whether the result came from the server's cache.
    pub cached: bool,
}
