//! Per-request pipeline: authenticate, submit, poll, fetch.

use std::path::PathBuf;

use serde_json::Value;
use tracing::info;

use crate::auth::{authenticate, SessionToken};
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::fetch::fetch_result;
use crate::http::HttpClient;
use crate::poller::{poll_until_done, StatusSource};
use crate::request::{ArtifactKind, GenerationRequest};
use crate::submit::post_request;
use crate::task::TaskStatus;

/// Health endpoint path.
pub const HEALTH_PATH: &str = "/health";

/// Client for one API server, configured for one invocation.
pub struct FluxClient {
    http: HttpClient,
    config: ClientConfig,
}

impl FluxClient {
    /// Create a client from configuration.
    ///
    /// # Errors
    /// Returns [`ClientError::Config`] if the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let http = HttpClient::new(&config.api_url)?;
        Ok(Self { http, config })
    }

    /// Local path an artifact for `task_id` is written to.
    #[must_use]
    pub fn artifact_path(&self, task_id: &str, kind: ArtifactKind) -> PathBuf {
        self.config
            .output_dir
            .join(format!("{task_id}.{}", kind.extension()))
    }

    /// Fetch a fresh session token. Tokens are not cached between calls.
    ///
    /// # Errors
    /// See [`authenticate`].
    pub async fn login(&self) -> Result<SessionToken, ClientError> {
        authenticate(&self.http, &self.config.api_key).await
    }

    /// Run a generation request end to end and return the artifact path.
    ///
    /// # Errors
    /// Propagates every error of the individual stages unchanged.
    pub async fn generate(&self, request: &GenerationRequest) -> Result<PathBuf, ClientError> {
        request.validate()?;

        let token = self.login().await?;
        let submission = post_request(&self.http, &token, request).await?;

        if submission.status == TaskStatus::Completed {
            info!(task_id = %submission.task_id, "Result already available, skipping poll");
        } else {
            poll_until_done(&self.http, &token, &submission.task_id, &self.config.poll).await?;
        }

        let destination = self.artifact_path(&submission.task_id, request.kind());
        fetch_result(&self.http, &token, &submission.task_id, &destination).await?;
        Ok(destination)
    }

    /// Query a task's status once.
    ///
    /// # Errors
    /// Returns [`ClientError::Transport`] or [`ClientError::Parse`] on a bad
    /// response; unlike polling, nothing is retried here.
    pub async fn task_status(&self, task_id: &str) -> Result<Value, ClientError> {
        let token = self.login().await?;
        self.http.task_status(&token, task_id).await
    }

    /// Download an existing task's artifact.
    ///
    /// # Errors
    /// See [`fetch_result`].
    pub async fn download(&self, task_id: &str, kind: ArtifactKind) -> Result<PathBuf, ClientError> {
        let token = self.login().await?;
        let destination = self.artifact_path(task_id, kind);
        fetch_result(&self.http, &token, task_id, &destination).await?;
        Ok(destination)
    }

    /// Server health document. Informational only.
    ///
    /// # Errors
    /// Returns [`ClientError::Transport`] if the server is down or unhealthy.
    pub async fn health(&self) -> Result<Value, ClientError> {
        self.http
            .get(HEALTH_PATH, None)
            .await?
            .require_success()?
            .json()
    }
}
