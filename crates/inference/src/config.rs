//! Per-invocation client configuration.
//!
//! Built once in `main` from CLI flags and their environment fallbacks, then
//! handed to the components. Nothing below this reads the environment.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ClientError;
use crate::poller::PollSettings;

/// Default API server.
pub const DEFAULT_API_URL: &str = "http://localhost:5000";

/// Demo key accepted by a stock server.
pub const DEFAULT_API_KEY: &str = "flux-api-key-demo";

/// Default directory for downloaded artifacts.
pub const DEFAULT_OUTPUT_DIR: &str = "outputs";

/// Everything a client invocation needs.
#[derive(Clone)]
pub struct ClientConfig {
    /// API base URL.
    pub api_url: String,
    /// Credential exchanged for a session token.
    pub api_key: String,
    /// Where artifacts are written.
    pub output_dir: PathBuf,
    /// Poll timing.
    pub poll: PollSettings,
}

impl ClientConfig {
    /// Build and validate a configuration.
    ///
    /// # Errors
    /// Returns [`ClientError::Config`] for an empty URL or key, or a zero poll
    /// interval.
    pub fn new(
        api_url: impl Into<String>,
        api_key: impl Into<String>,
        output_dir: impl Into<PathBuf>,
        poll_interval_secs: u64,
        poll_timeout_secs: u64,
    ) -> Result<Self, ClientError> {
        let api_url = api_url.into().trim().to_string();
        let api_key = api_key.into().trim().to_string();

        if api_url.is_empty() {
            return Err(ClientError::Config("API_URL is empty".to_string()));
        }
        if api_key.is_empty() {
            return Err(ClientError::Config("API_KEY is empty".to_string()));
        }
        if poll_interval_secs == 0 {
            return Err(ClientError::Config(
                "POLL_INTERVAL must be at least 1 second".to_string(),
            ));
        }

        Ok(Self {
            api_url,
            api_key,
            output_dir: output_dir.into(),
            poll: PollSettings {
                interval: Duration::from_secs(poll_interval_secs),
                timeout: Duration::from_secs(poll_timeout_secs),
            },
        })
    }

    /// Override poll timing (tests use sub-second values).
    #[must_use]
    pub fn with_poll(mut self, poll: PollSettings) -> Self {
        self.poll = poll;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: DEFAULT_API_KEY.to_string(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            poll: PollSettings::default(),
        }
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &"<redacted>")
            .field("output_dir", &self.output_dir)
            .field("poll", &self.poll)
            .finish()
    }
}
