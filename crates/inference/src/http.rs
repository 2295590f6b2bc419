//! Thin HTTP/JSON layer shared by every client component.
//!
//! No retries happen here; retry policy belongs to the callers (see
//! [`crate::poller`]).

use std::time::Duration;

use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use tracing::debug;

use crate::error::ClientError;

/// Default timeout for a single request. Result downloads can be large videos.
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Status and raw body of a completed HTTP exchange.
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// HTTP status code.
    pub status: StatusCode,
    /// Unparsed response body.
    pub body: Vec<u8>,
}

impl RawResponse {
    /// Whether the status is 2xx.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Fail with [`ClientError::Transport`] unless the status is 2xx.
    ///
    /// # Errors
    /// Returns a transport error carrying the status and body text.
    pub fn require_success(self) -> Result<Self, ClientError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ClientError::Transport(format!(
                "HTTP {} - {}",
                self.status.as_u16(),
                self.text()
            )))
        }
    }

    /// Body as lossy UTF-8 text.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Parse the body as JSON.
    ///
    /// # Errors
    /// Returns [`ClientError::Parse`] if the body is not valid JSON.
    pub fn json(&self) -> Result<Value, ClientError> {
        parse_json(&self.body)
    }
}

/// Parse a byte slice as a JSON document.
///
/// # Errors
/// Returns [`ClientError::Parse`] if the document is not valid JSON.
pub fn parse_json(body: &[u8]) -> Result<Value, ClientError> {
    serde_json::from_slice(body).map_err(|e| ClientError::Parse(format!("invalid JSON: {e}")))
}

/// Look up a dotted path (`user_info.tier`, `items.0.id`) in a JSON document.
///
/// Callers polling for a field that may not exist yet should treat the error
/// as "not available yet" rather than failing.
///
/// # Errors
/// Returns [`ClientError::Parse`] if any path segment is absent.
pub fn extract_field<'a>(json: &'a Value, path: &str) -> Result<&'a Value, ClientError> {
    path.split('.')
        .try_fold(json, |node, segment| match node {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
        .ok_or_else(|| ClientError::Parse(format!("field `{path}` not present")))
}

/// String-valued variant of [`extract_field`].
///
/// # Errors
/// Returns [`ClientError::Parse`] if the field is absent or not a string.
pub fn extract_str<'a>(json: &'a Value, path: &str) -> Result<&'a str, ClientError> {
    extract_field(json, path)?
        .as_str()
        .ok_or_else(|| ClientError::Parse(format!("field `{path}` is not a string")))
}

/// HTTP client bound to one API base URL.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
}

impl HttpClient {
    /// Create a client for the given base URL.
    ///
    /// # Errors
    /// Returns [`ClientError::Config`] if the URL is empty or the HTTP client
    /// cannot be built.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let base_url = base_url.into().trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(ClientError::Config("API URL is empty".to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| ClientError::Config(format!("cannot build HTTP client: {e}")))?;

        Ok(Self { client, base_url })
    }

    /// Absolute URL for an API path.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Issue a request and return status plus raw body.
    ///
    /// Non-2xx statuses are returned as-is; use
    /// [`RawResponse::require_success`] where success is mandatory.
    ///
    /// # Errors
    /// Returns [`ClientError::Transport`] on connection failure.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        bearer: Option<&str>,
        body: Option<&Value>,
    ) -> Result<RawResponse, ClientError> {
        let url = self.url(path);
        debug!(method = %method, url = %url, "HTTP request");

        let mut builder = self.client.request(method, &url);
        if let Some(token) = bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(json) = body {
            builder = builder.json(json);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.bytes().await?.to_vec();

        debug!(url = %url, status = status.as_u16(), bytes = body.len(), "HTTP response");
        Ok(RawResponse { status, body })
    }

    /// Authenticated or anonymous GET.
    ///
    /// # Errors
    /// Returns [`ClientError::Transport`] on connection failure.
    pub async fn get(&self, path: &str, bearer: Option<&str>) -> Result<RawResponse, ClientError> {
        self.request(Method::GET, path, bearer, None).await
    }

    /// POST with a JSON body.
    ///
    /// # Errors
    /// Returns [`ClientError::Transport`] on connection failure.
    pub async fn post(
        &self,
        path: &str,
        bearer: Option<&str>,
        body: &Value,
    ) -> Result<RawResponse, ClientError> {
        self.request(Method::POST, path, bearer, Some(body)).await
    }
}
