//! Credential-for-token exchange.

use serde_json::{json, Value};
use tracing::{debug, info};

use crate::error::ClientError;
use crate::http::{extract_str, HttpClient};

/// Token endpoint path.
pub const TOKEN_PATH: &str = "/auth/token";

/// Bearer token returned by the token endpoint.
///
/// Single use per invocation: never cached or refreshed.
#[derive(Clone)]
pub struct SessionToken {
    access_token: String,
    /// User metadata returned alongside the token.
    pub user_info: Value,
}

impl SessionToken {
    /// Wrap a raw bearer string.
    #[must_use]
    pub fn new(access_token: impl Into<String>, user_info: Value) -> Self {
        Self {
            access_token: access_token.into(),
            user_info,
        }
    }

    /// Raw bearer string for the `Authorization` header.
    #[must_use]
    pub fn bearer(&self) -> &str {
        &self.access_token
    }
}

impl std::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionToken")
            .field("access_token", &"<redacted>")
            .field("user_info", &self.user_info)
            .finish()
    }
}

/// Exchange an API key for a session token.
///
/// # Errors
/// Returns [`ClientError::Auth`] on a non-success status or when the response
/// has no `access_token`, and [`ClientError::Transport`] if the server is
/// unreachable.
pub async fn authenticate(http: &HttpClient, credential: &str) -> Result<SessionToken, ClientError> {
    if credential.trim().is_empty() {
        return Err(ClientError::Config("API key is empty".to_string()));
    }

    debug!(url = %http.url(TOKEN_PATH), "Requesting session token");
    let response = http
        .post(TOKEN_PATH, None, &json!({ "api_key": credential }))
        .await?;

    let body = response.json().unwrap_or(Value::Null);
    if !response.is_success() {
        let reason = body
            .get("error")
            .and_then(Value::as_str)
            .map_or_else(|| response.text(), str::to_string);
        return Err(ClientError::Auth(format!(
            "HTTP {} - {reason}",
            response.status.as_u16()
        )));
    }

    let access_token = extract_str(&body, "access_token")
        .map_err(|_| ClientError::Auth("response has no access_token".to_string()))?
        .to_string();
    let user_info = body.get("user_info").cloned().unwrap_or(Value::Null);

    info!(
        user = user_info.get("user_id").and_then(serde_json::Value::as_str).unwrap_or("unknown"),
        "Authenticated"
    );
    Ok(SessionToken::new(access_token, user_info))
}
