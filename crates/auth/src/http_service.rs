//! GoTrue-compatible backend auth service over HTTP.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;

use msgboard_core::SubjectId;

use crate::{AuthError, AuthService, Session, UserMetadata};

/// Talks to `{base_url}/auth/v1/*` with the project's public API key.
#[derive(Clone)]
pub struct HttpAuthService {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_token_type")]
    token_type: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    refresh_token: String,
    user: UserResponse,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    id: SubjectId,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    user_metadata: UserMetadata,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl TokenResponse {
    fn into_session(self, now: DateTime<Utc>) -> Session {
        let expires_at = self
            .expires_at
            .and_then(|t| DateTime::from_timestamp(t, 0))
            .or_else(|| self.expires_in.map(|secs| now + Duration::seconds(secs)))
            .unwrap_or_else(|| now + Duration::hours(1));

        Session {
            subject_id: self.user.id,
            email: self.user.email.filter(|e| !e.trim().is_empty()),
            bearer_token: self.access_token,
            refresh_token: self.refresh_token,
            token_type: self.token_type,
            expires_at,
            user_metadata: self.user.user_metadata,
        }
    }
}

impl HttpAuthService {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    /// Use a preconfigured client (timeouts, proxies).
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    async fn grant(&self, grant_type: &str, body: serde_json::Value) -> Result<Session, AuthError> {
        let url = format!("{}/auth/v1/token", self.base_url);
        let resp = self
            .client
            .post(&url)
            .query(&[("grant_type", grant_type)])
            .header("apikey", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AuthError::transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(status_error(status, resp).await);
        }

        let token: TokenResponse = resp
            .json()
            .await
            .map_err(|e| AuthError::invalid_response(e.to_string()))?;
        Ok(token.into_session(Utc::now()))
    }
}

#[async_trait]
impl AuthService for HttpAuthService {
    async fn exchange(&self, code: &str, code_verifier: &str) -> Result<Session, AuthError> {
        tracing::debug!("exchanging authorization code");
        self.grant(
            "pkce",
            json!({ "auth_code": code, "code_verifier": code_verifier }),
        )
        .await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Session, AuthError> {
        tracing::debug!("refreshing session");
        self.grant("refresh_token", json!({ "refresh_token": refresh_token }))
            .await
    }

    async fn revoke(&self, session: &Session) -> Result<(), AuthError> {
        let url = format!("{}/auth/v1/logout", self.base_url);
        let resp = self
            .client
            .post(&url)
            .header("apikey", &self.api_key)
            .bearer_auth(&session.bearer_token)
            .send()
            .await
            .map_err(|e| AuthError::transport(e.to_string()))?;

        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(status_error(status, resp).await)
        }
    }
}

/// Map a non-2xx response: server faults are transport-level, the rest are
/// rejections carrying the service's own message.
async fn status_error(status: StatusCode, resp: reqwest::Response) -> AuthError {
    let body = resp.text().await.unwrap_or_default();
    if status.is_server_error() {
        return AuthError::transport(format!("auth service returned {status}"));
    }
    AuthError::rejected(error_message(&body).unwrap_or_else(|| format!("status {status}")))
}

fn error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["error_description", "msg", "message", "error"]
        .iter()
        .find_map(|k| value.get(*k).and_then(|v| v.as_str()))
        .map(str::to_string)
}

impl core::fmt::Debug for HttpAuthService {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HttpAuthService")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_response_prefers_absolute_expiry() {
        let now = Utc::now();
        let resp: TokenResponse = serde_json::from_value(json!({
            "access_token": "a",
            "token_type": "bearer",
            "expires_in": 3600,
            "expires_at": 1_900_000_000,
            "refresh_token": "r",
            "user": { "id": "u1", "email": "", "user_metadata": { "user_name": "octo" } }
        }))
        .unwrap();

        let session = resp.into_session(now);
        assert_eq!(session.expires_at.timestamp(), 1_900_000_000);
        assert_eq!(session.email, None);
        assert_eq!(session.user_metadata.user_name.as_deref(), Some("octo"));
    }

    #[test]
    fn token_response_falls_back_to_relative_expiry() {
        let now = Utc::now();
        let resp: TokenResponse = serde_json::from_value(json!({
            "access_token": "a",
            "expires_in": 60,
            "refresh_token": "r",
            "user": { "id": "u1" }
        }))
        .unwrap();

        let session = resp.into_session(now);
        assert_eq!(session.expires_at, now + Duration::seconds(60));
        assert_eq!(session.token_type, "bearer");
    }

    #[test]
    fn error_message_reads_gotrue_shapes() {
        assert_eq!(
            error_message(r#"{"error":"invalid_grant","error_description":"Invalid Refresh Token"}"#).as_deref(),
            Some("Invalid Refresh Token")
        );
        assert_eq!(
            error_message(r#"{"code":400,"msg":"code verifier mismatch"}"#).as_deref(),
            Some("code verifier mismatch")
        );
        assert_eq!(error_message("<html>"), None);
    }
}
