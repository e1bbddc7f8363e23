//! Inbound half of the handshake: the provider's redirect back to us.

use serde::{Deserialize, Deserializer};

/// Parameters of the redirect back to the application's callback.
///
/// Decoded as `application/x-www-form-urlencoded`. Blank values are treated
/// as absent and unknown keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CallbackParams {
    #[serde(default, deserialize_with = "blank_as_none")]
    pub code: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub error: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub error_description: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub state: Option<String>,
}

fn blank_as_none<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|v| !v.trim().is_empty()))
}

impl CallbackParams {
    /// Successful redirect carrying `code` (and, for OAuth 2.0 providers, `state`).
    pub fn with_code(code: impl Into<String>, state: Option<String>) -> Self {
        Self {
            code: Some(code.into()),
            state,
            ..Self::default()
        }
    }

    /// A callback that could not be read at all, reported as a provider error
    /// so the flow fails instead of waiting.
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self {
            error: Some("invalid_request".into()),
            error_description: Some(reason.into()),
            ..Self::default()
        }
    }

    /// Parse a raw query string (leading `?` allowed).
    pub fn from_query(query: &str) -> Result<Self, serde_urlencoded::de::Error> {
        serde_urlencoded::from_str(query.strip_prefix('?').unwrap_or(query))
    }

    /// Parse the query of a full redirect URL (fragment ignored).
    pub fn from_redirect_url(url: &str) -> Result<Self, serde_urlencoded::de::Error> {
        let without_fragment = url.split_once('#').map_or(url, |(head, _)| head);
        match without_fragment.split_once('?') {
            Some((_, query)) => Self::from_query(query),
            None => Ok(Self::default()),
        }
    }

    /// Authorization code, if present and non-blank.
    pub fn code(&self) -> Option<&str> {
        self.code.as_deref().map(str::trim).filter(|c| !c.is_empty())
    }
}
