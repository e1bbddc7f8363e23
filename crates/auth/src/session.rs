use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use msgboard_core::SubjectId;

/// Profile hints reported by the identity provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMetadata {
    #[serde(default)]
    pub preferred_username: Option<String>,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// An authenticated session as issued by the backend auth service.
///
/// Tokens are opaque here; the remote store is the only party that verifies
/// them.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub subject_id: SubjectId,
    pub email: Option<String>,
    pub bearer_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub user_metadata: UserMetadata,
}

impl Session {
    /// Informational only. Expired tokens are still sent; the store decides.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

impl core::fmt::Debug for Session {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Session")
            .field("subject_id", &self.subject_id)
            .field("email", &self.email)
            .field("bearer_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// What a single outbound data operation presents to the remote store.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// No session: the store applies its unauthenticated policies.
    Anonymous,
    Bearer(String),
}

impl Credential {
    pub fn bearer(&self) -> Option<&str> {
        match self {
            Credential::Anonymous => None,
            Credential::Bearer(token) => Some(token),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Credential::Bearer(_))
    }
}

impl core::fmt::Debug for Credential {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Credential::Anonymous => f.write_str("Anonymous"),
            Credential::Bearer(_) => f.write_str("Bearer(<redacted>)"),
        }
    }
}
