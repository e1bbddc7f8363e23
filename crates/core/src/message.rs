//! Message value types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{DomainError, DomainResult, MessageId, SubjectId};

/// Upper bound on a message body, in characters (after trimming).
pub const MAX_BODY_CHARS: usize = 2000;

/// A validated, trimmed message body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MessageBody(String);

impl MessageBody {
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(DomainError::validation("message body is empty"));
        }
        let chars = trimmed.chars().count();
        if chars > MAX_BODY_CHARS {
            return Err(DomainError::validation(format!(
                "message body is {chars} characters (max {MAX_BODY_CHARS})"
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

/// A message row as returned by the store.
///
/// `id`, `author_id` and `created_at` are assigned server-side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub author_id: SubjectId,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Display ordering: `created_at` ascending, `id` as tie-break.
    pub fn display_order(a: &Message, b: &Message) -> core::cmp::Ordering {
        a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id))
    }
}
