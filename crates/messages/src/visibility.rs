use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use msgboard_gateway::{Policy, PolicyAction, Predicate};

use crate::MESSAGES_TABLE;

/// Who may read a message. Writing is always "as yourself".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageVisibility {
    /// Every signed-in user reads every message.
    #[default]
    AllAuthenticated,
    /// A signed-in user reads only their own messages.
    OwnOnly,
}

impl MessageVisibility {
    /// Row-level policies for the `messages` table.
    pub fn policies(self) -> Vec<Policy> {
        let read = match self {
            MessageVisibility::AllAuthenticated => Policy::new(
                "messages readable by signed-in users",
                MESSAGES_TABLE,
                PolicyAction::Select,
                Predicate::Authenticated,
            ),
            MessageVisibility::OwnOnly => Policy::new(
                "messages readable by their author",
                MESSAGES_TABLE,
                PolicyAction::Select,
                Predicate::owner_matches("author_id"),
            ),
        };
        let write = Policy::new(
            "messages written as self",
            MESSAGES_TABLE,
            PolicyAction::Insert,
            Predicate::owner_matches("author_id"),
        );
        vec![read, write]
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown message visibility '{0}' (expected 'all' or 'own')")]
pub struct ParseVisibilityError(String);

impl FromStr for MessageVisibility {
    type Err = ParseVisibilityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" | "all_authenticated" => Ok(Self::AllAuthenticated),
            "own" | "own_only" => Ok(Self::OwnOnly),
            other => Err(ParseVisibilityError(other.to_string())),
        }
    }
}

impl core::fmt::Display for MessageVisibility {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            MessageVisibility::AllAuthenticated => "all",
            MessageVisibility::OwnOnly => "own",
        })
    }
}
