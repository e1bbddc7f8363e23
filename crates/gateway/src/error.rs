use thiserror::Error;

use crate::PolicyAction;

/// Data-path failure.
///
/// `AccessDenied` and `Transport` are kept strictly apart so callers can tell
/// "blocked by policy" from "the network failed".
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// The remote policy engine refused the operation (no/invalid/expired
    /// credential, or an insert that violates a policy).
    #[error("access denied: {action} on '{table}': {reason}")]
    AccessDenied {
        table: String,
        action: PolicyAction,
        reason: String,
    },

    /// Network or availability failure. Safe to retry `select`; retrying an
    /// `insert` may duplicate rows.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The store understood the request and refused it for a non-policy
    /// reason (unknown table, bad column, ...).
    #[error("remote store rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },
}

impl GatewayError {
    pub fn access_denied(table: &str, action: PolicyAction, reason: impl Into<String>) -> Self {
        Self::AccessDenied {
            table: table.to_string(),
            action,
            reason: reason.into(),
        }
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn is_access_denied(&self) -> bool {
        matches!(self, Self::AccessDenied { .. })
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}
