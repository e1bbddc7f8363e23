use thiserror::Error;

/// Sign-in / session failure.
///
/// Every variant is user-visible and recoverable by starting a new sign-in.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The identity provider redirected back with `?error=...`.
    #[error("identity provider denied sign-in: {error}")]
    ProviderDenied {
        error: String,
        description: Option<String>,
    },

    #[error("callback did not carry an authorization code")]
    MissingCode,

    #[error("callback state does not match the pending sign-in")]
    StateMismatch,

    /// Callback arrived with no sign-in in flight (reload, replay, stale tab).
    #[error("no sign-in is pending")]
    NoPendingRequest,

    /// The backend auth service refused the code or refresh token.
    #[error("auth service rejected the request: {0}")]
    Rejected(String),

    #[error("not signed in")]
    NotAuthenticated,

    #[error("timed out waiting for the identity provider")]
    Timeout,

    #[error("auth service unreachable: {0}")]
    Transport(String),

    #[error("unexpected auth service response: {0}")]
    InvalidResponse(String),
}

impl AuthError {
    pub fn rejected(msg: impl Into<String>) -> Self {
        Self::Rejected(msg.into())
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }
}
