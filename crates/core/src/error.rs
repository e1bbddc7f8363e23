use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

/// Rejection of local input before anything leaves the process.
///
/// Access control never produces a `DomainError`; that decision belongs to
/// the remote store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// e.g. an empty or over-long message body
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }
}
