use thiserror::Error;

use msgboard_core::DomainError;
use msgboard_gateway::GatewayError;

#[derive(Debug, Error)]
pub enum BoardError {
    #[error("not signed in")]
    NotSignedIn,

    #[error(transparent)]
    Validation(#[from] DomainError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("unexpected row from store: {0}")]
    Decode(String),
}

impl BoardError {
    pub fn is_access_denied(&self) -> bool {
        matches!(self, BoardError::Gateway(e) if e.is_access_denied())
    }
}

impl From<serde_json::Error> for BoardError {
    fn from(e: serde_json::Error) -> Self {
        BoardError::Decode(e.to_string())
    }
}
