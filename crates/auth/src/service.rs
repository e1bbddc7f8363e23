use std::sync::Arc;

use async_trait::async_trait;

use crate::{AuthError, Session};

/// Backend auth service boundary.
///
/// Turns provider codes into sessions and manages their lifetime. The
/// client never validates tokens itself.
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Exchange a one-time authorization code (plus the PKCE verifier that
    /// produced its challenge) for a session.
    async fn exchange(&self, code: &str, code_verifier: &str) -> Result<Session, AuthError>;

    async fn refresh(&self, refresh_token: &str) -> Result<Session, AuthError>;

    async fn revoke(&self, session: &Session) -> Result<(), AuthError>;
}

#[async_trait]
impl<S> AuthService for Arc<S>
where
    S: AuthService + ?Sized,
{
    async fn exchange(&self, code: &str, code_verifier: &str) -> Result<Session, AuthError> {
        (**self).exchange(code, code_verifier).await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Session, AuthError> {
        (**self).refresh(refresh_token).await
    }

    async fn revoke(&self, session: &Session) -> Result<(), AuthError> {
        (**self).revoke(session).await
    }
}
