use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{Duration, Utc};

use msgboard_core::SubjectId;

use crate::pkce::{PkcePair, random_token};
use crate::{AccessClaims, AuthError, AuthService, HmacTokenKey, Session, UserMetadata};

/// Who the simulated identity provider says signed in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub subject_id: SubjectId,
    pub email: Option<String>,
    pub metadata: UserMetadata,
}

impl Identity {
    pub fn new(subject_id: impl Into<String>) -> Self {
        Self {
            subject_id: SubjectId::new(subject_id),
            email: None,
            metadata: UserMetadata::default(),
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

#[derive(Debug)]
struct PendingCode {
    identity: Identity,
    code_challenge: String,
}

#[derive(Debug, Default)]
struct Inner {
    codes: HashMap<String, PendingCode>,
    refresh_tokens: HashMap<String, Identity>,
}

/// In-memory auth service standing in for both the identity provider's
/// consent step and the backend token endpoint.
///
/// Intended for tests/dev. Codes are single-use and bound to a PKCE
/// challenge; refresh tokens rotate on use; access tokens are HS256 JWTs
/// signed with the shared [`HmacTokenKey`].
#[derive(Debug)]
pub struct InMemoryAuthService {
    key: HmacTokenKey,
    ttl: Duration,
    inner: Mutex<Inner>,
}

impl InMemoryAuthService {
    pub fn new(key: HmacTokenKey) -> Self {
        Self {
            key,
            ttl: Duration::hours(1),
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Lifetime of issued access tokens.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Simulate the user completing consent at the provider: returns the
    /// one-time code the provider would append to the redirect.
    pub fn issue_code(&self, identity: Identity, code_challenge: &str) -> String {
        let code = random_token(16);
        self.lock().codes.insert(
            code.clone(),
            PendingCode {
                identity,
                code_challenge: code_challenge.to_string(),
            },
        );
        code
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn mint(&self, identity: Identity) -> Result<Session, AuthError> {
        let now = Utc::now();
        let expires_at = now + self.ttl;
        let claims = AccessClaims::new(
            identity.subject_id.clone(),
            identity.email.clone(),
            now,
            expires_at,
        );
        let bearer_token = self
            .key
            .sign(&claims)
            .map_err(|e| AuthError::invalid_response(e.to_string()))?;
        let refresh_token = random_token(24);

        self.lock()
            .refresh_tokens
            .insert(refresh_token.clone(), identity.clone());

        Ok(Session {
            subject_id: identity.subject_id,
            email: identity.email,
            bearer_token,
            refresh_token,
            token_type: "bearer".to_string(),
            expires_at,
            user_metadata: identity.metadata,
        })
    }
}

#[async_trait]
impl AuthService for InMemoryAuthService {
    async fn exchange(&self, code: &str, code_verifier: &str) -> Result<Session, AuthError> {
        let pending = self
            .lock()
            .codes
            .remove(code)
            .ok_or_else(|| AuthError::rejected("invalid or already used authorization code"))?;

        if PkcePair::challenge_for(code_verifier) != pending.code_challenge {
            return Err(AuthError::rejected("code verifier does not match challenge"));
        }

        self.mint(pending.identity)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Session, AuthError> {
        let identity = self
            .lock()
            .refresh_tokens
            .remove(refresh_token)
            .ok_or_else(|| AuthError::rejected("invalid refresh token"))?;
        self.mint(identity)
    }

    async fn revoke(&self, session: &Session) -> Result<(), AuthError> {
        self.lock().refresh_tokens.remove(&session.refresh_token);
        Ok(())
    }
}
