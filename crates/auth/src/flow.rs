//! Auth Flow Controller: the OAuth redirect handshake as a two-phase state
//! machine.
//!
//! ```text
//! Idle ──begin──▶ Redirecting ──complete──▶ AwaitingCallback ──▶ Authenticated
//!                                                      └──────▶ Failed
//! ```
//!
//! The browser round trip happens between [`AuthFlowController::begin`] and
//! [`AuthFlowController::complete`]; nothing blocks while the user is at the
//! provider, so a test can feed the callback directly.

use std::sync::Arc;

use msgboard_core::SubjectId;

use crate::pkce::{PkcePair, random_token};
use crate::{
    AuthError, AuthService, AuthorizationRequest, CallbackParams, CredentialStore, ProviderConfig,
    Session,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowState {
    Idle,
    /// Authorization URL issued; the user is at the identity provider.
    Redirecting,
    /// Callback received, code exchange in progress.
    AwaitingCallback,
    Authenticated {
        subject_id: SubjectId,
    },
    Failed(AuthError),
}

/// Secrets of the sign-in attempt in flight. Consumed by the first callback.
struct PendingAuthorization {
    state: String,
    pkce: PkcePair,
}

pub struct AuthFlowController<A> {
    provider: ProviderConfig,
    service: A,
    credentials: Arc<CredentialStore>,
    state: FlowState,
    pending: Option<PendingAuthorization>,
}

impl<A: AuthService> AuthFlowController<A> {
    pub fn new(provider: ProviderConfig, service: A, credentials: Arc<CredentialStore>) -> Self {
        let state = match credentials.current() {
            Some(session) => FlowState::Authenticated {
                subject_id: session.subject_id.clone(),
            },
            None => FlowState::Idle,
        };
        Self {
            provider,
            service,
            credentials,
            state,
            pending: None,
        }
    }

    pub fn state(&self) -> &FlowState {
        &self.state
    }

    pub fn credentials(&self) -> &Arc<CredentialStore> {
        &self.credentials
    }

    pub fn provider(&self) -> &ProviderConfig {
        &self.provider
    }

    /// Start a sign-in attempt.
    ///
    /// Allowed from any state: retrying after `Failed`, or signing in as
    /// another account while `Authenticated`. Any earlier attempt still in
    /// flight is superseded and its callback will be refused.
    pub fn begin(&mut self) -> AuthorizationRequest {
        let pkce = PkcePair::generate();
        let state = random_token(16);
        let url = self.provider.authorization_url(&state, pkce.challenge());
        let request = AuthorizationRequest {
            url,
            state: state.clone(),
            code_challenge: pkce.challenge().to_string(),
        };

        if self.pending.is_some() {
            tracing::debug!("superseding a sign-in attempt that never completed");
        }
        self.pending = Some(PendingAuthorization { state, pkce });
        self.state = FlowState::Redirecting;
        tracing::info!(endpoint = %self.provider.authorize_endpoint, "sign-in started");

        request
    }

    /// Resume after the provider redirected back.
    ///
    /// Never panics: a replayed, stale, denied or code-less callback lands in
    /// `Failed` with the reason. On failure an already active session (from an
    /// earlier sign-in) is left untouched.
    pub async fn complete(&mut self, callback: CallbackParams) -> Result<Arc<Session>, AuthError> {
        self.state = FlowState::AwaitingCallback;

        match self.resolve(callback).await {
            Ok(session) => {
                let session = self.credentials.set(session);
                self.state = FlowState::Authenticated {
                    subject_id: session.subject_id.clone(),
                };
                tracing::info!(subject = %session.subject_id, "sign-in complete");
                Ok(session)
            }
            Err(err) => {
                tracing::warn!(error = %err, "sign-in failed");
                self.state = FlowState::Failed(err.clone());
                Err(err)
            }
        }
    }

    async fn resolve(&mut self, callback: CallbackParams) -> Result<Session, AuthError> {
        let pending = self.pending.take().ok_or(AuthError::NoPendingRequest)?;

        if let Some(error) = callback.error.clone() {
            return Err(AuthError::ProviderDenied {
                error,
                description: callback.error_description.clone(),
            });
        }

        match callback.state.as_deref() {
            Some(state) if state != pending.state => return Err(AuthError::StateMismatch),
            None if self.provider.style.echoes_state() => return Err(AuthError::StateMismatch),
            _ => {}
        }

        let code = callback.code().ok_or(AuthError::MissingCode)?;
        self.service.exchange(code, pending.pkce.verifier()).await
    }

    /// Give up on the attempt in flight (e.g. the caller's timeout fired).
    pub fn abandon(&mut self, reason: AuthError) {
        if self.pending.take().is_some() {
            tracing::warn!(error = %reason, "sign-in abandoned");
            self.state = FlowState::Failed(reason);
        }
    }

    /// Replace the active session with a freshly refreshed one.
    pub async fn refresh(&mut self) -> Result<Arc<Session>, AuthError> {
        let current = self.credentials.current().ok_or(AuthError::NotAuthenticated)?;
        let renewed = self.service.refresh(&current.refresh_token).await?;
        let session = self.credentials.set(renewed);
        self.state = FlowState::Authenticated {
            subject_id: session.subject_id.clone(),
        };
        Ok(session)
    }

    /// Sign out: drop the local session first, then ask the backend to revoke
    /// it. Returns whether a session was active.
    pub async fn sign_out(&mut self) -> bool {
        self.pending = None;
        self.state = FlowState::Idle;

        let Some(session) = self.credentials.clear() else {
            return false;
        };
        if let Err(err) = self.service.revoke(&session).await {
            tracing::warn!(error = %err, "session revoke failed; local session already cleared");
        }
        tracing::info!(subject = %session.subject_id, "signed out");
        true
    }
}
