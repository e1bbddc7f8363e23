//! Credential Store: the single active session of one client context.

use std::sync::{Arc, PoisonError, RwLock};

use crate::session::{Credential, Session};

/// Holds at most one active [`Session`].
///
/// Share it through `Arc` and inject it wherever outbound calls need a
/// credential; there is deliberately no process-global instance, so a test can
/// run several independent "users" side by side.
///
/// Sessions are stored as `Arc<Session>` and swapped as a whole, so a reader
/// always observes one complete session (old or new), never a mix.
#[derive(Debug, Default)]
pub struct CredentialStore {
    inner: RwLock<Option<Arc<Session>>>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `session`, replacing any previous one.
    pub fn set(&self, session: Session) -> Arc<Session> {
        let session = Arc::new(session);
        let previous = self
            .inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(session.clone());

        match previous {
            Some(prev) if prev.subject_id != session.subject_id => tracing::info!(
                previous = %prev.subject_id,
                subject = %session.subject_id,
                "session replaced by a different identity"
            ),
            Some(_) => tracing::debug!(subject = %session.subject_id, "session renewed"),
            None => tracing::info!(subject = %session.subject_id, "session established"),
        }

        session
    }

    /// The active session, or `None` when unauthenticated.
    pub fn current(&self) -> Option<Arc<Session>> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Credential to present on the next outbound call.
    pub fn credential(&self) -> Credential {
        match self.current() {
            Some(session) => Credential::Bearer(session.bearer_token.clone()),
            None => Credential::Anonymous,
        }
    }

    /// Remove the active session, returning it.
    pub fn clear(&self) -> Option<Arc<Session>> {
        let previous = self
            .inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(prev) = &previous {
            tracing::info!(subject = %prev.subject_id, "session cleared");
        }
        previous
    }

    pub fn is_authenticated(&self) -> bool {
        self.current().is_some()
    }
}
