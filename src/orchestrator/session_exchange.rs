//! Session exchange: turns an identity-provider redirect into a local session.
//!
//! Flow for one page visit:
//! 1. Read `session_id` from the location fragment (missing → sign-in, no calls).
//! 2. Identity provider: session id → identity record.
//! 3. Backend: identity record → session token + user.
//! 4. Persist the token, hand the session to the session store.
//! 5. Scrub the credential from history, route by onboarding progress.
//!
//! Any failure on the way is fail-closed: nothing is persisted or committed
//! and the user lands on sign-in without an error message.

use std::sync::Arc;

use reqwest::Url;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::OneShotGuard;
use crate::error::SessionExchangeError;
use crate::lifetime::PageLifetime;
use crate::navigation::{Destination, Navigation, PageHost};
use crate::redirect::{SessionPayload, without_credentials};
use crate::remote::{Backend, IdentityProvider, LocalSession};
use crate::store::{SessionStore, TokenStore};

/// Collaborators a session exchange needs.
#[derive(Clone)]
pub struct ExchangeDeps {
    pub identity: Arc<dyn IdentityProvider>,
    pub backend: Arc<dyn Backend>,
    pub tokens: Arc<dyn TokenStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub host: Arc<dyn PageHost>,
}

/// Terminal result of one session exchange run.
#[derive(Debug)]
pub enum ExchangeOutcome {
    /// Session committed; user routed to `destination`.
    Authenticated { destination: Destination },
    /// Exchange failed; user routed to sign-in.
    Failed(SessionExchangeError),
    /// This mount already ran the exchange; nothing happened.
    Duplicate,
    /// The page was torn down before the exchange finished; nothing happened.
    Abandoned,
}

/// Session exchange orchestrator. One instance per page mount.
pub struct SessionExchange {
    deps: ExchangeDeps,
    lifetime: PageLifetime,
    guard: OneShotGuard,
}

impl SessionExchange {
    pub fn new(deps: ExchangeDeps, lifetime: PageLifetime) -> Self {
        Self {
            deps,
            lifetime,
            guard: OneShotGuard::new(),
        }
    }

    /// Process the redirect at `location`. Only the first call per instance
    /// does anything; later calls return [`ExchangeOutcome::Duplicate`].
    pub async fn run(&self, location: &Url) -> ExchangeOutcome {
        if !self.guard.try_acquire() {
            debug!("Session exchange already started for this page; ignoring");
            return ExchangeOutcome::Duplicate;
        }

        let run_id = Uuid::new_v4();
        let payload = match SessionPayload::from_location(location) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(run_id = %run_id, "Session redirect without a usable session_id");
                return self.fail(location, e);
            }
        };

        info!(run_id = %run_id, "Exchanging identity-provider session");

        let session = match self.lifetime.guard(self.exchange(&payload)).await {
            None => {
                info!(run_id = %run_id, "Page torn down during session exchange");
                return ExchangeOutcome::Abandoned;
            }
            Some(Err(e)) => {
                warn!(run_id = %run_id, error = %e, "Session exchange failed");
                return self.fail(location, e);
            }
            Some(Ok(session)) => session,
        };

        match self.lifetime.guard(self.deps.tokens.save(&session.session_token)).await {
            None => {
                info!(run_id = %run_id, "Page torn down while persisting session token");
                return ExchangeOutcome::Abandoned;
            }
            Some(Err(e)) => {
                let err = SessionExchangeError::IdentityExchangeFailed {
                    reason: format!("could not persist session token: {e}"),
                };
                warn!(run_id = %run_id, error = %err, "Session exchange failed");
                return self.fail(location, err);
            }
            Some(Ok(())) => {}
        }

        let progress = session.user.progress();
        let destination = progress.destination();
        let navigation = Navigation::with_user(destination, session.user.clone());

        let committed = self.lifetime.guard(self.deps.sessions.commit(session)).await;
        if committed.is_none() || self.lifetime.is_torn_down() {
            info!(run_id = %run_id, "Page torn down while committing session");
            self.discard_token(run_id).await;
            if committed.is_some() {
                self.deps.sessions.clear().await;
            }
            return ExchangeOutcome::Abandoned;
        }

        self.deps.host.replace_location(&without_credentials(location));
        self.deps.host.navigate(navigation);

        info!(
            run_id = %run_id,
            progress = %progress,
            destination = %destination,
            "Session exchange complete"
        );
        ExchangeOutcome::Authenticated { destination }
    }

    /// The two-hop remote chain. Errors are already classified.
    async fn exchange(
        &self,
        payload: &SessionPayload,
    ) -> Result<LocalSession, SessionExchangeError> {
        let identity = self
            .deps
            .identity
            .session_data(payload.session_id())
            .await
            .map_err(|e| SessionExchangeError::IdentityExchangeFailed {
                reason: e.to_string(),
            })?;

        self.deps
            .backend
            .create_session(&identity)
            .await
            .map_err(|e| SessionExchangeError::BackendSessionFailed {
                reason: e.to_string(),
            })
    }

    /// Undo a token write whose session never got committed.
    async fn discard_token(&self, run_id: Uuid) {
        if let Err(e) = self.deps.tokens.clear().await {
            warn!(run_id = %run_id, error = %e, "Could not discard session token");
        }
    }

    fn fail(&self, location: &Url, err: SessionExchangeError) -> ExchangeOutcome {
        if self.lifetime.is_torn_down() {
            return ExchangeOutcome::Abandoned;
        }
        self.deps.host.replace_location(&without_credentials(location));
        self.deps.host.navigate(Navigation::to(Destination::SignIn));
        ExchangeOutcome::Failed(err)
    }
}
