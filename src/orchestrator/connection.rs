//! OAuth connection callback handler.
//!
//! The provider redirects back with either `code` (+ `state`) or `error`.
//! A code is handed to the backend, which finishes the token exchange and
//! stores the connection. Success returns to the originating onboarding
//! step at once; any failure shows a message first and returns after a
//! delay.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ConnectionConfig;
use crate::error::ConnectionError;
use crate::lifetime::{PageLifetime, Timer};
use crate::navigation::{Destination, Navigation, Notice, PageHost};
use crate::redirect::OAuthPayload;
use crate::remote::Backend;

const CONNECTED_MESSAGE: &str = "Account connected successfully!";
const GENERIC_FAILURE: &str = "Failed to connect account. Please try again.";

/// Terminal result of one callback invocation.
#[derive(Debug)]
pub enum ConnectionOutcome {
    Connected,
    Failed(ConnectionError),
    /// Same parameters as the previous invocation; ignored.
    Duplicate,
    /// A newer invocation arrived while this one was in flight.
    Superseded,
    /// The page was torn down first.
    Abandoned,
}

#[derive(Default)]
struct HandlerState {
    generation: u64,
    last_payload: Option<OAuthPayload>,
    pending_redirect: Option<Timer>,
}

pub struct ConnectionCallbackHandler {
    backend: Arc<dyn Backend>,
    host: Arc<dyn PageHost>,
    config: ConnectionConfig,
    lifetime: PageLifetime,
    state: Mutex<HandlerState>,
}

impl ConnectionCallbackHandler {
    pub fn new(
        backend: Arc<dyn Backend>,
        host: Arc<dyn PageHost>,
        config: ConnectionConfig,
        lifetime: PageLifetime,
    ) -> Self {
        Self {
            backend,
            host,
            config,
            lifetime,
            state: Mutex::new(HandlerState::default()),
        }
    }

    /// Handle one callback.
    ///
    /// Re-invoking with identical parameters is a no-op. Different
    /// parameters cancel any redirect the previous invocation scheduled.
    pub async fn handle(&self, payload: OAuthPayload) -> ConnectionOutcome {
        let generation = {
            let mut state = self.lock();
            if state.last_payload.as_ref() == Some(&payload) {
                debug!("Connection callback already handled for these parameters; ignoring");
                return ConnectionOutcome::Duplicate;
            }
            state.last_payload = Some(payload.clone());
            state.generation += 1;
            if let Some(timer) = state.pending_redirect.take() {
                timer.cancel();
            }
            state.generation
        };

        if self.lifetime.is_torn_down() {
            return ConnectionOutcome::Abandoned;
        }

        let run_id = Uuid::new_v4();
        info!(
            run_id = %run_id,
            provider = %self.config.provider,
            has_code = payload.code.is_some(),
            "Handling connection callback"
        );

        let result = match self.connect(&payload).await {
            Some(result) => result,
            None => {
                info!(run_id = %run_id, "Page torn down during connection callback");
                return ConnectionOutcome::Abandoned;
            }
        };

        let mut state = self.lock();
        if state.generation != generation {
            debug!(run_id = %run_id, "Connection callback superseded by a newer one");
            return ConnectionOutcome::Superseded;
        }
        if self.lifetime.is_torn_down() {
            return ConnectionOutcome::Abandoned;
        }

        let origin = Destination::OnboardingStep(self.config.origin_step);
        match result {
            Ok(()) => {
                info!(run_id = %run_id, "Account connected");
                self.host.notify(Notice::Success(CONNECTED_MESSAGE.to_string()));
                self.host.navigate(Navigation::to(origin));
                ConnectionOutcome::Connected
            }
            Err(err) => {
                warn!(run_id = %run_id, error = %err, "Connection callback failed");
                self.host.notify(Notice::Error(err.user_message()));

                let host = Arc::clone(&self.host);
                state.pending_redirect = Some(Timer::schedule(
                    &self.lifetime,
                    self.config.redirect_delay,
                    move || host.navigate(Navigation::to(origin)),
                ));
                ConnectionOutcome::Failed(err)
            }
        }
    }

    /// `None` if the page was torn down during the backend call.
    async fn connect(&self, payload: &OAuthPayload) -> Option<Result<(), ConnectionError>> {
        if let Some(code) = &payload.error {
            return Some(Err(ConnectionError::ProviderDenied { code: code.clone() }));
        }
        let Some(code) = payload.code.as_deref() else {
            return Some(Err(ConnectionError::MissingCode));
        };

        let result = self
            .lifetime
            .guard(self.backend.connect_callback(code, payload.state.as_deref()))
            .await?;

        Some(result.map_err(|e| ConnectionError::ConnectionFailed {
            message: e.detail().unwrap_or(GENERIC_FAILURE).to_string(),
        }))
    }

    pub fn has_pending_redirect(&self) -> bool {
        self.lock()
            .pending_redirect
            .as_ref()
            .is_some_and(|t| !t.is_finished())
    }

    /// Wait for a scheduled delayed redirect to fire or be cancelled.
    ///
    /// For hosts that exit once the redirect happened.
    pub async fn redirect_settled(&self) {
        let timer = self.lock().pending_redirect.take();
        if let Some(mut timer) = timer {
            timer.settled().await;
        }
    }

    /// Tear the page down and cancel any pending redirect.
    pub fn teardown(&self) {
        self.lifetime.teardown();
        if let Some(timer) = self.lock().pending_redirect.take() {
            timer.cancel();
        }
    }

    fn lock(&self) -> MutexGuard<'_, HandlerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}
