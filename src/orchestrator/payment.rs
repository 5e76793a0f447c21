//! Payment poller: verifies a checkout session after the gateway redirect.
//!
//! One status check per cycle, a fixed wait between cycles, a hard cap on
//! cycles. The render state is published on a `watch` channel so the page
//! can draw it; the only navigation is the explicit "continue to sign in".

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::OneShotGuard;
use super::poll_state::{PollState, PollStatus, PollStep};
use crate::config::PollConfig;
use crate::lifetime::PageLifetime;
use crate::navigation::{Destination, Navigation, PageHost};
use crate::redirect::PaymentPayload;
use crate::remote::Backend;

/// What the payment result page shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PaymentView {
    Checking { attempt: u32 },
    Success { plan_name: Option<String> },
    Cancelled,
    Error { message: String },
}

impl PaymentView {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Checking { .. })
    }
}

impl From<&PollState> for PaymentView {
    fn from(state: &PollState) -> Self {
        match state.status() {
            PollStatus::Checking => Self::Checking {
                attempt: state.attempt_count(),
            },
            PollStatus::Paid { plan_name } => Self::Success {
                plan_name: plan_name.clone(),
            },
            PollStatus::Cancelled => Self::Cancelled,
            PollStatus::Expired | PollStatus::TimedOut | PollStatus::Errored(_) => Self::Error {
                message: state
                    .error()
                    .map(|e| e.user_message().to_string())
                    .unwrap_or_default(),
            },
        }
    }
}

/// Terminal result of one poller run.
#[derive(Debug)]
pub enum PaymentOutcome {
    Finished(PollState),
    /// This mount already started polling.
    Duplicate,
    /// Torn down before a terminal status; the view was left as it was.
    Abandoned,
}

pub struct PaymentPoller {
    backend: Arc<dyn Backend>,
    host: Arc<dyn PageHost>,
    config: PollConfig,
    lifetime: PageLifetime,
    guard: OneShotGuard,
    continued: OneShotGuard,
    view: watch::Sender<PaymentView>,
}

impl PaymentPoller {
    pub fn new(
        backend: Arc<dyn Backend>,
        host: Arc<dyn PageHost>,
        config: PollConfig,
        lifetime: PageLifetime,
    ) -> Self {
        let (view, _rx) = watch::channel(PaymentView::Checking { attempt: 0 });
        Self {
            backend,
            host,
            config,
            lifetime,
            guard: OneShotGuard::new(),
            continued: OneShotGuard::new(),
            view,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<PaymentView> {
        self.view.subscribe()
    }

    pub fn view(&self) -> PaymentView {
        self.view.borrow().clone()
    }

    /// Poll until paid, expired, cancelled or out of attempts.
    pub async fn run(&self, payload: &PaymentPayload) -> PaymentOutcome {
        if !self.guard.try_acquire() {
            debug!("Payment polling already started for this page; ignoring");
            return PaymentOutcome::Duplicate;
        }

        let run_id = Uuid::new_v4();
        let mut state = PollState::start(payload, self.config.max_attempts);
        self.publish(&state);

        let session_id = state
            .session_id()
            .filter(|_| !state.is_terminal())
            .map(str::to_owned);
        let Some(session_id) = session_id else {
            info!(run_id = %run_id, status = ?state.status(), "Payment check finished at entry");
            return PaymentOutcome::Finished(state);
        };

        info!(
            run_id = %run_id,
            max_attempts = state.max_attempts(),
            "Verifying payment"
        );

        loop {
            let Some(result) = self
                .lifetime
                .guard(self.backend.checkout_status(&session_id))
                .await
            else {
                info!(run_id = %run_id, "Page torn down during payment check");
                return PaymentOutcome::Abandoned;
            };

            if let Err(e) = &result {
                warn!(
                    run_id = %run_id,
                    attempt = state.attempt_count() + 1,
                    error = %e,
                    "Payment status check failed"
                );
            }

            let step = state.record(result);
            if self.lifetime.is_torn_down() {
                return PaymentOutcome::Abandoned;
            }
            self.publish(&state);

            match step {
                PollStep::Done => break,
                PollStep::Retry => {
                    debug!(
                        run_id = %run_id,
                        attempt = state.attempt_count(),
                        "Payment still pending"
                    );
                    if !self.lifetime.sleep(self.config.interval).await {
                        info!(run_id = %run_id, "Page torn down while waiting to re-poll");
                        return PaymentOutcome::Abandoned;
                    }
                }
            }
        }

        let elapsed = Utc::now() - state.started_at();
        info!(
            run_id = %run_id,
            attempts = state.attempt_count(),
            elapsed_ms = elapsed.num_milliseconds(),
            status = ?state.status(),
            "Payment check finished"
        );
        PaymentOutcome::Finished(state)
    }

    /// The result page's single action. Only available once the view is
    /// terminal; navigates at most once.
    pub fn continue_to_sign_in(&self) -> bool {
        if !self.view.borrow().is_terminal() || self.lifetime.is_torn_down() {
            return false;
        }
        if !self.continued.try_acquire() {
            return false;
        }
        self.host.navigate(Navigation::to(Destination::SignIn));
        true
    }

    fn publish(&self, state: &PollState) {
        self.view.send_replace(PaymentView::from(state));
    }
}
