//! Redirect orchestrators.
//!
//! Each orchestrator is mounted by one page, consumes one externally
//! triggered redirect, performs its remote calls strictly in sequence and
//! ends in exactly one terminal outcome:
//!
//! - [`SessionExchange`]: identity-provider session id → local session →
//!   onboarding/dashboard routing.
//! - [`ConnectionCallbackHandler`]: OAuth authorization code → stored
//!   integration connection.
//! - [`PaymentPoller`]: checkout session id → bounded status polling.
//!
//! All three share the same guard against duplicate lifecycle firing and the
//! same [`PageLifetime`](crate::lifetime::PageLifetime) teardown contract.

pub mod connection;
pub mod payment;
pub mod poll_state;
pub mod session_exchange;

pub use connection::{ConnectionCallbackHandler, ConnectionOutcome};
pub use payment::{PaymentOutcome, PaymentPoller, PaymentView};
pub use poll_state::{PollState, PollStatus, PollStep};
pub use session_exchange::{ExchangeDeps, ExchangeOutcome, SessionExchange};

use std::sync::atomic::{AtomicBool, Ordering};

/// One-shot latch: the first `try_acquire` wins, every later one loses.
///
/// Acquire synchronously before the first suspension point so a duplicate
/// mount cannot slip in between the check and the first remote call.
#[derive(Debug, Default)]
pub struct OneShotGuard {
    fired: AtomicBool,
}

impl OneShotGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` exactly once per guard.
    pub fn try_acquire(&self) -> bool {
        !self.fired.swap(true, Ordering::AcqRel)
    }
}
