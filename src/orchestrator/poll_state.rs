//! Payment verification state machine.
//!
//! Pure bookkeeping: the poller feeds it one check result per cycle and
//! does whatever it says next. Checking → {Paid, Expired, TimedOut,
//! Errored}; Cancelled and Errored(NoSessionId) are reachable only at entry.
//! Terminal statuses never change again.

use chrono::{DateTime, Utc};

use crate::error::{PaymentError, RemoteError};
use crate::redirect::PaymentPayload;
use crate::remote::CheckoutStatus;

/// Where a payment verification stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollStatus {
    Checking,
    Paid { plan_name: Option<String> },
    Expired,
    TimedOut,
    Errored(PaymentError),
    Cancelled,
}

impl PollStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Checking)
    }
}

/// What the poller should do after recording a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStep {
    /// Wait one interval, then check again.
    Retry,
    /// Terminal status reached.
    Done,
}

/// One payment verification run.
#[derive(Debug, Clone)]
pub struct PollState {
    session_id: Option<String>,
    attempt_count: u32,
    max_attempts: u32,
    status: PollStatus,
    started_at: DateTime<Utc>,
}

impl PollState {
    /// Entry transition from the return URL.
    pub fn start(payload: &PaymentPayload, max_attempts: u32) -> Self {
        let status = if payload.is_cancelled() {
            PollStatus::Cancelled
        } else if payload.session_id.is_none() {
            PollStatus::Errored(PaymentError::NoSessionId)
        } else {
            PollStatus::Checking
        };

        Self {
            session_id: payload.session_id.clone(),
            attempt_count: 0,
            max_attempts: max_attempts.max(1),
            status,
            started_at: Utc::now(),
        }
    }

    /// Record one status check.
    ///
    /// Pending responses and failures draw from the same attempt budget.
    pub fn record(&mut self, result: Result<CheckoutStatus, RemoteError>) -> PollStep {
        if self.status.is_terminal() {
            return PollStep::Done;
        }

        self.attempt_count += 1;
        let exhausted = self.attempt_count >= self.max_attempts;

        self.status = match result {
            Ok(checkout) if checkout.is_paid() => PollStatus::Paid {
                plan_name: checkout.plan_name,
            },
            Ok(checkout) if checkout.is_expired() => PollStatus::Expired,
            Ok(_) if exhausted => PollStatus::TimedOut,
            Err(e) if exhausted => PollStatus::Errored(PaymentError::PollTransientFailure {
                attempts: self.attempt_count,
                reason: e.to_string(),
            }),
            Ok(_) | Err(_) => PollStatus::Checking,
        };

        if self.status.is_terminal() {
            PollStep::Done
        } else {
            PollStep::Retry
        }
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn attempt_count(&self) -> u32 {
        self.attempt_count
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn status(&self) -> &PollStatus {
        &self.status
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// The failure behind a terminal error status, if any.
    pub fn error(&self) -> Option<PaymentError> {
        match &self.status {
            PollStatus::Expired => Some(PaymentError::PaymentExpired),
            PollStatus::TimedOut => Some(PaymentError::PollTimeout {
                attempts: self.attempt_count,
            }),
            PollStatus::Errored(e) => Some(e.clone()),
            PollStatus::Checking | PollStatus::Paid { .. } | PollStatus::Cancelled => None,
        }
    }
}
