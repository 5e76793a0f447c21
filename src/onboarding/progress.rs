//! Six-step onboarding progress, as reported by the backend.

use serde::{Deserialize, Serialize};

use crate::navigation::Destination;

/// Number of onboarding steps before the dashboard unlocks.
pub const TOTAL_STEPS: u32 = 6;

/// Completed-step counter for one user.
///
/// Progresses linearly: 0 (nothing done) → 1 → ... → 6 (complete). Values
/// above 6 are treated as complete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OnboardingProgress(u32);

impl OnboardingProgress {
    /// Build from the backend's `onboarding_step`; a missing value means 0.
    pub fn from_reported(step: Option<u32>) -> Self {
        Self(step.unwrap_or(0))
    }

    /// Number of completed steps.
    pub fn completed(&self) -> u32 {
        self.0
    }

    /// Whether every step is done.
    pub fn is_complete(&self) -> bool {
        self.0 >= TOTAL_STEPS
    }

    /// The step the user should work on next, if any.
    pub fn next_step(&self) -> Option<u32> {
        if self.is_complete() {
            None
        } else {
            Some(self.0 + 1)
        }
    }

    /// Where to send the user after signing in.
    pub fn destination(&self) -> Destination {
        match self.next_step() {
            Some(step) => Destination::OnboardingStep(step),
            None => Destination::Dashboard,
        }
    }
}

impl std::fmt::Display for OnboardingProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{TOTAL_STEPS}", self.0.min(TOTAL_STEPS))
    }
}
