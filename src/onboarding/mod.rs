//! Onboarding progression: where a signed-in user lands next.
//!
//! The onboarding flow is a fixed sequence of six steps. The backend reports
//! how many the user has completed as `onboarding_step`; everything the
//! session exchange needs to route the user is derived from that number.

pub mod progress;

pub use progress::{OnboardingProgress, TOTAL_STEPS};
