//! Onboard callbacks: client-side handling of the three external redirects
//! that land a user back in the app (identity provider sign-in, OAuth
//! integration connect, payment gateway return).

pub mod config;
pub mod error;
pub mod lifetime;
pub mod navigation;
pub mod onboarding;
pub mod orchestrator;
pub mod redirect;
pub mod remote;
pub mod store;
