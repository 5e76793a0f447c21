//! Navigation targets and the host page seam the orchestrators drive.

use std::sync::Mutex;

use serde::Serialize;

use crate::remote::SessionUser;

/// Outbound redirect target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "target", content = "step", rename_all = "snake_case")]
pub enum Destination {
    /// Sign-in entry point.
    SignIn,
    /// Onboarding step N (1..=6).
    OnboardingStep(u32),
    /// Main dashboard.
    Dashboard,
}

impl Destination {
    /// Client-side route for this destination.
    pub fn path(&self) -> String {
        match self {
            Self::SignIn => "/login".to_string(),
            Self::OnboardingStep(step) => format!("/onboarding/step-{step}"),
            Self::Dashboard => "/dashboard".to_string(),
        }
    }
}

impl std::fmt::Display for Destination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.path())
    }
}

/// A navigation request, optionally carrying the signed-in user as route state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Navigation {
    pub destination: Destination,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<SessionUser>,
}

impl Navigation {
    pub fn to(destination: Destination) -> Self {
        Self {
            destination,
            user: None,
        }
    }

    pub fn with_user(destination: Destination, user: SessionUser) -> Self {
        Self {
            destination,
            user: Some(user),
        }
    }
}

/// User-facing message raised by an orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum Notice {
    Success(String),
    Error(String),
}

/// The page hosting an orchestrator.
///
/// Calls arrive on the orchestrator's task; implementations must not block.
pub trait PageHost: Send + Sync {
    /// Leave the current page.
    fn navigate(&self, navigation: Navigation);

    /// Replace the current history entry without navigating.
    fn replace_location(&self, location: &str);

    /// Show a message to the user.
    fn notify(&self, notice: Notice);
}

/// Everything a host was asked to do, in order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HostEvent {
    Navigate(Navigation),
    ReplaceLocation { location: String },
    Notify(Notice),
}

/// Host that records every request. Used by the CLI and by tests.
#[derive(Debug, Default)]
pub struct RecordingHost {
    events: Mutex<Vec<HostEvent>>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all recorded events.
    pub fn events(&self) -> Vec<HostEvent> {
        self.lock().clone()
    }

    /// Drain recorded events.
    pub fn take_events(&self) -> Vec<HostEvent> {
        std::mem::take(&mut *self.lock())
    }

    /// All navigations, in order.
    pub fn navigations(&self) -> Vec<Navigation> {
        self.lock()
            .iter()
            .filter_map(|e| match e {
                HostEvent::Navigate(nav) => Some(nav.clone()),
                _ => None,
            })
            .collect()
    }

    /// All notices, in order.
    pub fn notices(&self) -> Vec<Notice> {
        self.lock()
            .iter()
            .filter_map(|e| match e {
                HostEvent::Notify(notice) => Some(notice.clone()),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: HostEvent) {
        self.lock().push(event);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<HostEvent>> {
        // A poisoned log is still a valid log.
        self.events.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl PageHost for RecordingHost {
    fn navigate(&self, navigation: Navigation) {
        tracing::debug!(destination = %navigation.destination, "Navigate");
        self.push(HostEvent::Navigate(navigation));
    }

    fn replace_location(&self, location: &str) {
        self.push(HostEvent::ReplaceLocation {
            location: location.to_string(),
        });
    }

    fn notify(&self, notice: Notice) {
        self.push(HostEvent::Notify(notice));
    }
}
