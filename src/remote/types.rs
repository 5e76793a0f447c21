//! Wire and domain types exchanged with the identity provider and backend.

use rust_decimal::Decimal;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::onboarding::OnboardingProgress;

/// Identity-provider session data, as sent on the wire.
#[derive(Debug, Deserialize)]
pub(crate) struct IdentityResponse {
    pub id: String,
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub picture: Option<String>,
    pub session_token: String,
}

/// Identity verified by the external provider.
///
/// Produced by the first hop of the session exchange and consumed by the
/// second; never stored.
#[derive(Debug, Clone)]
pub struct IdentityRecord {
    pub external_id: String,
    pub email: String,
    pub name: String,
    pub picture_url: Option<String>,
    pub provider_session_token: SecretString,
}

impl From<IdentityResponse> for IdentityRecord {
    fn from(wire: IdentityResponse) -> Self {
        Self {
            external_id: wire.id,
            email: wire.email,
            name: wire.name,
            picture_url: wire.picture,
            provider_session_token: SecretString::from(wire.session_token),
        }
    }
}

/// User record returned by the backend.
///
/// Only the onboarding counter drives routing; every other field is carried
/// through untouched as navigation state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionUser {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub onboarding_step: Option<u32>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl SessionUser {
    pub fn progress(&self) -> OnboardingProgress {
        OnboardingProgress::from_reported(self.onboarding_step)
    }
}

/// Backend session-creation response, as sent on the wire.
#[derive(Debug, Deserialize)]
pub(crate) struct SessionResponse {
    pub session_token: String,
    pub user: SessionUser,
}

/// Authenticated local session handed to the application's session store.
#[derive(Debug, Clone)]
pub struct LocalSession {
    pub session_token: SecretString,
    pub user: SessionUser,
}

impl From<SessionResponse> for LocalSession {
    fn from(wire: SessionResponse) -> Self {
        Self {
            session_token: SecretString::from(wire.session_token),
            user: wire.user,
        }
    }
}

/// Payment gateway checkout status, relayed by the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutStatus {
    #[serde(default)]
    pub payment_status: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub plan_name: Option<String>,
}

impl CheckoutStatus {
    pub fn is_paid(&self) -> bool {
        self.payment_status.as_deref() == Some("paid")
    }

    pub fn is_expired(&self) -> bool {
        self.status.as_deref() == Some("expired")
    }
}

/// A subscription plan offered at checkout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub id: String,
    pub name: String,
    pub price: Decimal,
    pub currency: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PlansResponse {
    pub plans: Vec<Plan>,
}

/// Backend health check response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub service: Option<String>,
}

impl HealthStatus {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}
