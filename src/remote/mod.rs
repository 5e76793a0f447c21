//! Remote collaborators: the identity provider and the backend API.
//!
//! The orchestrators only see the [`IdentityProvider`] and [`Backend`]
//! traits; the reqwest implementations live in [`identity`] and [`backend`].

pub mod backend;
pub mod identity;
pub mod types;

pub use backend::HttpBackend;
pub use identity::HttpIdentityProvider;
pub use types::{
    CheckoutStatus, HealthStatus, IdentityRecord, LocalSession, Plan, SessionUser,
};

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::error::RemoteError;

/// Identity provider session-data lookup.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolve a one-shot provider session id into identity data.
    async fn session_data(&self, session_id: &str) -> Result<IdentityRecord, RemoteError>;
}

/// The backend endpoints the orchestrators call.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Create a local session from a verified identity.
    async fn create_session(&self, identity: &IdentityRecord) -> Result<LocalSession, RemoteError>;

    /// Complete a third-party OAuth connection.
    async fn connect_callback(&self, code: &str, state: Option<&str>) -> Result<(), RemoteError>;

    /// Look up a checkout session. Must not require authentication.
    async fn checkout_status(&self, session_id: &str) -> Result<CheckoutStatus, RemoteError>;
}

/// Map a transport failure.
pub(crate) fn transport(endpoint: &str, err: reqwest::Error) -> RemoteError {
    RemoteError::Transport {
        endpoint: endpoint.to_string(),
        reason: err.to_string(),
    }
}

/// Fail on non-2xx, keeping the server's `detail` when it sent one.
pub(crate) async fn check_status(
    endpoint: &str,
    resp: reqwest::Response,
) -> Result<reqwest::Response, RemoteError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    Err(RemoteError::Status {
        endpoint: endpoint.to_string(),
        status: status.as_u16(),
        detail: error_detail(&body),
    })
}

/// Decode a successful JSON body.
pub(crate) async fn read_json<T: DeserializeOwned>(
    endpoint: &str,
    resp: reqwest::Response,
) -> Result<T, RemoteError> {
    let resp = check_status(endpoint, resp).await?;
    let bytes = resp.bytes().await.map_err(|e| transport(endpoint, e))?;
    serde_json::from_slice(&bytes).map_err(|e| RemoteError::InvalidResponse {
        endpoint: endpoint.to_string(),
        reason: e.to_string(),
    })
}

/// Pull `detail` out of a FastAPI-style error body.
fn error_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        serde_json::Value::String(_) | serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }
}
