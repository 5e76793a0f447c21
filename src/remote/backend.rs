//! Backend API client.
//!
//! Keeps a cookie jar for the lifetime of the client so a session cookie set
//! by `POST /api/auth/session` is replayed on later calls. The persisted
//! session token is sent as `Authorization: Bearer` on authenticated calls as
//! a fallback for environments where the cookie is not accepted.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Url;
use secrecy::ExposeSecret;

use super::types::{
    CheckoutStatus, HealthStatus, IdentityRecord, LocalSession, Plan, PlansResponse,
    SessionResponse, SessionUser,
};
use super::{Backend, check_status, read_json, transport};
use crate::config::ClientConfig;
use crate::error::{Error, RemoteError};
use crate::store::TokenStore;

/// reqwest-backed backend client.
pub struct HttpBackend {
    base: Url,
    provider: String,
    client: reqwest::Client,
    tokens: Arc<dyn TokenStore>,
}

impl HttpBackend {
    pub fn new(config: &ClientConfig, tokens: Arc<dyn TokenStore>) -> Result<Self, RemoteError> {
        let base = Url::parse(&config.api_url).map_err(|e| RemoteError::Transport {
            endpoint: config.api_url.clone(),
            reason: format!("invalid base URL: {e}"),
        })?;
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| transport(&config.api_url, e))?;

        Ok(Self {
            base,
            provider: config.connection.provider.clone(),
            client,
            tokens,
        })
    }

    /// Build an endpoint URL from path segments; each segment is escaped.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, RemoteError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| RemoteError::Transport {
                endpoint: self.base.to_string(),
                reason: "base URL cannot carry a path".to_string(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Attach the persisted token, if there is one.
    async fn with_bearer(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.tokens.load().await {
            Ok(Some(token)) => req.bearer_auth(token.expose_secret()),
            Ok(None) => req,
            Err(e) => {
                tracing::warn!("Could not read persisted session token: {e}");
                req
            }
        }
    }

    /// `GET /api/health`
    pub async fn health(&self) -> Result<HealthStatus, RemoteError> {
        let url = self.endpoint(&["api", "health"])?;
        let resp = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| transport(url.path(), e))?;
        read_json(url.path(), resp).await
    }

    /// `GET /api/auth/me`, the user behind the current session.
    pub async fn current_user(&self) -> Result<SessionUser, RemoteError> {
        let url = self.endpoint(&["api", "auth", "me"])?;
        let req = self.with_bearer(self.client.get(url.clone())).await;
        let resp = req.send().await.map_err(|e| transport(url.path(), e))?;
        read_json(url.path(), resp).await
    }

    /// `POST /api/auth/logout`, then forget the persisted token.
    ///
    /// The token is cleared even if the backend call fails.
    pub async fn logout(&self) -> crate::error::Result<()> {
        let url = self.endpoint(&["api", "auth", "logout"])?;
        let req = self.with_bearer(self.client.post(url.clone())).await;
        let result = match req.send().await {
            Ok(resp) => check_status(url.path(), resp).await.map(|_| ()),
            Err(e) => Err(transport(url.path(), e)),
        };

        let cleared = self.tokens.clear().await?;
        tracing::info!(token_cleared = cleared, "Logged out");
        result.map_err(Error::from)
    }

    /// `GET /api/stripe/plans`
    pub async fn plans(&self) -> Result<Vec<Plan>, RemoteError> {
        let url = self.endpoint(&["api", "stripe", "plans"])?;
        let resp = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| transport(url.path(), e))?;
        let body: PlansResponse = read_json(url.path(), resp).await?;
        Ok(body.plans)
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn create_session(&self, identity: &IdentityRecord) -> Result<LocalSession, RemoteError> {
        let url = self.endpoint(&["api", "auth", "session"])?;
        let body = serde_json::json!({
            "user_id": identity.external_id,
            "email": identity.email,
            "name": identity.name,
            "picture": identity.picture_url,
            "session_token": identity.provider_session_token.expose_secret(),
        });

        let resp = self
            .client
            .post(url.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| transport(url.path(), e))?;

        let wire: SessionResponse = read_json(url.path(), resp).await?;
        Ok(wire.into())
    }

    async fn connect_callback(&self, code: &str, state: Option<&str>) -> Result<(), RemoteError> {
        let url = self.endpoint(&["api", "integrations", self.provider.as_str(), "callback"])?;
        let mut params = vec![("code", code)];
        if let Some(state) = state {
            params.push(("state", state));
        }

        let req = self
            .with_bearer(self.client.post(url.clone()).query(&params))
            .await;
        let resp = req.send().await.map_err(|e| transport(url.path(), e))?;
        check_status(url.path(), resp).await?;
        Ok(())
    }

    async fn checkout_status(&self, session_id: &str) -> Result<CheckoutStatus, RemoteError> {
        let url = self.endpoint(&["api", "stripe", "checkout-status", session_id])?;
        // No Authorization header: the user may not be signed in yet.
        let resp = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| transport(url.path(), e))?;
        read_json(url.path(), resp).await
    }
}
