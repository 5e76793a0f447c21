//! Identity provider client: resolves the redirect's session id.

use async_trait::async_trait;

use super::types::{IdentityRecord, IdentityResponse};
use super::{IdentityProvider, read_json, transport};
use crate::config::ClientConfig;
use crate::error::RemoteError;

/// Header carrying the provider session id.
const SESSION_ID_HEADER: &str = "X-Session-ID";

/// reqwest-backed identity provider.
pub struct HttpIdentityProvider {
    url: String,
    client: reqwest::Client,
}

impl HttpIdentityProvider {
    pub fn new(config: &ClientConfig) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| transport(&config.identity_url, e))?;
        Ok(Self {
            url: config.identity_url.clone(),
            client,
        })
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn session_data(&self, session_id: &str) -> Result<IdentityRecord, RemoteError> {
        let resp = self
            .client
            .get(&self.url)
            .header(SESSION_ID_HEADER, session_id)
            .send()
            .await
            .map_err(|e| transport(&self.url, e))?;

        let wire: IdentityResponse = read_json(&self.url, resp).await?;
        tracing::debug!(external_id = %wire.id, "Identity provider returned session data");
        Ok(wire.into())
    }
}
