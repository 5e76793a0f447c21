//! In-memory stores, for tests and for hosts without durable storage.

use async_trait::async_trait;
use secrecy::SecretString;
use tokio::sync::RwLock;

use super::traits::{SessionStore, TokenStore};
use crate::error::DatabaseError;
use crate::remote::LocalSession;

/// Token store that forgets everything on drop.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: RwLock<Option<SecretString>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn save(&self, token: &SecretString) -> Result<(), DatabaseError> {
        *self.token.write().await = Some(token.clone());
        Ok(())
    }

    async fn load(&self) -> Result<Option<SecretString>, DatabaseError> {
        Ok(self.token.read().await.clone())
    }

    async fn clear(&self) -> Result<bool, DatabaseError> {
        Ok(self.token.write().await.take().is_some())
    }
}

/// Application-wide session record.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    session: RwLock<Option<LocalSession>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn commit(&self, session: LocalSession) {
        tracing::debug!(user_id = ?session.user.id, "Session committed");
        *self.session.write().await = Some(session);
    }

    async fn current(&self) -> Option<LocalSession> {
        self.session.read().await.clone()
    }

    async fn clear(&self) {
        self.session.write().await.take();
    }
}
