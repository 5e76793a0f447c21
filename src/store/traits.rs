//! Client-side state shared beyond a single orchestration run.
//!
//! Two pieces of state outlive an orchestrator: the persisted session token
//! (durable, used as an `Authorization` fallback) and the application-wide
//! session record. Both are written once, right after a successful session
//! exchange.

use async_trait::async_trait;
use secrecy::SecretString;

use crate::error::DatabaseError;
use crate::remote::LocalSession;

/// Storage key for the persisted session token.
pub const SESSION_TOKEN_KEY: &str = "session_token";

/// Durable storage for the session token.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Persist the token, replacing any previous one.
    async fn save(&self, token: &SecretString) -> Result<(), DatabaseError>;

    /// Load the persisted token, if any.
    async fn load(&self) -> Result<Option<SecretString>, DatabaseError>;

    /// Forget the token. Returns whether one was stored.
    async fn clear(&self) -> Result<bool, DatabaseError>;
}

/// The application's auth state. Orchestrators hand sessions off here and
/// keep nothing themselves.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn commit(&self, session: LocalSession);

    async fn current(&self) -> Option<LocalSession>;

    async fn clear(&self);
}
