//! libSQL-backed durable client storage.
//!
//! A small key/value table; the session token lives under
//! [`SESSION_TOKEN_KEY`].

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use libsql::{Connection, Database as LibSqlDatabase, params};
use secrecy::{ExposeSecret, SecretString};
use tracing::info;

use super::migrations;
use super::traits::{SESSION_TOKEN_KEY, TokenStore};
use crate::error::DatabaseError;

/// Key/value client storage on a local libSQL database.
pub struct LibSqlTokenStore {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlTokenStore {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let store = Self::open(path.to_string_lossy().as_ref()).await?;
        info!(path = %path.display(), "Client storage opened");
        Ok(store)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        Self::open(":memory:").await
    }

    async fn open(location: &str) -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(location)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        migrations::run_migrations(&conn).await?;
        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, DatabaseError> {
        let mut rows = self
            .conn
            .query(
                "SELECT value FROM client_storage WHERE key = ?1",
                params![key],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => row
                .get::<String>(0)
                .map(Some)
                .map_err(|e| DatabaseError::Query(format!("get: {e}"))),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get: {e}"))),
        }
    }

    pub async fn set(&self, key: &str, value: &str) -> Result<(), DatabaseError> {
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO client_storage (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT (key) DO UPDATE SET value = ?2, updated_at = ?3",
                params![key, value, now],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("set: {e}")))?;
        Ok(())
    }

    pub async fn delete(&self, key: &str) -> Result<bool, DatabaseError> {
        let count = self
            .conn
            .execute("DELETE FROM client_storage WHERE key = ?1", params![key])
            .await
            .map_err(|e| DatabaseError::Query(format!("delete: {e}")))?;
        Ok(count > 0)
    }
}

#[async_trait]
impl TokenStore for LibSqlTokenStore {
    async fn save(&self, token: &SecretString) -> Result<(), DatabaseError> {
        self.set(SESSION_TOKEN_KEY, token.expose_secret()).await
    }

    async fn load(&self) -> Result<Option<SecretString>, DatabaseError> {
        Ok(self.get(SESSION_TOKEN_KEY).await?.map(SecretString::from))
    }

    async fn clear(&self) -> Result<bool, DatabaseError> {
        self.delete(SESSION_TOKEN_KEY).await
    }
}
