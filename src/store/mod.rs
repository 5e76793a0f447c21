//! Persistence layer: durable session token and in-memory auth state.

pub mod libsql_backend;
pub mod memory;
pub mod migrations;
pub mod traits;

pub use libsql_backend::LibSqlTokenStore;
pub use memory::{InMemorySessionStore, MemoryTokenStore};
pub use traits::{SESSION_TOKEN_KEY, SessionStore, TokenStore};
