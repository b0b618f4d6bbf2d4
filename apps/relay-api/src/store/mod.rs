//! Storage tiers for the relay.
//!
//! The primary store sits behind the [`MessageStore`] trait so the server can
//! run against Postgres in production and an in-memory map in tests; the
//! secondary mirror and the local backup writer live in their own modules.

pub mod backup;
pub mod memory;
pub mod mirror;
pub mod pg;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::message::ChatMessage;
use crate::models::user::UserRecord;

/// Errors produced by the storage tiers.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("connection pool error: {0}")]
    Pool(#[from] diesel_async::pooled_connection::deadpool::PoolError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Object-store key contained a path separator or traversal component.
    #[error("invalid blob key: {0}")]
    InvalidKey(String),

    /// The backend could not be reached or refused the operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// The primary persistence backend: users and the durable message log.
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn find_user(&self, username: &str) -> Result<Option<UserRecord>>;
    async fn insert_user(&self, user: &UserRecord) -> Result<()>;
    async fn insert_message(&self, message: &ChatMessage) -> Result<()>;
    /// Full message log, ordered by send time ascending.
    async fn list_messages(&self) -> Result<Vec<ChatMessage>>;
}
