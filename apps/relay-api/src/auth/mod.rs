//! Identity collaborator for the relay.
//!
//! The gateway consumes a verified identity and nothing else; credential
//! checking sits behind the [`Authenticator`] trait so a hosted provider can
//! replace the store-backed implementation.

use std::sync::Arc;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::models::user::UserRecord;
use crate::store::MessageStore;

/// A verified `{userId, username}` pair.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: String,
    pub username: String,
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("authentication backend unavailable")]
    Unavailable,
}

#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, username: &str, password: &str) -> Result<Identity, AuthError>;
}

/// Verifies credentials against the primary store. An unknown username is
/// registered on first login, which collapses the app's separate
/// register/login flows into one call.
pub struct StoreAuthenticator {
    store: Arc<dyn MessageStore>,
}

impl StoreAuthenticator {
    pub fn new(store: Arc<dyn MessageStore>) -> Self {
        Self { store }
    }

    fn digest(password: &str) -> String {
        hex::encode(Sha256::digest(password.as_bytes()))
    }
}

#[async_trait]
impl Authenticator for StoreAuthenticator {
    async fn authenticate(&self, username: &str, password: &str) -> Result<Identity, AuthError> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(AuthError::InvalidCredentials);
        }

        match self.store.find_user(username).await {
            Ok(Some(user)) => {
                if user.password_hash == Self::digest(password) {
                    Ok(Identity {
                        user_id: user.id,
                        username: user.username,
                    })
                } else {
                    Err(AuthError::InvalidCredentials)
                }
            }
            Ok(None) => {
                let user = UserRecord::new(username, Self::digest(password));
                self.store.insert_user(&user).await.map_err(|err| {
                    tracing::error!(%err, "failed to register user");
                    AuthError::Unavailable
                })?;
                tracing::info!(username, "registered new user");
                Ok(Identity {
                    user_id: user.id,
                    username: user.username,
                })
            }
            Err(err) => {
                tracing::error!(%err, "user lookup failed");
                Err(AuthError::Unavailable)
            }
        }
    }
}
