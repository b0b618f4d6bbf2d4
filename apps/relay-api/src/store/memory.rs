//! In-memory `MessageStore`, used by tests and for DATABASE_URL-less dev runs.

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{MessageStore, Result};
use crate::models::message::ChatMessage;
use crate::models::user::UserRecord;

pub struct MemoryStore {
    users: Mutex<Vec<UserRecord>>,
    messages: Mutex<Vec<ChatMessage>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            users: Mutex::new(Vec::new()),
            messages: Mutex::new(Vec::new()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn find_user(&self, username: &str) -> Result<Option<UserRecord>> {
        Ok(self
            .users
            .lock()
            .iter()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn insert_user(&self, user: &UserRecord) -> Result<()> {
        self.users.lock().push(user.clone());
        Ok(())
    }

    async fn insert_message(&self, message: &ChatMessage) -> Result<()> {
        self.messages.lock().push(message.clone());
        Ok(())
    }

    async fn list_messages(&self) -> Result<Vec<ChatMessage>> {
        Ok(self.messages.lock().clone())
    }
}
