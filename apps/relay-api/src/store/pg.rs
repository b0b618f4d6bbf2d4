//! Postgres-backed `MessageStore` over the diesel-async pool.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::result::OptionalExtension;

use super::{MessageStore, Result};
use crate::db::pool::DbPool;
use crate::db::schema::{messages, users};
use crate::models::message::{ChatMessage, MessageRow, NewMessageRow};
use crate::models::user::UserRecord;

pub struct PgMessageStore {
    pool: DbPool,
}

impl PgMessageStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageStore for PgMessageStore {
    async fn find_user(&self, username: &str) -> Result<Option<UserRecord>> {
        let mut conn = self.pool.get().await?;

        let user: Option<UserRecord> = diesel_async::RunQueryDsl::get_result(
            users::table
                .filter(users::username.eq(username))
                .select(UserRecord::as_select()),
            &mut conn,
        )
        .await
        .optional()?;

        Ok(user)
    }

    async fn insert_user(&self, user: &UserRecord) -> Result<()> {
        let mut conn = self.pool.get().await?;

        diesel_async::RunQueryDsl::execute(
            diesel::insert_into(users::table).values(user.clone()),
            &mut conn,
        )
        .await?;

        Ok(())
    }

    async fn insert_message(&self, message: &ChatMessage) -> Result<()> {
        let mut conn = self.pool.get().await?;

        diesel_async::RunQueryDsl::execute(
            diesel::insert_into(messages::table).values(NewMessageRow::from(message)),
            &mut conn,
        )
        .await?;

        Ok(())
    }

    async fn list_messages(&self) -> Result<Vec<ChatMessage>> {
        let mut conn = self.pool.get().await?;

        let rows: Vec<MessageRow> = diesel_async::RunQueryDsl::load(
            messages::table
                .order(messages::sent_at.asc())
                .select(MessageRow::as_select()),
            &mut conn,
        )
        .await?;

        Ok(rows.into_iter().map(ChatMessage::from).collect())
    }
}
