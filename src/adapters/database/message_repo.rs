use crate::adapters::database::DbPool;
use crate::adapters::database::records::MessageRecord;
use crate::adapters::store::{MessageStore, StoreError};
use crate::domain::message::{Message, MessageState, MessageUpdate, NewMessage};
use async_trait::async_trait;
use uuid::Uuid;

const MESSAGE_COLUMNS: &str = "id, from_addr, to_addr, subject, text_body, html_body, token, state, created_at, sent_at";

/// Postgres-backed message store.
#[derive(Clone, Debug)]
pub struct MessageRepository {
    pool: DbPool,
}

impl MessageRepository {
    #[must_use]
    pub const fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageStore for MessageRepository {
    #[tracing::instrument(level = "debug", skip(self, message), err)]
    async fn insert(&self, message: NewMessage) -> Result<Message, StoreError> {
        let record = sqlx::query_as::<_, MessageRecord>(&format!(
            r"
            INSERT INTO mail_messages (from_addr, to_addr, subject, text_body, html_body, token)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {MESSAGE_COLUMNS}
            "
        ))
        .bind(message.from)
        .bind(message.to)
        .bind(message.subject)
        .bind(message.text)
        .bind(message.html)
        .bind(message.token)
        .fetch_one(&self.pool)
        .await?;

        Ok(record.into())
    }

    #[tracing::instrument(level = "debug", skip(self), err)]
    async fn find_one_unsent(&self) -> Result<Option<Message>, StoreError> {
        let record = sqlx::query_as::<_, MessageRecord>(&format!(
            r"
            SELECT {MESSAGE_COLUMNS}
            FROM mail_messages
            WHERE state = 'pending'
            ORDER BY created_at ASC, id ASC
            LIMIT 1
            "
        ))
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Into::into))
    }

    #[tracing::instrument(level = "debug", skip(self), err)]
    async fn mark_sent(&self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE mail_messages SET state = 'sent', sent_at = COALESCE(sent_at, NOW()) WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip(self), err)]
    async fn remove(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM mail_messages WHERE id = $1").bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(level = "debug", skip(self), err)]
    async fn update(&self, id: Uuid, update: MessageUpdate) -> Result<Message, StoreError> {
        let record = sqlx::query_as::<_, MessageRecord>(&format!(
            r"
            UPDATE mail_messages
            SET state = COALESCE($2, state),
                sent_at = CASE WHEN $2 = 'sent' THEN COALESCE(sent_at, NOW()) ELSE sent_at END
            WHERE id = $1
            RETURNING {MESSAGE_COLUMNS}
            "
        ))
        .bind(id)
        .bind(update.state)
        .fetch_optional(&self.pool)
        .await?;

        record.map(Into::into).ok_or(StoreError::NotFound)
    }

    #[tracing::instrument(level = "debug", skip(self), err)]
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Message>, StoreError> {
        let record =
            sqlx::query_as::<_, MessageRecord>(&format!("SELECT {MESSAGE_COLUMNS} FROM mail_messages WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(record.map(Into::into))
    }

    #[tracing::instrument(level = "debug", skip(self, token), err)]
    async fn find_by_token(&self, token: &str) -> Result<Vec<Message>, StoreError> {
        let records = sqlx::query_as::<_, MessageRecord>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM mail_messages WHERE token = $1 ORDER BY created_at ASC, id ASC"
        ))
        .bind(token)
        .fetch_all(&self.pool)
        .await?;

        Ok(records.into_iter().map(Into::into).collect())
    }

    #[tracing::instrument(level = "debug", skip(self), err)]
    async fn count_by_state(&self, state: MessageState) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM mail_messages WHERE state = $1")
            .bind(state)
            .fetch_one(&self.pool)
            .await?;

        Ok(u64::try_from(count).unwrap_or_default())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
