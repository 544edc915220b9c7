use crate::adapters::database::DbPool;
use crate::adapters::database::records::ReceiptRecord;
use crate::adapters::store::{ReceiptStore, StoreError};
use crate::domain::receipt::Receipt;
use async_trait::async_trait;
use uuid::Uuid;

#[derive(Clone, Debug)]
pub struct ReceiptRepository {
    pool: DbPool,
}

impl ReceiptRepository {
    #[must_use]
    pub const fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReceiptStore for ReceiptRepository {
    #[tracing::instrument(level = "debug", skip(self), err)]
    async fn record(&self, email: &str, message_id: Uuid) -> Result<Receipt, StoreError> {
        let record = sqlx::query_as::<_, ReceiptRecord>(
            r"
            INSERT INTO delivery_receipts (email, message_id)
            VALUES ($1, $2)
            RETURNING id, email, message_id, delivered_at
            ",
        )
        .bind(email)
        .bind(message_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(record.into())
    }

    #[tracing::instrument(level = "debug", skip(self), err)]
    async fn list_for(&self, email: &str) -> Result<Vec<Receipt>, StoreError> {
        let records = sqlx::query_as::<_, ReceiptRecord>(
            r"
            SELECT id, email, message_id, delivered_at
            FROM delivery_receipts
            WHERE email = $1
            ORDER BY delivered_at ASC
            ",
        )
        .bind(email)
        .fetch_all(&self.pool)
        .await?;

        Ok(records.into_iter().map(Into::into).collect())
    }
}
