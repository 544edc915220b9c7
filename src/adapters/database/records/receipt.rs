use crate::domain::receipt::Receipt;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, sqlx::FromRow)]
pub struct ReceiptRecord {
    pub(crate) id: Uuid,
    pub(crate) email: String,
    pub(crate) message_id: Uuid,
    pub(crate) delivered_at: OffsetDateTime,
}

impl From<ReceiptRecord> for Receipt {
    fn from(record: ReceiptRecord) -> Self {
        Self { id: record.id, email: record.email, message_id: record.message_id, delivered_at: record.delivered_at }
    }
}
