use crate::domain::message::{Message, MessageState};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, sqlx::FromRow)]
pub struct MessageRecord {
    pub(crate) id: Uuid,
    pub(crate) from_addr: String,
    pub(crate) to_addr: String,
    pub(crate) subject: String,
    pub(crate) text_body: String,
    pub(crate) html_body: Option<String>,
    pub(crate) token: String,
    pub(crate) state: MessageState,
    pub(crate) created_at: OffsetDateTime,
    pub(crate) sent_at: Option<OffsetDateTime>,
}

impl From<MessageRecord> for Message {
    fn from(record: MessageRecord) -> Self {
        Self {
            id: record.id,
            from: record.from_addr,
            to: record.to_addr,
            subject: record.subject,
            text: record.text_body,
            html: record.html_body,
            token: record.token,
            state: record.state,
            created_at: record.created_at,
            sent_at: record.sent_at,
        }
    }
}
