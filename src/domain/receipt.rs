use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

/// Audit record confirming a successful delivery to `email`.
#[derive(Debug, Clone, Serialize)]
pub struct Receipt {
    pub id: Uuid,
    pub email: String,
    pub message_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub delivered_at: OffsetDateTime,
}
