use crate::adapters::store::{MessageStore, ReceiptStore, StoreError};
use crate::domain::message::{Message, MessageState, MessageUpdate, NewMessage};
use crate::domain::receipt::Receipt;
use async_trait::async_trait;
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Default)]
struct Inner {
    messages: Vec<Message>,
    receipts: Vec<Receipt>,
}

/// Embedded, process-local backend for development and tests.
///
/// Not durable: everything is lost on restart. Clones share the same data.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored message in insertion order.
    pub async fn messages(&self) -> Vec<Message> {
        self.inner.lock().await.messages.clone()
    }

    pub async fn receipts(&self) -> Vec<Receipt> {
        self.inner.lock().await.receipts.clone()
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn insert(&self, message: NewMessage) -> Result<Message, StoreError> {
        let record = Message {
            id: Uuid::now_v7(),
            from: message.from,
            to: message.to,
            subject: message.subject,
            text: message.text,
            html: message.html,
            token: message.token,
            state: MessageState::Pending,
            created_at: OffsetDateTime::now_utc(),
            sent_at: None,
        };

        self.inner.lock().await.messages.push(record.clone());
        Ok(record)
    }

    async fn find_one_unsent(&self) -> Result<Option<Message>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.messages.iter().filter(|m| m.is_pending()).min_by_key(|m| (m.created_at, m.id)).cloned())
    }

    async fn mark_sent(&self, id: Uuid) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        let message = inner.messages.iter_mut().find(|m| m.id == id).ok_or(StoreError::NotFound)?;
        if message.state != MessageState::Sent {
            message.state = MessageState::Sent;
            message.sent_at = Some(OffsetDateTime::now_utc());
        }
        Ok(())
    }

    async fn remove(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().await;
        let before = inner.messages.len();
        inner.messages.retain(|m| m.id != id);
        Ok(inner.messages.len() != before)
    }

    async fn update(&self, id: Uuid, update: MessageUpdate) -> Result<Message, StoreError> {
        let mut inner = self.inner.lock().await;
        let message = inner.messages.iter_mut().find(|m| m.id == id).ok_or(StoreError::NotFound)?;
        if let Some(state) = update.state {
            message.state = state;
            if state == MessageState::Sent && message.sent_at.is_none() {
                message.sent_at = Some(OffsetDateTime::now_utc());
            }
        }
        Ok(message.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Message>, StoreError> {
        Ok(self.inner.lock().await.messages.iter().find(|m| m.id == id).cloned())
    }

    async fn find_by_token(&self, token: &str) -> Result<Vec<Message>, StoreError> {
        Ok(self.inner.lock().await.messages.iter().filter(|m| m.token == token).cloned().collect())
    }

    async fn count_by_state(&self, state: MessageState) -> Result<u64, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.messages.iter().filter(|m| m.state == state).count() as u64)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait]
impl ReceiptStore for MemoryStore {
    async fn record(&self, email: &str, message_id: Uuid) -> Result<Receipt, StoreError> {
        let receipt =
            Receipt { id: Uuid::now_v7(), email: email.to_string(), message_id, delivered_at: OffsetDateTime::now_utc() };
        self.inner.lock().await.receipts.push(receipt.clone());
        Ok(receipt)
    }

    async fn list_for(&self, email: &str) -> Result<Vec<Receipt>, StoreError> {
        Ok(self.inner.lock().await.receipts.iter().filter(|r| r.email == email).cloned().collect())
    }
}
