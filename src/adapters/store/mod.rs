use crate::domain::message::{Message, MessageState, MessageUpdate, NewMessage};
use crate::domain::receipt::Receipt;
use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Message not found")]
    NotFound,
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Durable record of queued messages and their delivery state.
///
/// Backends must tolerate an insert racing a poll: submissions are handled
/// concurrently with the dispatch worker.
#[async_trait]
pub trait MessageStore: Send + Sync + std::fmt::Debug {
    /// Appends a new `Pending` message and returns it with its assigned id.
    ///
    /// # Errors
    /// Returns `StoreError` if the message could not be persisted.
    async fn insert(&self, message: NewMessage) -> Result<Message, StoreError>;

    /// Returns the oldest `Pending` message (ties broken by id), if any.
    ///
    /// # Errors
    /// Returns `StoreError` if the backend query fails.
    async fn find_one_unsent(&self) -> Result<Option<Message>, StoreError>;

    /// Moves a message to its terminal `Sent` state, keeping the record.
    /// Marking an already sent message again succeeds without changes.
    ///
    /// # Errors
    /// Returns `StoreError::NotFound` if no message has this id.
    async fn mark_sent(&self, id: Uuid) -> Result<(), StoreError>;

    /// Deletes a message. Returns whether a record was removed.
    ///
    /// # Errors
    /// Returns `StoreError` if the backend query fails.
    async fn remove(&self, id: Uuid) -> Result<bool, StoreError>;

    /// Applies a partial update and returns the updated message.
    ///
    /// # Errors
    /// Returns `StoreError::NotFound` if no message has this id.
    async fn update(&self, id: Uuid, update: MessageUpdate) -> Result<Message, StoreError>;

    /// # Errors
    /// Returns `StoreError` if the backend query fails.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Message>, StoreError>;

    /// All messages submitted with `token`, oldest first.
    ///
    /// # Errors
    /// Returns `StoreError` if the backend query fails.
    async fn find_by_token(&self, token: &str) -> Result<Vec<Message>, StoreError>;

    /// # Errors
    /// Returns `StoreError` if the backend query fails.
    async fn count_by_state(&self, state: MessageState) -> Result<u64, StoreError>;

    /// # Errors
    /// Returns `StoreError` if the backend cannot be reached.
    async fn health_check(&self) -> Result<(), StoreError>;
}

/// Append-only log of successful deliveries, keyed by recipient address.
#[async_trait]
pub trait ReceiptStore: Send + Sync + std::fmt::Debug {
    /// # Errors
    /// Returns `StoreError` if the receipt could not be persisted.
    async fn record(&self, email: &str, message_id: Uuid) -> Result<Receipt, StoreError>;

    /// # Errors
    /// Returns `StoreError` if the backend query fails.
    async fn list_for(&self, email: &str) -> Result<Vec<Receipt>, StoreError>;
}
