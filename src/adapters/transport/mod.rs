pub mod log;
pub mod smtp;

use crate::domain::message::Envelope;
use async_trait::async_trait;
use thiserror::Error;

pub use log::LogTransport;
pub use smtp::SmtpTransport;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Transport unavailable: {0}")]
    Unavailable(String),
    #[error("Message rejected by transport: {0}")]
    Rejected(String),
    #[error("Envelope cannot be encoded: {0}")]
    InvalidEnvelope(String),
    #[error("Transport timed out")]
    Timeout,
}

/// The provider's answer to an accepted message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryResponse {
    pub response: String,
}

/// Wraps the external mail transport.
///
/// Every error is treated as transient by the dispatch worker: the message is
/// left pending and retried on the next tick.
#[async_trait]
pub trait TransportGate: Send + Sync + std::fmt::Debug {
    /// Lightweight connectivity and authentication check.
    ///
    /// # Errors
    /// Returns `TransportError` if the transport cannot currently accept mail.
    async fn verify(&self) -> Result<(), TransportError>;

    /// Attempts delivery of one message.
    ///
    /// # Errors
    /// Returns `TransportError` if the transport did not accept the message.
    async fn send(&self, envelope: &Envelope) -> Result<DeliveryResponse, TransportError>;
}
