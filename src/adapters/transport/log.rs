use crate::adapters::transport::{DeliveryResponse, TransportError, TransportGate};
use crate::domain::message::Envelope;
use async_trait::async_trait;

/// Development transport: logs each envelope and reports it as accepted.
#[derive(Debug, Default)]
pub struct LogTransport;

#[async_trait]
impl TransportGate for LogTransport {
    async fn verify(&self) -> Result<(), TransportError> {
        Ok(())
    }

    async fn send(&self, envelope: &Envelope) -> Result<DeliveryResponse, TransportError> {
        tracing::info!(
            from = %envelope.from,
            to = %envelope.to,
            subject = %envelope.subject,
            html = envelope.html.is_some(),
            "STUB: Logging mail instead of sending"
        );
        Ok(DeliveryResponse { response: "250 logged".to_string() })
    }
}
