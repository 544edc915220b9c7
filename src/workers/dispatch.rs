use crate::adapters::store::{MessageStore, ReceiptStore, StoreError};
use crate::adapters::transport::TransportGate;
use crate::config::DispatchConfig;
use opentelemetry::{KeyValue, global, metrics::Counter};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::Instrument;
use uuid::Uuid;

#[derive(Clone, Debug)]
struct Metrics {
    ticks: Counter<u64>,
    delivered: Counter<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("postbox-server");
        Self {
            ticks: meter
                .u64_counter("mail_dispatch_ticks_total")
                .with_description("Dispatch ticks, by outcome")
                .build(),
            delivered: meter
                .u64_counter("mail_delivered_total")
                .with_description("Total messages accepted by the transport")
                .build(),
        }
    }
}

/// Result of a single dispatch tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// No pending message was found.
    NoWork,
    /// The transport failed its health check; the message stays pending.
    VerifyFailed { id: Uuid },
    /// The transport refused the message; it stays pending.
    SendFailed { id: Uuid },
    /// The message was accepted by the transport and marked sent.
    Delivered { id: Uuid },
}

impl TickOutcome {
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::NoWork => "no_work",
            Self::VerifyFailed { .. } => "verify_failed",
            Self::SendFailed { .. } => "send_failed",
            Self::Delivered { .. } => "delivered",
        }
    }
}

/// Moves pending messages to `Sent`, one per tick.
///
/// A failing message is retried on the following tick and, being the oldest
/// pending message, is picked again before any other. Completion is not
/// transactional with delivery: a failure between a successful send and
/// `mark_sent` leads to the message being sent again.
#[derive(Debug)]
pub struct DispatchWorker {
    store: Arc<dyn MessageStore>,
    receipts: Arc<dyn ReceiptStore>,
    transport: Arc<dyn TransportGate>,
    interval: Duration,
    metrics: Metrics,
}

impl DispatchWorker {
    #[must_use]
    pub fn new(
        store: Arc<dyn MessageStore>,
        receipts: Arc<dyn ReceiptStore>,
        transport: Arc<dyn TransportGate>,
        config: &DispatchConfig,
    ) -> Self {
        Self {
            store,
            receipts,
            transport,
            interval: Duration::from_secs(config.interval_secs.max(1)),
            metrics: Metrics::new(),
        }
    }

    pub async fn run(self, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        while !*shutdown.borrow() {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.tick()
                        .instrument(tracing::info_span!("dispatch_tick"))
                        .await
                    {
                        tracing::error!(error = %e, "Dispatch tick failed");
                    }
                }
                _ = shutdown.changed() => {}
            }
        }
        tracing::info!("Dispatch worker shutting down...");
    }

    /// Processes at most one pending message.
    ///
    /// Transport failures are not errors: they are reported through the
    /// returned outcome and leave the message pending.
    ///
    /// # Errors
    /// Returns `StoreError` if polling the store or marking the message sent fails.
    #[tracing::instrument(skip(self), fields(message_id = tracing::field::Empty, outcome = tracing::field::Empty))]
    pub async fn tick(&self) -> Result<TickOutcome, StoreError> {
        let outcome = self.step().await;
        let label = match &outcome {
            Ok(outcome) => outcome.label(),
            Err(_) => "store_error",
        };
        tracing::Span::current().record("outcome", label);
        self.metrics.ticks.add(1, &[KeyValue::new("outcome", label)]);
        outcome
    }

    async fn step(&self) -> Result<TickOutcome, StoreError> {
        let Some(message) = self.store.find_one_unsent().await? else {
            tracing::debug!("No mails to send");
            return Ok(TickOutcome::NoWork);
        };
        let id = message.id;
        tracing::Span::current().record("message_id", tracing::field::display(id));

        if let Err(e) = self.transport.verify().await {
            tracing::warn!(error = %e, "Transport verification failed, leaving message pending");
            return Ok(TickOutcome::VerifyFailed { id });
        }
        tracing::debug!("Transport verified, sending");

        let envelope = message.envelope();
        let response = match self.transport.send(&envelope).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "Send failed, leaving message pending");
                return Ok(TickOutcome::SendFailed { id });
            }
        };
        tracing::info!(response = %response.response, to = %envelope.to, "Email successfully sent");
        self.metrics.delivered.add(1, &[]);

        let recipient = envelope.recipient_address();
        if let Err(e) = self.receipts.record(recipient, id).await {
            tracing::error!(error = %e, "Failed to record delivery receipt");
        }

        self.store.mark_sent(id).await?;
        tracing::debug!("Message marked sent");

        Ok(TickOutcome::Delivered { id })
    }
}
