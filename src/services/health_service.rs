use crate::adapters::store::MessageStore;
use crate::adapters::transport::TransportGate;
use crate::config::HealthConfig;
use opentelemetry::{KeyValue, global, metrics::Gauge};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

#[derive(Clone, Debug)]
pub struct Metrics {
    pub status: Gauge<i64>,
}

impl Metrics {
    #[must_use]
    pub(crate) fn new() -> Self {
        let meter = global::meter("postbox-server");
        Self {
            status: meter
                .i64_gauge("postbox_health_status")
                .with_description("Status of health checks (1 for ok, 0 for error)")
                .build(),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Debug)]
pub struct HealthService {
    store: Arc<dyn MessageStore>,
    transport: Arc<dyn TransportGate>,
    config: HealthConfig,
    metrics: Metrics,
}

impl HealthService {
    #[must_use]
    pub fn new(store: Arc<dyn MessageStore>, transport: Arc<dyn TransportGate>, config: HealthConfig) -> Self {
        Self { store, transport, config, metrics: Metrics::new() }
    }

    fn report(&self, component: &'static str, result: Result<(), String>) -> Result<(), String> {
        let value = i64::from(result.is_ok());
        self.metrics.status.record(value, &[KeyValue::new("component", component)]);
        result
    }

    /// Checks store connectivity.
    ///
    /// # Errors
    /// Returns a string describing the failure if the store is unreachable.
    pub async fn check_store(&self) -> Result<(), String> {
        let store_timeout = Duration::from_millis(self.config.store_timeout_ms);

        let result = match timeout(store_timeout, self.store.health_check()).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(format!("Store check failed: {e}")),
            Err(_) => Err("Store check timed out".to_string()),
        };
        self.report("store", result)
    }

    /// Checks that the mail transport accepts connections.
    ///
    /// # Errors
    /// Returns a string describing the failure if the transport cannot be verified.
    pub async fn check_transport(&self) -> Result<(), String> {
        let transport_timeout = Duration::from_millis(self.config.transport_timeout_ms);

        let result = match timeout(transport_timeout, self.transport.verify()).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(format!("Transport check failed: {e}")),
            Err(_) => Err("Transport check timed out".to_string()),
        };
        self.report("transport", result)
    }
}
