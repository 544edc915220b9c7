#![forbid(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::todo)]
#![warn(clippy::panic)]
#![warn(clippy::dbg_macro)]
#![warn(clippy::print_stdout)]
#![warn(clippy::print_stderr)]
#![warn(clippy::clone_on_ref_ptr)]
#![warn(unreachable_pub)]
#![warn(missing_debug_implementations)]
#![warn(unused_qualifications)]
#![deny(unused_must_use)]

pub mod adapters;
pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod services;
pub mod telemetry;
pub mod workers;

use crate::adapters::memory::MemoryStore;
use crate::adapters::store::{MessageStore, ReceiptStore};
use crate::adapters::transport::{LogTransport, SmtpTransport, TransportGate};
use crate::api::ServiceContainer;
use crate::config::{Config, StoreBackend, TransportKind};
use crate::services::health_service::HealthService;
use crate::services::submission_service::SubmissionService;
use crate::workers::DispatchWorker;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::Instrument;

/// Both halves of the chosen backing store.
#[derive(Debug, Clone)]
pub struct Stores {
    pub messages: Arc<dyn MessageStore>,
    pub receipts: Arc<dyn ReceiptStore>,
}

impl Stores {
    #[must_use]
    pub fn memory(store: &MemoryStore) -> Self {
        Self { messages: Arc::new(store.clone()), receipts: Arc::new(store.clone()) }
    }
}

/// Connects the configured backing store, applying migrations for Postgres.
///
/// # Errors
/// Returns an error if the database URL is missing, unreachable, or migrations fail.
pub async fn init_stores(config: &Config) -> anyhow::Result<Stores> {
    match config.store.backend {
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory store; queued mail will not survive a restart");
            Ok(Stores::memory(&MemoryStore::new()))
        }
        StoreBackend::Postgres => {
            let url = config
                .store
                .database_url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("POSTBOX_DATABASE_URL is required for the postgres store"))?;
            let pool = adapters::database::init_pool(url, &config.store).await?;
            adapters::database::run_migrations(&pool).await?;
            Ok(Stores {
                messages: Arc::new(adapters::database::message_repo::MessageRepository::new(pool.clone())),
                receipts: Arc::new(adapters::database::receipt_repo::ReceiptRepository::new(pool)),
            })
        }
    }
}

/// Builds the configured mail transport.
///
/// # Errors
/// Returns an error if the SMTP transport is selected but misconfigured.
pub fn init_transport(config: &Config) -> anyhow::Result<Arc<dyn TransportGate>> {
    match config.smtp.kind {
        TransportKind::Log => Ok(Arc::new(LogTransport)),
        TransportKind::Smtp => Ok(Arc::new(SmtpTransport::from_config(&config.smtp, &config.mail.support_address)?)),
    }
}

/// Background tasks owned by the application.
#[derive(Debug)]
pub struct Workers {
    pub dispatch: DispatchWorker,
}

impl Workers {
    /// Starts every worker; they stop once `shutdown` flips to `true`.
    #[must_use]
    pub fn spawn_all(self, shutdown: watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
        vec![tokio::spawn(self.dispatch.run(shutdown).instrument(tracing::info_span!("dispatch_worker")))]
    }
}

#[derive(Debug)]
pub struct App {
    pub services: ServiceContainer,
    pub health_service: HealthService,
    pub workers: Workers,
}

/// Wires services and workers around explicitly injected store and transport handles.
#[derive(Debug)]
pub struct AppBuilder {
    config: Config,
    stores: Option<Stores>,
    transport: Option<Arc<dyn TransportGate>>,
}

impl AppBuilder {
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config, stores: None, transport: None }
    }

    #[must_use]
    pub fn with_stores(mut self, stores: Stores) -> Self {
        self.stores = Some(stores);
        self
    }

    #[must_use]
    pub fn with_transport(mut self, transport: Arc<dyn TransportGate>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// # Errors
    /// Returns an error if the store or the transport was not provided, or a configured
    /// mail address is malformed.
    pub fn build(self) -> anyhow::Result<App> {
        let stores = self.stores.ok_or_else(|| anyhow::anyhow!("AppBuilder requires a store"))?;
        let transport = self.transport.ok_or_else(|| anyhow::anyhow!("AppBuilder requires a transport"))?;

        let submission_service = SubmissionService::new(Arc::clone(&stores.messages), self.config.mail.clone())?;
        let health_service =
            HealthService::new(Arc::clone(&stores.messages), Arc::clone(&transport), self.config.health.clone());
        let dispatch = DispatchWorker::new(stores.messages, stores.receipts, transport, &self.config.dispatch);

        Ok(App { services: ServiceContainer { submission_service }, health_service, workers: Workers { dispatch } })
    }
}

/// Flips the shutdown channel on SIGINT or SIGTERM.
pub fn spawn_signal_handler(shutdown_tx: watch::Sender<bool>) {
    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to listen for SIGTERM");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            () = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
            () = terminate => tracing::info!("Received SIGTERM, shutting down"),
        }
        let _ = shutdown_tx.send(true);
    });
}

/// Routes panics through `tracing` so they reach the configured log sink.
pub fn setup_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let location = info.location().map(ToString::to_string).unwrap_or_default();
        let payload = info
            .payload()
            .downcast_ref::<&str>()
            .map(ToString::to_string)
            .or_else(|| info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_default();
        tracing::error!(panic.location = %location, panic.payload = %payload, "Panic occurred");
    }));
}
