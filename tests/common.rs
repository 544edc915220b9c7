#![allow(
    clippy::unwrap_used,
    clippy::panic,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    missing_debug_implementations,
    unreachable_pub,
    dead_code
)]

use async_trait::async_trait;
use postbox_server::adapters::database::{self, DbPool};
use postbox_server::adapters::memory::MemoryStore;
use postbox_server::adapters::transport::{DeliveryResponse, TransportError, TransportGate};
use postbox_server::api::{self, MgmtState};
use postbox_server::config::{
    AuthConfig, Config, DispatchConfig, HealthConfig, LogFormat, MailConfig, ServerConfig, SmtpConfig, SmtpTls,
    StoreBackend, StoreConfig, TelemetryConfig, TransportKind,
};
use postbox_server::domain::message::Envelope;
use postbox_server::workers::DispatchWorker;
use postbox_server::{AppBuilder, Stores};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use tokio::net::TcpListener;
use tokio::sync::watch;

pub const APP_SECRET: &str = "test_secret";
pub const API_KEY: &str = "test_api_key";

static INIT: Once = Once::new();

pub fn setup_tracing() {
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "warn".into())
            .add_directive("postbox_server=debug".parse().unwrap())
            .add_directive("sqlx=warn".parse().unwrap())
            .add_directive("tower=warn".parse().unwrap())
            .add_directive("hyper=warn".parse().unwrap())
            .add_directive("reqwest=warn".parse().unwrap());

        tracing_subscriber::fmt().with_env_filter(filter).with_test_writer().init();
    });
}

/// Connects to `DATABASE_URL` and applies migrations. Returns `None` when the
/// variable is unset so Postgres-backed tests can be skipped.
pub async fn get_test_pool() -> Option<DbPool> {
    setup_tracing();
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        tracing::warn!("DATABASE_URL not set, skipping Postgres-backed test");
        return None;
    };

    let pool = database::init_pool(&database_url, &get_test_config().store)
        .await
        .expect("Failed to connect to DB. Is Postgres running?");

    // Run migrations automatically
    database::run_migrations(&pool).await.expect("Failed to run migrations");

    Some(pool)
}

pub fn get_test_config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            mgmt_port: 0,
            shutdown_timeout_secs: 5,
        },
        store: StoreConfig {
            backend: StoreBackend::Memory,
            database_url: None,
            max_connections: 5,
            min_connections: 1,
            acquire_timeout_secs: 5,
        },
        auth: AuthConfig { app_secret: APP_SECRET.to_string(), api_key: API_KEY.to_string() },
        smtp: SmtpConfig {
            kind: TransportKind::Log,
            host: None,
            port: 587,
            username: None,
            password: None,
            tls: SmtpTls::Starttls,
            timeout_secs: 5,
        },
        dispatch: DispatchConfig { interval_secs: 60 },
        mail: MailConfig {
            brand_name: "Errandspay".to_string(),
            support_address: "support@example.com".to_string(),
            no_reply_address: "no-reply@example.com".to_string(),
            activation_base_url: "https://example.com/register/activate".to_string(),
        },
        health: HealthConfig { store_timeout_ms: 500, transport_timeout_ms: 500 },
        telemetry: TelemetryConfig { log_format: LogFormat::Text, otlp_endpoint: None },
    }
}

/// Transport double whose verify and send outcomes can be flipped at runtime.
#[derive(Debug, Default)]
pub struct StubTransport {
    verify_fails: AtomicBool,
    send_fails: AtomicBool,
    verify_calls: AtomicUsize,
    send_calls: AtomicUsize,
    sent: Mutex<Vec<Envelope>>,
}

impl StubTransport {
    pub fn healthy() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_verify_fails(&self, fails: bool) {
        self.verify_fails.store(fails, Ordering::SeqCst);
    }

    pub fn set_send_fails(&self, fails: bool) {
        self.send_fails.store(fails, Ordering::SeqCst);
    }

    pub fn verify_calls(&self) -> usize {
        self.verify_calls.load(Ordering::SeqCst)
    }

    pub fn send_calls(&self) -> usize {
        self.send_calls.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> Vec<Envelope> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl TransportGate for StubTransport {
    async fn verify(&self) -> Result<(), TransportError> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        if self.verify_fails.load(Ordering::SeqCst) {
            return Err(TransportError::Unavailable("stub verify failure".to_string()));
        }
        Ok(())
    }

    async fn send(&self, envelope: &Envelope) -> Result<DeliveryResponse, TransportError> {
        self.send_calls.fetch_add(1, Ordering::SeqCst);
        if self.send_fails.load(Ordering::SeqCst) {
            return Err(TransportError::Rejected("stub send failure".to_string()));
        }
        self.sent.lock().unwrap().push(envelope.clone());
        Ok(DeliveryResponse { response: "250 OK stub".to_string() })
    }
}

pub struct TestApp {
    pub server_url: String,
    pub mgmt_url: String,
    pub client: reqwest::Client,
    pub config: Config,
    pub store: MemoryStore,
    pub transport: Arc<StubTransport>,
    pub worker: Option<DispatchWorker>,
    pub shutdown_tx: watch::Sender<bool>,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with_config(get_test_config()).await
    }

    pub async fn spawn_with_config(config: Config) -> Self {
        let store = MemoryStore::new();
        Self::spawn_with(config, Stores::memory(&store), store).await
    }

    /// Spawns the routers with `stores`; `store` is the memory store tests inspect.
    pub async fn spawn_with(config: Config, stores: Stores, store: MemoryStore) -> Self {
        setup_tracing();

        let transport = StubTransport::healthy();
        let app = AppBuilder::new(config.clone())
            .with_stores(stores)
            .with_transport(Arc::clone(&transport) as Arc<dyn TransportGate>)
            .build()
            .unwrap();

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let server_url = format!("http://{}", listener.local_addr().unwrap());
        let mgmt_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mgmt_url = format!("http://{}", mgmt_listener.local_addr().unwrap());

        let app_router = api::app_router(config.clone(), app.services);
        let mgmt_router = api::mgmt_router(MgmtState { health_service: app.health_service });

        let mut api_rx = shutdown_rx.clone();
        tokio::spawn(async move {
            axum::serve(listener, app_router)
                .with_graceful_shutdown(async move {
                    let _ = api_rx.wait_for(|&s| s).await;
                })
                .await
                .unwrap();
        });

        let mut mgmt_rx = shutdown_rx;
        tokio::spawn(async move {
            axum::serve(mgmt_listener, mgmt_router)
                .with_graceful_shutdown(async move {
                    let _ = mgmt_rx.wait_for(|&s| s).await;
                })
                .await
                .unwrap();
        });

        Self {
            server_url,
            mgmt_url,
            client: reqwest::Client::new(),
            config,
            store,
            transport,
            worker: Some(app.workers.dispatch),
            shutdown_tx,
        }
    }

    pub fn worker(&self) -> &DispatchWorker {
        self.worker.as_ref().unwrap()
    }

    pub fn authed_post(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .post(format!("{}{path}", self.server_url))
            .header("Authorization", format!("Bearer {APP_SECRET}"))
            .header("api_key", API_KEY)
    }

    pub fn authed_get(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .get(format!("{}{path}", self.server_url))
            .header("Authorization", format!("Bearer {APP_SECRET}"))
            .header("api_key", API_KEY)
    }

    /// Submits mail through `/send-mail` and returns the token from the response.
    pub async fn submit(&self, to: &str, subject: &str, text: &str) -> String {
        let resp = self
            .authed_post("/send-mail")
            .json(&serde_json::json!({
                "from": "ops@example.com",
                "to": to,
                "subject": subject,
                "text": text,
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);

        let body: serde_json::Value = resp.json().await.unwrap();
        body["verify"].as_str().unwrap().to_string()
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(true);
    }
}
