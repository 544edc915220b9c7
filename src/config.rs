use clap::{Args, Parser, ValueEnum};

#[derive(Clone, Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Config {
    #[command(flatten)]
    pub server: ServerConfig,

    #[command(flatten)]
    pub store: StoreConfig,

    #[command(flatten)]
    pub auth: AuthConfig,

    #[command(flatten)]
    pub smtp: SmtpConfig,

    #[command(flatten)]
    pub dispatch: DispatchConfig,

    #[command(flatten)]
    pub mail: MailConfig,

    #[command(flatten)]
    pub health: HealthConfig,

    #[command(flatten)]
    pub telemetry: TelemetryConfig,
}

#[derive(Clone, Debug, Args)]
pub struct ServerConfig {
    /// Host to listen on
    #[arg(long, env = "POSTBOX_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port for the submission API
    #[arg(long, env = "POSTBOX_PORT", default_value_t = 3000)]
    pub port: u16,

    /// Port for the management (health) API
    #[arg(long, env = "POSTBOX_MGMT_PORT", default_value_t = 9090)]
    pub mgmt_port: u16,

    /// Seconds to wait for background tasks during shutdown
    #[arg(long, env = "POSTBOX_SHUTDOWN_TIMEOUT_SECS", default_value_t = 10)]
    pub shutdown_timeout_secs: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Clone, Debug, Args)]
pub struct StoreConfig {
    /// Backing store for queued messages
    #[arg(long = "store", env = "POSTBOX_STORE", value_enum, default_value_t = StoreBackend::Postgres)]
    pub backend: StoreBackend,

    /// Database connection URL (required for the postgres store)
    #[arg(long, env = "POSTBOX_DATABASE_URL")]
    pub database_url: Option<String>,

    #[arg(long, env = "POSTBOX_DB_MAX_CONNECTIONS", default_value_t = 10)]
    pub max_connections: u32,

    #[arg(long, env = "POSTBOX_DB_MIN_CONNECTIONS", default_value_t = 1)]
    pub min_connections: u32,

    #[arg(long, env = "POSTBOX_DB_ACQUIRE_TIMEOUT_SECS", default_value_t = 5)]
    pub acquire_timeout_secs: u64,
}

#[derive(Clone, Debug, Args)]
pub struct AuthConfig {
    /// Shared secret expected as `Authorization: Bearer <secret>`
    #[arg(long, env = "APP_SECRET")]
    pub app_secret: String,

    /// Key expected in the `api_key` header
    #[arg(long, env = "API_KEY")]
    pub api_key: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum TransportKind {
    Smtp,
    /// Log envelopes instead of delivering them
    Log,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum SmtpTls {
    Starttls,
    Tls,
    None,
}

#[derive(Clone, Debug, Args)]
pub struct SmtpConfig {
    /// Mail transport used by the dispatch worker
    #[arg(long = "transport", env = "POSTBOX_TRANSPORT", value_enum, default_value_t = TransportKind::Smtp)]
    pub kind: TransportKind,

    /// SMTP relay host
    #[arg(long = "smtp-host", env = "POSTBOX_SMTP_HOST")]
    pub host: Option<String>,

    /// SMTP relay port
    #[arg(long = "smtp-port", env = "POSTBOX_SMTP_PORT", default_value_t = 587)]
    pub port: u16,

    /// SMTP username (defaults to the support address)
    #[arg(long = "smtp-username", env = "POSTBOX_SMTP_USERNAME")]
    pub username: Option<String>,

    /// SMTP password or application password
    #[arg(long = "smtp-password", env = "POSTBOX_SMTP_PASSWORD")]
    pub password: Option<String>,

    #[arg(long = "smtp-tls", env = "POSTBOX_SMTP_TLS", value_enum, default_value_t = SmtpTls::Starttls)]
    pub tls: SmtpTls,

    /// Connection timeout in seconds
    #[arg(long = "smtp-timeout-secs", env = "POSTBOX_SMTP_TIMEOUT_SECS", default_value_t = 10)]
    pub timeout_secs: u64,
}

#[derive(Clone, Debug, Args)]
pub struct DispatchConfig {
    /// How often the dispatch worker polls for a pending message
    #[arg(long = "dispatch-interval-secs", env = "POSTBOX_DISPATCH_INTERVAL_SECS", default_value_t = 60)]
    pub interval_secs: u64,
}

#[derive(Clone, Debug, Args)]
pub struct MailConfig {
    /// Brand used in sender display names and templates
    #[arg(long, env = "POSTBOX_BRAND_NAME", default_value = "Errandspay")]
    pub brand_name: String,

    /// Sender address for server-generated mail
    #[arg(long, env = "MAIL_USER")]
    pub support_address: String,

    /// Sender address for the test mail
    #[arg(long, env = "POSTBOX_NO_REPLY_ADDRESS", default_value = "no-reply@errandspay.com")]
    pub no_reply_address: String,

    /// Base URL of the account activation link; the token is appended as a path segment
    #[arg(long, env = "POSTBOX_ACTIVATION_BASE_URL", default_value = "https://errandspay.com/register/activate")]
    pub activation_base_url: String,
}

#[derive(Clone, Debug, Args)]
pub struct HealthConfig {
    #[arg(long, env = "POSTBOX_HEALTH_STORE_TIMEOUT_MS", default_value_t = 2000)]
    pub store_timeout_ms: u64,

    #[arg(long, env = "POSTBOX_HEALTH_TRANSPORT_TIMEOUT_MS", default_value_t = 5000)]
    pub transport_timeout_ms: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Clone, Debug, Args)]
pub struct TelemetryConfig {
    #[arg(long, env = "POSTBOX_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// OTLP collector endpoint; traces and metrics are exported when set
    #[arg(long, env = "POSTBOX_OTLP_ENDPOINT")]
    pub otlp_endpoint: Option<String>,
}

impl Config {
    pub fn load() -> Self {
        Self::parse()
    }
}

/// Loads a `.env` file unless `POSTBOX_ENV` names a non-development environment.
///
/// Returns the load error so it can be reported once logging is initialized.
pub fn load_env_file() -> Option<dotenvy::Error> {
    let environment = std::env::var("POSTBOX_ENV").unwrap_or_default();
    if environment.is_empty() || environment == "development" { dotenvy::dotenv().err() } else { None }
}
