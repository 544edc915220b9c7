use crate::adapters::transport::{DeliveryResponse, TransportError, TransportGate};
use crate::config::{SmtpConfig, SmtpTls};
use crate::domain::message::Envelope;
use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart, header::ContentType};
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::response::Response;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::time::Duration;

/// SMTP relay transport.
pub struct SmtpTransport {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    host: String,
    port: u16,
}

impl std::fmt::Debug for SmtpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpTransport").field("host", &self.host).field("port", &self.port).finish_non_exhaustive()
    }
}

impl SmtpTransport {
    /// Builds the relay client. No connection is opened until the first `verify` or `send`.
    ///
    /// `fallback_username` is used when no explicit SMTP username is configured.
    ///
    /// # Errors
    /// Returns `TransportError::Unavailable` if the host is missing or the TLS parameters are invalid.
    pub fn from_config(config: &SmtpConfig, fallback_username: &str) -> Result<Self, TransportError> {
        let host = config
            .host
            .as_deref()
            .ok_or_else(|| TransportError::Unavailable("SMTP host is not configured".to_string()))?;

        let mut builder = match config.tls {
            SmtpTls::None => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host),
            SmtpTls::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(host)
                .map_err(|e| TransportError::Unavailable(e.to_string()))?,
            SmtpTls::Starttls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                .map_err(|e| TransportError::Unavailable(e.to_string()))?,
        };

        builder = builder.port(config.port).timeout(Some(Duration::from_secs(config.timeout_secs)));

        if let Some(password) = &config.password {
            let username = config.username.clone().unwrap_or_else(|| fallback_username.to_string());
            builder = builder.credentials(Credentials::new(username, password.clone()));
        }

        tracing::info!(host = %host, port = config.port, tls = ?config.tls, "SMTP transport configured");
        Ok(Self { transport: builder.build(), host: host.to_string(), port: config.port })
    }

    fn build_message(envelope: &Envelope) -> Result<Message, TransportError> {
        let from: Mailbox =
            envelope.from.parse().map_err(|_| TransportError::InvalidEnvelope(format!("from: {}", envelope.from)))?;
        let to: Mailbox =
            envelope.to.parse().map_err(|_| TransportError::InvalidEnvelope(format!("to: {}", envelope.to)))?;

        let builder = Message::builder().from(from).to(to).subject(envelope.subject.clone());

        let message = match &envelope.html {
            Some(html) => {
                builder.multipart(MultiPart::alternative_plain_html(envelope.text.clone(), html.clone()))
            }
            None => builder.header(ContentType::TEXT_PLAIN).body(envelope.text.clone()),
        };

        message.map_err(|e| TransportError::InvalidEnvelope(e.to_string()))
    }
}

fn classify(error: &lettre::transport::smtp::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout
    } else if error.is_permanent() {
        TransportError::Rejected(error.to_string())
    } else {
        TransportError::Unavailable(error.to_string())
    }
}

fn delivery_response(response: &Response) -> DeliveryResponse {
    let text = response.message().collect::<Vec<_>>().join(" ");
    DeliveryResponse { response: format!("{} {text}", response.code()) }
}

#[async_trait]
impl TransportGate for SmtpTransport {
    #[tracing::instrument(level = "debug", skip(self), err)]
    async fn verify(&self) -> Result<(), TransportError> {
        match self.transport.test_connection().await {
            Ok(true) => Ok(()),
            Ok(false) => Err(TransportError::Unavailable("SMTP server did not accept the connection".to_string())),
            Err(e) => Err(classify(&e)),
        }
    }

    #[tracing::instrument(level = "debug", skip(self, envelope), fields(to = %envelope.to), err)]
    async fn send(&self, envelope: &Envelope) -> Result<DeliveryResponse, TransportError> {
        let message = Self::build_message(envelope)?;
        let response = self.transport.send(message).await.map_err(|e| classify(&e))?;

        Ok(delivery_response(&response))
    }
}
