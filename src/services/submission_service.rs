use crate::adapters::store::MessageStore;
use crate::config::MailConfig;
use crate::domain::message::{NewMessage, format_mailbox};
use crate::error::{AppError, Result};
use crate::services::templates;
use lettre::Address;
use lettre::address::AddressError;
use lettre::message::Mailbox;
use opentelemetry::{KeyValue, global, metrics::Counter};
use rand::Rng;
use rand::distributions::Alphanumeric;
use std::sync::Arc;

const TOKEN_LENGTH: usize = 32;

#[derive(Clone, Debug)]
struct Metrics {
    submitted_total: Counter<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("postbox-server");
        Self {
            submitted_total: meter
                .u64_counter("mail_submitted_total")
                .with_description("Total mail submissions, by outcome")
                .build(),
        }
    }
}

/// Generates a random alphanumeric verification token.
#[must_use]
pub fn generate_token() -> String {
    rand::thread_rng().sample_iter(&Alphanumeric).take(TOKEN_LENGTH).map(char::from).collect()
}

fn parse_address(field: &str, value: &str) -> Result<Address> {
    value.trim().parse::<Address>().map_err(|_| AppError::BadRequest(format!("Invalid '{field}' address")))
}

/// Formats a mailbox and checks that it parses back, so only encodable
/// headers reach the queue.
fn mailbox(field: &str, name: Option<&str>, address: Address) -> Result<String> {
    let formatted = format_mailbox(name, address);
    formatted.parse::<Mailbox>().map_err(|_| AppError::BadRequest(format!("Invalid '{field}' mailbox")))?;
    Ok(formatted)
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AppError::BadRequest(format!("'{field}' must not be empty")));
    }
    Ok(())
}

/// Accepts outbound mail and enqueues it as a pending message.
#[derive(Clone, Debug)]
pub struct SubmissionService {
    store: Arc<dyn MessageStore>,
    config: MailConfig,
    support: Address,
    no_reply: Address,
    metrics: Metrics,
}

impl SubmissionService {
    /// # Errors
    /// Returns `AddressError` if the configured support or no-reply address is malformed.
    pub fn new(store: Arc<dyn MessageStore>, config: MailConfig) -> std::result::Result<Self, AddressError> {
        let support = config.support_address.trim().parse()?;
        let no_reply = config.no_reply_address.trim().parse()?;
        Ok(Self { store, config, support, no_reply, metrics: Metrics::new() })
    }

    /// Inserts the message and returns its token once the store has acknowledged it.
    ///
    /// # Errors
    /// Returns `AppError::Store` if the insert fails; no token is handed out in that case.
    #[tracing::instrument(err(level = "warn"), skip(self, message), fields(message_id = tracing::field::Empty))]
    pub async fn submit(&self, message: NewMessage) -> Result<String> {
        match self.store.insert(message).await {
            Ok(stored) => {
                tracing::Span::current().record("message_id", tracing::field::display(stored.id));
                tracing::debug!("Message queued for dispatch");
                self.metrics.submitted_total.add(1, &[KeyValue::new("status", "success")]);
                Ok(stored.token)
            }
            Err(e) => {
                self.metrics.submitted_total.add(1, &[KeyValue::new("status", "failure")]);
                Err(e.into())
            }
        }
    }

    /// Queues caller-authored mail wrapped in the support layout.
    ///
    /// The caller's `key` becomes the token when present; otherwise one is generated.
    ///
    /// # Errors
    /// Returns `AppError::BadRequest` for malformed addresses or empty content.
    /// Returns `AppError::Store` if the insert fails.
    pub async fn send_mail(
        &self,
        from: &str,
        to: &str,
        name: Option<&str>,
        subject: &str,
        text: &str,
        key: Option<String>,
    ) -> Result<String> {
        let from = parse_address("from", from)?;
        let to = parse_address("to", to)?;
        require("subject", subject)?;
        require("text", text)?;

        let brand = &self.config.brand_name;
        let from = mailbox("from", Some(&format!("{brand} Support")), from)?;
        let to = mailbox("to", name, to)?;
        let token = key.filter(|k| !k.trim().is_empty()).unwrap_or_else(generate_token);

        self.submit(NewMessage {
            from,
            to,
            subject: subject.to_string(),
            text: text.to_string(),
            html: Some(templates::support_page(brand, text)),
            token,
        })
        .await
    }

    /// Queues the account verification mail for a newly created user.
    ///
    /// # Errors
    /// Returns `AppError::BadRequest` for a malformed address or an empty name.
    /// Returns `AppError::Store` if the insert fails.
    pub async fn create_user(&self, to: &str, name: &str) -> Result<String> {
        let to = parse_address("to", to)?;
        require("name", name)?;
        let to = mailbox("to", Some(name), to)?;
        let from = mailbox("from", Some(&format!("{} Support", self.config.brand_name)), self.support.clone())?;

        let token = generate_token();
        let link = format!("{}/{token}", self.config.activation_base_url.trim_end_matches('/'));
        let mail = templates::verification_mail(&self.config.brand_name, name.trim(), &link);

        self.submit(NewMessage {
            from,
            to,
            subject: mail.subject,
            text: mail.text,
            html: Some(mail.html),
            token,
        })
        .await
    }

    /// Queues a fixed test mail from the no-reply address to the support address.
    ///
    /// # Errors
    /// Returns `AppError::BadRequest` if the configured brand cannot form a mailbox.
    /// Returns `AppError::Store` if the insert fails.
    pub async fn test_mail(&self) -> Result<String> {
        let brand = &self.config.brand_name;
        let from = mailbox("from", Some(&format!("{brand} CEO")), self.no_reply.clone())?;
        let to = mailbox("to", Some(&format!("Support {brand}")), self.support.clone())?;

        self.submit(NewMessage {
            from,
            to,
            subject: "Testing Mail".to_string(),
            text: "Some mail text".to_string(),
            html: Some(templates::support_page(brand, "Some mail testing")),
            token: generate_token(),
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryStore;
    use crate::domain::message::MessageState;

    fn mail_config() -> MailConfig {
        MailConfig {
            brand_name: "Errandspay".to_string(),
            support_address: "support@example.com".to_string(),
            no_reply_address: "no-reply@example.com".to_string(),
            activation_base_url: "https://example.com/register/activate/".to_string(),
        }
    }

    #[test]
    fn test_generate_token_shape() {
        let token = generate_token();
        assert_eq!(token.len(), TOKEN_LENGTH);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(token, generate_token());
    }

    #[tokio::test]
    async fn test_send_mail_uses_caller_key_and_formats_mailboxes() {
        let store = MemoryStore::new();
        let service = SubmissionService::new(Arc::new(store.clone()), mail_config()).unwrap();

        let token = service
            .send_mail("ops@example.com", "jane@example.com", Some("Jane"), "S", "T", Some("caller-key".to_string()))
            .await
            .unwrap();
        assert_eq!(token, "caller-key");

        let messages = store.messages().await;
        assert_eq!(messages.len(), 1);
        let message = &messages[0];
        assert_eq!(message.from, "Errandspay Support <ops@example.com>");
        assert_eq!(message.to, "Jane <jane@example.com>");
        assert_eq!(message.state, MessageState::Pending);
        assert!(message.html.as_deref().unwrap_or_default().contains("T"));
    }

    #[tokio::test]
    async fn test_send_mail_generates_token_for_blank_key() {
        let store = MemoryStore::new();
        let service = SubmissionService::new(Arc::new(store.clone()), mail_config()).unwrap();

        let token =
            service.send_mail("ops@example.com", "a@x.com", None, "S", "T", Some("  ".to_string())).await.unwrap();
        assert_eq!(token.len(), TOKEN_LENGTH);
        assert_eq!(store.messages().await[0].to, "a@x.com");
    }

    #[tokio::test]
    async fn test_send_mail_rejects_bad_input_without_inserting() {
        let store = MemoryStore::new();
        let service = SubmissionService::new(Arc::new(store.clone()), mail_config()).unwrap();

        let bad_to = service.send_mail("ops@example.com", "nope", None, "S", "T", None).await;
        assert!(matches!(bad_to, Err(AppError::BadRequest(_))));

        let empty_subject = service.send_mail("ops@example.com", "a@x.com", None, " ", "T", None).await;
        assert!(matches!(empty_subject, Err(AppError::BadRequest(_))));

        assert!(store.messages().await.is_empty());
    }

    #[tokio::test]
    async fn test_display_names_are_quoted_into_deliverable_mailboxes() {
        let store = MemoryStore::new();
        let service = SubmissionService::new(Arc::new(store.clone()), mail_config()).unwrap();

        for name in ["Doe, Jane", "a<b"] {
            service.send_mail("ops@example.com", "jane@example.com", Some(name), "S", "T", None).await.unwrap();
        }
        service.create_user("jane@example.com", "Doe, Jane").await.unwrap();

        for message in store.messages().await {
            let to: Mailbox = message.to.parse().unwrap();
            assert_eq!(to.email.to_string(), "jane@example.com");
            assert_eq!(message.envelope().recipient_address(), "jane@example.com");
            assert!(message.from.parse::<Mailbox>().is_ok());
        }
        let names: Vec<_> =
            store.messages().await.iter().map(|m| m.to.parse::<Mailbox>().unwrap().name.unwrap()).collect();
        assert_eq!(names, vec!["Doe, Jane", "a<b", "Doe, Jane"]);
    }

    #[test]
    fn test_malformed_configured_address_is_rejected() {
        let mut config = mail_config();
        config.support_address = "not an address".to_string();
        assert!(SubmissionService::new(Arc::new(MemoryStore::new()), config).is_err());
    }

    #[tokio::test]
    async fn test_create_user_embeds_token_in_activation_link() {
        let store = MemoryStore::new();
        let service = SubmissionService::new(Arc::new(store.clone()), mail_config()).unwrap();

        let token = service.create_user("jane@example.com", "Jane").await.unwrap();

        let message = &store.messages().await[0];
        assert_eq!(message.token, token);
        assert_eq!(message.from, "Errandspay Support <support@example.com>");
        assert!(message.text.contains(&format!("https://example.com/register/activate/{token}")));
    }

    #[tokio::test]
    async fn test_test_mail_targets_support_address() {
        let store = MemoryStore::new();
        let service = SubmissionService::new(Arc::new(store.clone()), mail_config()).unwrap();

        service.test_mail().await.unwrap();

        let message = &store.messages().await[0];
        assert_eq!(message.to, "Support Errandspay <support@example.com>");
        assert_eq!(message.subject, "Testing Mail");
    }
}
