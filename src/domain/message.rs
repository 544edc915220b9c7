use lettre::Address;
use lettre::message::Mailbox;
use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

/// Delivery lifecycle of a queued message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, sqlx::Type)]
#[sqlx(type_name = "mail_state", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MessageState {
    Pending,
    Sent,
    Failed,
}

#[derive(Debug, Clone)]
pub struct Message {
    pub id: Uuid,
    pub from: String,
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: Option<String>,
    pub token: String,
    pub state: MessageState,
    pub created_at: OffsetDateTime,
    pub sent_at: Option<OffsetDateTime>,
}

impl Message {
    #[must_use]
    pub fn envelope(&self) -> Envelope {
        Envelope {
            from: self.from.clone(),
            to: self.to.clone(),
            subject: self.subject.clone(),
            text: self.text.clone(),
            html: self.html.clone(),
        }
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.state == MessageState::Pending
    }
}

/// A message as handed to the store for insertion. The store assigns the id,
/// the creation timestamp and the initial `Pending` state.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: Option<String>,
    pub token: String,
}

#[derive(Debug, Clone, Default)]
pub struct MessageUpdate {
    pub state: Option<MessageState>,
}

/// The minimal set of fields required to attempt a send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: Option<String>,
}

impl Envelope {
    /// Bare address of the recipient, with any display name stripped.
    #[must_use]
    pub fn recipient_address(&self) -> &str {
        mailbox_address(&self.to)
    }
}

/// Extracts `addr` from `Display Name <addr>`; a bare address is returned as is.
#[must_use]
pub fn mailbox_address(mailbox: &str) -> &str {
    let trimmed = mailbox.trim();
    match (trimmed.rfind('<'), trimmed.ends_with('>')) {
        (Some(start), true) => trimmed[start + 1..trimmed.len() - 1].trim(),
        _ => trimmed,
    }
}

/// Formats `name <addr>`, or the bare address when no usable name is given.
/// Names that are not plain atoms are quoted.
#[must_use]
pub fn format_mailbox(name: Option<&str>, address: Address) -> String {
    let name = name.map(str::trim).filter(|n| !n.is_empty()).map(str::to_string);
    Mailbox::new(name, address).to_string()
}
