use serde::{Deserialize, Serialize};

/// Body of `POST /send-mail`. Missing fields deserialize as empty and are
/// rejected by validation with a JSON error body.
#[derive(Debug, Deserialize)]
pub struct SendMailRequest {
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub text: String,
    pub name: Option<String>,
    pub key: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    #[serde(default)]
    pub to: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub verify: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
