//! Participant identity derived from the channel sender id.
//!
//! EJ never sees the raw sender id for authentication: the participant logs
//! in with a derived e-mail and a password hashed with the bot secret, and is
//! linked across channels through `secret_id`.

use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use sha2::{Digest, Sha256};

/// Display name used when the channel does not send one.
pub const ANONYMOUS_PARTICIPANT_NAME: &str = "Participante anônimo";

/// Hex-encoded SHA-256 of `input`.
pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Credentials for one participant.
#[derive(Debug, Clone)]
pub struct Participant {
    pub sender_id: String,
    pub name: String,
    pub secret_id: String,
    pub email: String,
    password: SecretString,
}

impl Participant {
    pub fn new(sender_id: &str, name: Option<&str>, secret_key: &SecretString) -> Self {
        let password = sha256_hex(&format!("{sender_id}{}", secret_key.expose_secret()));
        let email_local: String = sender_id.chars().filter(|c| !matches!(c, ':' | '+')).collect();
        Self {
            sender_id: sender_id.to_string(),
            name: name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or(ANONYMOUS_PARTICIPANT_NAME)
                .to_string(),
            secret_id: sha256_hex(sender_id),
            email: format!("{email_local}-opinion-bot@mail.com"),
            password: SecretString::from(password),
        }
    }

    /// Body of `POST token/`.
    pub fn login_body(&self) -> serde_json::Value {
        let password = self.password.expose_secret();
        json!({
            "name": self.name,
            "display_name": self.name,
            "password": password,
            "password_confirm": password,
            "email": self.email,
            "secret_id": self.secret_id,
        })
    }

    /// Body of `POST users/`.
    pub fn registration_body(&self) -> serde_json::Value {
        let mut body = self.login_body();
        body["has_completed_registration"] = json!(false);
        body
    }
}
