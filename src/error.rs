//! Error types for the EJ bot.
//!
//! Three families, kept apart so callers cannot conflate them:
//! - [`CommunicationError`]: the EJ platform could not be reached or answered
//!   badly. Aborts the current dialogue step and forces a session restart.
//! - [`ValidationError`]: participant input was rejected. Always recoverable
//!   with a fallback message.
//! - [`ConfigError`]: required configuration is missing or malformed. Fatal
//!   for the session.

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("EJ communication error: {0}")]
    Communication(#[from] CommunicationError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl Error {
    /// Short label for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "configuration",
            Self::Communication(_) => "communication",
            Self::Validation(_) => "validation",
        }
    }
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Missing required configuration: {key}. {hint}")]
    MissingRequired { key: String, hint: String },

    /// Nothing tells which conversation the participant votes on.
    #[error("No conversation selected: {0}")]
    NoConversation(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures talking to the EJ platform.
///
/// The dialogue core treats every variant the same way; the detail only
/// exists for logs.
#[derive(Debug, thiserror::Error)]
pub enum CommunicationError {
    #[error("Request to {route} failed: {reason}")]
    Request { route: String, reason: String },

    #[error("{route} answered {}", describe_status(.status))]
    Status { route: String, status: u16 },

    #[error("Malformed response from {route}: {reason}")]
    MalformedResponse { route: String, reason: String },

    #[error("Could not refresh the EJ access token: {reason}")]
    TokenRefresh { reason: String },

    #[error("Participant authentication failed: {reason}")]
    Authentication { reason: String },
}

impl CommunicationError {
    pub(crate) fn request(route: &str, err: impl std::fmt::Display) -> Self {
        Self::Request {
            route: route.to_string(),
            reason: err.to_string(),
        }
    }

    pub(crate) fn malformed(route: &str, err: impl std::fmt::Display) -> Self {
        Self::MalformedResponse {
            route: route.to_string(),
            reason: err.to_string(),
        }
    }
}

/// EJ error code and message for an HTTP status.
pub fn ej_error_code(status: u16) -> (u16, &'static str) {
    match status {
        400 => (1001, "Bad Request: The server could not understand the request."),
        401 => (1002, "Unauthorized: Access is denied due to invalid credentials."),
        403 => (
            1003,
            "Forbidden: The server understood the request, but refuses to authorize it.",
        ),
        404 => (1004, "Not Found: The requested resource could not be found."),
        500 => (1005, "Internal Server Error: The server encountered an internal error."),
        502 => (
            1006,
            "Bad Gateway: The server received an invalid response from the upstream server.",
        ),
        503 => (
            1007,
            "Service Unavailable: The server is currently unable to handle the request.",
        ),
        504 => (
            1008,
            "Gateway Timeout: The server did not receive a timely response from the upstream server.",
        ),
        _ => (9999, "Unknown Error"),
    }
}

fn describe_status(status: &u16) -> String {
    let status = *status;
    let (code, message) = ej_error_code(status);
    format!("HTTP {status} [Error {code}]: {message}")
}

/// Participant input that failed validation.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid vote value: {raw:?}")]
    InvalidVote { raw: String },

    #[error("No comment is waiting for a vote")]
    NoPendingComment,

    #[error("Unknown profile question {id}")]
    UnknownProfileQuestion { id: u32 },

    #[error("Answer {answer:?} is not valid for profile question {question_id}")]
    InvalidProfileAnswer { answer: String, question_id: u32 },

    #[error("Comment is too short ({len} characters)")]
    CommentTooShort { len: usize },

    #[error("Unknown help topic: {topic:?}")]
    UnknownHelpTopic { topic: String },
}

/// Result type alias for the bot.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_renders_ej_code() {
        let err = CommunicationError::Status {
            route: "/api/v1/votes/".into(),
            status: 503,
        };
        let text = err.to_string();
        assert!(text.contains("HTTP 503"));
        assert!(text.contains("[Error 1007]"));
    }

    #[test]
    fn unknown_status_maps_to_generic_code() {
        assert_eq!(ej_error_code(418), (9999, "Unknown Error"));
        assert_eq!(ej_error_code(404).0, 1004);
    }

    #[test]
    fn kinds_are_distinct() {
        let comm: Error = CommunicationError::TokenRefresh {
            reason: "expired".into(),
        }
        .into();
        let validation: Error = ValidationError::NoPendingComment.into();
        let config: Error = ConfigError::MissingEnvVar("EJ_HOST".into()).into();
        assert_eq!(comm.kind(), "communication");
        assert_eq!(validation.kind(), "validation");
        assert_eq!(config.kind(), "configuration");
    }
}
