//! Configuration types.
//!
//! Everything is read once at start-up into [`BotConfig`] and passed down by
//! reference. Nothing below `main` reads the environment.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default port for the action server.
pub const DEFAULT_ACTION_SERVER_PORT: u16 = 5055;

/// Backoff before the single retry of the next-comment request.
pub const DEFAULT_NEXT_COMMENT_RETRY: Duration = Duration::from_secs(2);

/// Lifetime of the JWT embedded in external authentication links.
pub const AUTH_LINK_EXPIRATION: Duration = Duration::from_secs(10 * 60);

/// Bot configuration.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// EJ host, e.g. `https://ej.example.org` (no trailing `/api/v1`).
    pub ej_host: String,
    /// Board whose first conversation is used when no conversation is pinned.
    pub board_id: Option<u64>,
    /// Conversation pinned for every participant.
    pub conversation_id: Option<u64>,
    /// Secret used to sign external authentication links.
    pub jwt_secret: Option<SecretString>,
    /// Secret mixed into participant passwords.
    pub secret_key: Option<SecretString>,
    /// Host of the external authentication service.
    pub external_auth_host: Option<String>,
    /// Component id on the external authentication service.
    pub external_auth_component_id: Option<String>,
    /// Port the action server binds to.
    pub action_server_port: u16,
    /// Profile question catalog override. Built-in catalog when unset.
    pub profile_questions_path: Option<PathBuf>,
    /// Backoff before retrying the next-comment request once.
    pub next_comment_retry: Duration,
    /// Lifetime of external authentication links.
    pub auth_link_expiration: Duration,
}

impl BotConfig {
    /// Minimal configuration pointing at an EJ host.
    pub fn new(ej_host: impl Into<String>) -> Self {
        Self {
            ej_host: ej_host.into().trim_end_matches('/').to_string(),
            board_id: None,
            conversation_id: None,
            jwt_secret: None,
            secret_key: None,
            external_auth_host: None,
            external_auth_component_id: None,
            action_server_port: DEFAULT_ACTION_SERVER_PORT,
            profile_questions_path: None,
            next_comment_retry: DEFAULT_NEXT_COMMENT_RETRY,
            auth_link_expiration: AUTH_LINK_EXPIRATION,
        }
    }

    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let ej_host = get("EJ_HOST").ok_or_else(|| ConfigError::MissingEnvVar("EJ_HOST".into()))?;

        let mut config = Self::new(ej_host);
        config.board_id = parse_opt(&get, "BOARD_ID")?;
        config.conversation_id = parse_opt(&get, "CONVERSATION_ID")?;
        config.jwt_secret = get("JWT_SECRET").map(SecretString::from);
        config.secret_key = get("SECRET_KEY").map(SecretString::from);
        config.external_auth_host = get("EXTERNAL_AUTHENTICATION_HOST")
            .map(|h| h.trim_end_matches('/').to_string());
        config.external_auth_component_id = get("BP_EJ_COMPONENT_ID");
        config.profile_questions_path = get("PROFILE_QUESTIONS_PATH").map(PathBuf::from);

        if let Some(port) = parse_opt::<u16>(&get, "ACTION_SERVER_PORT")? {
            config.action_server_port = port;
        }
        if let Some(ms) = parse_opt::<u64>(&get, "EJ_NEXT_COMMENT_RETRY_MS")? {
            config.next_comment_retry = Duration::from_millis(ms);
        }

        Ok(config)
    }

    /// Base URL of the EJ REST API.
    pub fn api_url(&self) -> String {
        format!("{}/api/v1", self.ej_host)
    }
}

fn parse_opt<T>(get: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get(key) {
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("{raw:?}: {e}"),
            }),
        None => Ok(None),
    }
}
