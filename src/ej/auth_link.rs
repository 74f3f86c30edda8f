//! Links to the external authentication service.
//!
//! The service receives a short-lived HS256 JWT identifying the participant
//! and links the anonymous EJ account to a registered one.

use chrono::{DateTime, Utc};
use jsonwebtoken::{EncodingKey, Header};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use crate::config::BotConfig;
use crate::error::ConfigError;

/// Claims carried in the `user_data` query parameter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthLinkClaims {
    pub user_id: String,
    pub secret_id: String,
    pub exp: i64,
}

/// Build `<host>/<component>/link_external_user?user_data=<jwt>`.
pub fn authentication_link(
    config: &BotConfig,
    sender_id: &str,
    secret_id: &str,
    now: DateTime<Utc>,
) -> Result<String, ConfigError> {
    let secret = config
        .jwt_secret
        .as_ref()
        .ok_or_else(|| ConfigError::MissingRequired {
            key: "JWT_SECRET".into(),
            hint: "Required to build external authentication links.".into(),
        })?;
    let (Some(host), Some(component)) = (
        config.external_auth_host.as_deref(),
        config.external_auth_component_id.as_deref(),
    ) else {
        return Err(ConfigError::MissingRequired {
            key: "EXTERNAL_AUTHENTICATION_HOST/BP_EJ_COMPONENT_ID".into(),
            hint: "Both must be set to build external authentication links.".into(),
        });
    };

    let lifetime = chrono::Duration::from_std(config.auth_link_expiration).map_err(|e| {
        ConfigError::InvalidValue {
            key: "auth_link_expiration".into(),
            message: e.to_string(),
        }
    })?;
    let claims = AuthLinkClaims {
        user_id: sender_id.to_string(),
        secret_id: secret_id.to_string(),
        exp: (now + lifetime).timestamp(),
    };
    let token = jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.expose_secret().as_bytes()),
    )
    .map_err(|e| ConfigError::InvalidValue {
        key: "JWT_SECRET".into(),
        message: e.to_string(),
    })?;

    Ok(format!("{host}/{component}/link_external_user?user_data={token}"))
}
