//! HTTP implementation of [`EjPlatform`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::BotConfig;
use crate::dialogue::snapshot::{StatisticsSnapshot, WireStatistics};
use crate::ej::models::{
    AuthSession, BoardData, CommentReceipt, ConversationData, NewComment, NewVote, NextComment,
    ProfileFields, RandomCommentPayload, RefreshedAccess, TokenPair, VoteReceipt,
};
use crate::ej::participant::Participant;
use crate::ej::platform::EjPlatform;
use crate::ej::routes;
use crate::error::CommunicationError;

/// EJ client for one participant turn.
///
/// Cheap to build: the underlying `reqwest::Client` is shared.
pub struct HttpEjPlatform {
    client: reqwest::Client,
    api_url: String,
    next_comment_retry: Duration,
    tokens: Mutex<Option<TokenPair>>,
    tokens_changed: Mutex<bool>,
}

impl HttpEjPlatform {
    pub fn new(client: reqwest::Client, config: &BotConfig, tokens: Option<TokenPair>) -> Self {
        Self {
            client,
            api_url: config.api_url(),
            next_comment_retry: config.next_comment_retry,
            tokens: Mutex::new(tokens),
            tokens_changed: Mutex::new(false),
        }
    }

    async fn send_once(
        &self,
        method: &Method,
        url: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<reqwest::Response, CommunicationError> {
        let mut request = self.client.request(method.clone(), url);
        if let Some(tokens) = self.tokens.lock().await.as_ref() {
            request = request.bearer_auth(&tokens.access);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        request
            .send()
            .await
            .map_err(|e| CommunicationError::request(url, e))
    }

    /// Send a request, refreshing the access token once on HTTP 401.
    async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<reqwest::Response, CommunicationError> {
        let response = self.send_once(&method, url, body).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }
        debug!(route = url, "Access token rejected, refreshing");
        self.refresh_access_token().await?;
        self.send_once(&method, url, body).await
    }

    async fn refresh_access_token(&self) -> Result<(), CommunicationError> {
        let refresh = self
            .tokens
            .lock()
            .await
            .as_ref()
            .map(|t| t.refresh.clone())
            .ok_or_else(|| CommunicationError::TokenRefresh {
                reason: "no refresh token in session".into(),
            })?;

        let url = routes::refresh_token(&self.api_url);
        let response = self
            .client
            .post(&url)
            .json(&json!({ "refresh": refresh }))
            .send()
            .await
            .map_err(|e| CommunicationError::TokenRefresh {
                reason: e.to_string(),
            })?;
        if response.status() != StatusCode::OK {
            return Err(CommunicationError::TokenRefresh {
                reason: format!("{url} answered {}", response.status()),
            });
        }
        let refreshed: RefreshedAccess =
            response
                .json()
                .await
                .map_err(|e| CommunicationError::TokenRefresh {
                    reason: e.to_string(),
                })?;

        if let Some(tokens) = self.tokens.lock().await.as_mut() {
            tokens.access = refreshed.access;
        }
        *self.tokens_changed.lock().await = true;
        Ok(())
    }

    async fn request_json<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<T, CommunicationError> {
        let response = self.send(method, url, body).await?;
        parse_json(url, response).await
    }

    async fn fetch_next_comment(
        &self,
        url: &str,
    ) -> Result<Option<NextComment>, CommunicationError> {
        let payload: RandomCommentPayload = self.request_json(Method::GET, url, None).await?;
        payload
            .into_comment()
            .map_err(|e| CommunicationError::malformed(url, e))
    }

    async fn store_session(&self, session: &AuthSession) {
        *self.tokens.lock().await = Some(session.tokens());
        *self.tokens_changed.lock().await = true;
    }
}

/// Check for a 2xx status and decode the body.
async fn parse_json<T: DeserializeOwned>(
    url: &str,
    response: reqwest::Response,
) -> Result<T, CommunicationError> {
    let status = response.status();
    if !status.is_success() {
        warn!(route = url, status = status.as_u16(), "EJ request failed");
        return Err(CommunicationError::Status {
            route: url.to_string(),
            status: status.as_u16(),
        });
    }
    response
        .json::<T>()
        .await
        .map_err(|e| CommunicationError::malformed(url, e))
}

fn to_value<T: serde::Serialize>(url: &str, body: &T) -> Result<serde_json::Value, CommunicationError> {
    serde_json::to_value(body).map_err(|e| CommunicationError::request(url, e))
}

#[async_trait]
impl EjPlatform for HttpEjPlatform {
    async fn conversation(
        &self,
        conversation_id: u64,
    ) -> Result<ConversationData, CommunicationError> {
        let url = routes::conversation(&self.api_url, conversation_id);
        let mut conversation: ConversationData = self.request_json(Method::GET, &url, None).await?;
        conversation.id.get_or_insert(conversation_id);
        Ok(conversation)
    }

    async fn board(&self, board_id: u64) -> Result<BoardData, CommunicationError> {
        let url = routes::board(&self.api_url, board_id);
        self.request_json(Method::GET, &url, None).await
    }

    async fn participant_statistics(
        &self,
        conversation_id: u64,
    ) -> Result<StatisticsSnapshot, CommunicationError> {
        let url = routes::user_statistics(&self.api_url, conversation_id);
        let wire: WireStatistics = self.request_json(Method::GET, &url, None).await?;
        StatisticsSnapshot::try_from(wire).map_err(|e| CommunicationError::malformed(&url, e))
    }

    async fn next_comment(
        &self,
        conversation_id: u64,
    ) -> Result<Option<NextComment>, CommunicationError> {
        let url = routes::random_comment(&self.api_url, conversation_id);
        match self.fetch_next_comment(&url).await {
            Ok(comment) => Ok(comment),
            Err(e) => {
                warn!(
                    route = %url,
                    error = %e,
                    retry_in_ms = self.next_comment_retry.as_millis() as u64,
                    "Next comment request failed, retrying once"
                );
                tokio::time::sleep(self.next_comment_retry).await;
                self.fetch_next_comment(&url).await
            }
        }
    }

    async fn submit_vote(&self, vote: &NewVote) -> Result<VoteReceipt, CommunicationError> {
        let url = routes::votes(&self.api_url);
        let body = to_value(&url, vote)?;
        let receipt: VoteReceipt = self.request_json(Method::POST, &url, Some(&body)).await?;
        info!(
            comment_id = vote.comment,
            choice = vote.choice,
            created = receipt.created,
            "Vote registered"
        );
        Ok(receipt)
    }

    async fn submit_comment(
        &self,
        comment: &NewComment,
    ) -> Result<CommentReceipt, CommunicationError> {
        let url = routes::comments(&self.api_url);
        let body = to_value(&url, comment)?;
        let receipt: CommentReceipt = self.request_json(Method::POST, &url, Some(&body)).await?;
        info!(conversation_id = comment.conversation, "Comment submitted");
        Ok(receipt)
    }

    async fn profile(&self) -> Result<ProfileFields, CommunicationError> {
        let url = routes::my_profile(&self.api_url);
        self.request_json(Method::GET, &url, None).await
    }

    async fn update_profile_field(
        &self,
        user: u64,
        field: &str,
        answer: i64,
    ) -> Result<(), CommunicationError> {
        let url = routes::profile(&self.api_url, user);
        let mut body = serde_json::Map::new();
        body.insert(field.to_string(), json!(answer));
        let response = self
            .send(Method::PUT, &url, Some(&serde_json::Value::Object(body)))
            .await?;
        if response.status() != StatusCode::OK {
            warn!(route = %url, status = response.status().as_u16(), "Profile update rejected");
            return Err(CommunicationError::Status {
                route: url,
                status: response.status().as_u16(),
            });
        }
        debug!(user, field, answer, "Profile field updated");
        Ok(())
    }

    async fn authenticate(
        &self,
        participant: &Participant,
    ) -> Result<AuthSession, CommunicationError> {
        let login_url = routes::token(&self.api_url);
        let login = self
            .client
            .post(&login_url)
            .json(&participant.login_body())
            .send()
            .await;

        let (url, response) = match login {
            Ok(response) if response.status() == StatusCode::OK => (login_url, response),
            other => {
                let reason = match other {
                    Ok(response) => format!("HTTP {}", response.status()),
                    Err(e) => e.to_string(),
                };
                info!(%reason, "Login failed, registering participant");
                let registration_url = routes::registration(&self.api_url);
                let response = self
                    .client
                    .post(&registration_url)
                    .json(&participant.registration_body())
                    .send()
                    .await
                    .map_err(|e| CommunicationError::Authentication {
                        reason: e.to_string(),
                    })?;
                if response.status() != StatusCode::CREATED {
                    return Err(CommunicationError::Authentication {
                        reason: format!("registration answered {}", response.status()),
                    });
                }
                (registration_url, response)
            }
        };

        let session: AuthSession = response
            .json()
            .await
            .map_err(|e| CommunicationError::malformed(&url, e))?;
        self.store_session(&session).await;
        info!(
            has_completed_registration = session.has_completed_registration,
            "Participant authenticated"
        );
        Ok(session)
    }

    async fn current_tokens(&self) -> Option<TokenPair> {
        if *self.tokens_changed.lock().await {
            self.tokens.lock().await.clone()
        } else {
            None
        }
    }
}
