//! EJ wire types.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Comments must be longer than this many characters to be accepted.
pub const MIN_COMMENT_CHARS: usize = 3;

/// Conversation as returned by `GET conversations/{id}/`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConversationData {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub anonymous_votes_limit: u32,
    #[serde(default)]
    pub participants_can_add_comments: bool,
    #[serde(default)]
    pub send_profile_question: bool,
    #[serde(default)]
    pub votes_to_send_profile_question: u32,
}

/// Board as returned by `GET boards/{id}/`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BoardData {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub conversations: Vec<ConversationData>,
}

/// Raw `random-comment/` payload. An empty object means nothing is left.
#[derive(Debug, Clone, Deserialize)]
pub struct RandomCommentPayload {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub links: Option<CommentLinks>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommentLinks {
    #[serde(rename = "self")]
    pub self_link: String,
}

/// Comment waiting for the participant's vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NextComment {
    pub id: u64,
    pub content: String,
}

impl RandomCommentPayload {
    /// Extract the comment, or `None` when no content was sent.
    ///
    /// The id is the second-to-last segment of `links.self`
    /// (`.../comments/<id>/`).
    pub fn into_comment(self) -> Result<Option<NextComment>, String> {
        let Some(content) = self.content.filter(|c| !c.is_empty()) else {
            return Ok(None);
        };
        let link = self
            .links
            .map(|l| l.self_link)
            .ok_or_else(|| "comment without links.self".to_string())?;
        let segments: Vec<&str> = link.split('/').collect();
        let id = segments
            .len()
            .checked_sub(2)
            .and_then(|i| segments.get(i))
            .and_then(|s| s.parse::<u64>().ok())
            .ok_or_else(|| format!("no comment id in {link:?}"))?;
        Ok(Some(NextComment { id, content }))
    }
}

/// Body of `POST votes/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewVote {
    pub comment: u64,
    pub choice: i8,
    pub channel: String,
}

impl NewVote {
    pub fn new(comment: u64, choice: i8, input_channel: Option<&str>) -> Self {
        let channel = match input_channel {
            None | Some("") | Some("cmdline") => "unknown",
            Some(other) => other,
        };
        Self {
            comment,
            choice,
            channel: channel.to_string(),
        }
    }
}

/// Response of `POST votes/`.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
pub struct VoteReceipt {
    #[serde(default)]
    pub created: bool,
}

/// Body of `POST comments/`. New comments always enter moderation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewComment {
    pub content: String,
    pub conversation: u64,
    pub status: &'static str,
}

impl NewComment {
    pub fn new(content: &str, conversation: u64) -> Result<Self, ValidationError> {
        let content = content.trim();
        let len = content.chars().count();
        if len <= MIN_COMMENT_CHARS {
            return Err(ValidationError::CommentTooShort { len });
        }
        Ok(Self {
            content: content.to_string(),
            conversation,
            status: "pending",
        })
    }
}

/// Response of `POST comments/`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct CommentReceipt {
    #[serde(default)]
    pub created: bool,
    #[serde(default)]
    pub content: Option<String>,
}

/// Profile as returned by `GET profiles/me/`. `0` means the field is unset.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct ProfileFields {
    pub user: u64,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub ethnicity_choices: u8,
    #[serde(default)]
    pub gender: u8,
    #[serde(default)]
    pub age_range: u8,
    #[serde(default)]
    pub region: u8,
}

/// Response of `POST token/` and `POST users/`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub has_completed_registration: bool,
}

impl AuthSession {
    pub fn tokens(&self) -> TokenPair {
        TokenPair {
            access: self.access_token.clone(),
            refresh: self.refresh_token.clone(),
        }
    }
}

/// Bearer tokens carried between turns in session slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Response of `POST refresh-token/`.
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshedAccess {
    pub access: String,
}
