//! The seam between the dialogue core and the EJ platform.

use async_trait::async_trait;

use crate::dialogue::snapshot::StatisticsSnapshot;
use crate::ej::models::{
    AuthSession, BoardData, CommentReceipt, ConversationData, NewComment, NewVote, NextComment,
    ProfileFields, TokenPair, VoteReceipt,
};
use crate::ej::participant::Participant;
use crate::error::CommunicationError;

/// Every EJ operation the bot needs.
///
/// Implementations are request-scoped: they carry one participant's tokens.
#[async_trait]
pub trait EjPlatform: Send + Sync {
    async fn conversation(&self, conversation_id: u64)
    -> Result<ConversationData, CommunicationError>;

    async fn board(&self, board_id: u64) -> Result<BoardData, CommunicationError>;

    async fn participant_statistics(
        &self,
        conversation_id: u64,
    ) -> Result<StatisticsSnapshot, CommunicationError>;

    /// Next comment to vote on, or `None` when the participant voted on all.
    async fn next_comment(
        &self,
        conversation_id: u64,
    ) -> Result<Option<NextComment>, CommunicationError>;

    async fn submit_vote(&self, vote: &NewVote) -> Result<VoteReceipt, CommunicationError>;

    async fn submit_comment(
        &self,
        comment: &NewComment,
    ) -> Result<CommentReceipt, CommunicationError>;

    async fn profile(&self) -> Result<ProfileFields, CommunicationError>;

    /// `PUT profiles/{user}/` with `{field: answer}`. Only HTTP 200 succeeds.
    async fn update_profile_field(
        &self,
        user: u64,
        field: &str,
        answer: i64,
    ) -> Result<(), CommunicationError>;

    /// Log the participant in, registering them first if needed.
    async fn authenticate(
        &self,
        participant: &Participant,
    ) -> Result<AuthSession, CommunicationError>;

    /// Tokens currently held, if they changed during this request.
    async fn current_tokens(&self) -> Option<TokenPair> {
        None
    }
}
