//! Scripted in-memory EJ platform for unit tests.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::dialogue::snapshot::StatisticsSnapshot;
use crate::ej::models::{
    AuthSession, BoardData, CommentReceipt, ConversationData, NewComment, NewVote, NextComment,
    ProfileFields, TokenPair, VoteReceipt,
};
use crate::ej::participant::Participant;
use crate::ej::platform::EjPlatform;
use crate::error::CommunicationError;

#[derive(Debug, Default)]
pub struct MockState {
    pub total: u32,
    pub voted: u32,
    pub conversation: ConversationData,
    pub board: BoardData,
    pub profile: ProfileFields,
    pub session: Option<AuthSession>,
    pub fail_statistics: bool,
    pub fail_votes: bool,
    pub fail_comments: bool,
    pub fail_next_comment: bool,
    pub fail_profile_update: bool,
    pub votes: Vec<NewVote>,
    pub comments: Vec<NewComment>,
    pub profile_updates: Vec<(u64, String, i64)>,
    pub authentications: Vec<String>,
    pub statistics_calls: usize,
}

/// Each vote increments the voted counter; the next comment is the one
/// after the last voted.
#[derive(Debug, Default)]
pub struct MockPlatform {
    pub state: Mutex<MockState>,
}

fn failure(route: &str) -> CommunicationError {
    CommunicationError::Status {
        route: route.to_string(),
        status: 500,
    }
}

impl MockPlatform {
    pub fn new(total: u32, voted: u32) -> Self {
        let platform = Self::default();
        platform.with(|s| {
            s.total = total;
            s.voted = voted;
            s.profile.user = 1;
        });
        platform
    }

    pub fn with(&self, f: impl FnOnce(&mut MockState)) {
        f(&mut self.state.lock().unwrap());
    }

    pub fn read<T>(&self, f: impl FnOnce(&MockState) -> T) -> T {
        f(&self.state.lock().unwrap())
    }
}

#[async_trait]
impl EjPlatform for MockPlatform {
    async fn conversation(
        &self,
        conversation_id: u64,
    ) -> Result<ConversationData, CommunicationError> {
        let mut conversation = self.read(|s| s.conversation.clone());
        conversation.id.get_or_insert(conversation_id);
        Ok(conversation)
    }

    async fn board(&self, _board_id: u64) -> Result<BoardData, CommunicationError> {
        Ok(self.read(|s| s.board.clone()))
    }

    async fn participant_statistics(
        &self,
        _conversation_id: u64,
    ) -> Result<StatisticsSnapshot, CommunicationError> {
        let mut state = self.state.lock().unwrap();
        state.statistics_calls += 1;
        if state.fail_statistics {
            return Err(failure("user-statistics/"));
        }
        Ok(StatisticsSnapshot::new(state.total, state.voted))
    }

    async fn next_comment(
        &self,
        _conversation_id: u64,
    ) -> Result<Option<NextComment>, CommunicationError> {
        let state = self.state.lock().unwrap();
        if state.fail_next_comment {
            return Err(failure("random-comment/"));
        }
        if state.voted >= state.total {
            return Ok(None);
        }
        let id = u64::from(state.voted) + 1;
        Ok(Some(NextComment {
            id,
            content: format!("Comentário {id}"),
        }))
    }

    async fn submit_vote(&self, vote: &NewVote) -> Result<VoteReceipt, CommunicationError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_votes {
            return Err(failure("votes/"));
        }
        state.votes.push(vote.clone());
        state.voted += 1;
        Ok(VoteReceipt { created: true })
    }

    async fn submit_comment(
        &self,
        comment: &NewComment,
    ) -> Result<CommentReceipt, CommunicationError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_comments {
            return Err(failure("comments/"));
        }
        state.comments.push(comment.clone());
        Ok(CommentReceipt {
            created: true,
            content: Some(comment.content.clone()),
        })
    }

    async fn profile(&self) -> Result<ProfileFields, CommunicationError> {
        Ok(self.read(|s| s.profile.clone()))
    }

    async fn update_profile_field(
        &self,
        user: u64,
        field: &str,
        answer: i64,
    ) -> Result<(), CommunicationError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_profile_update {
            return Err(failure("profiles/"));
        }
        state.profile_updates.push((user, field.to_string(), answer));
        Ok(())
    }

    async fn authenticate(
        &self,
        participant: &Participant,
    ) -> Result<AuthSession, CommunicationError> {
        let mut state = self.state.lock().unwrap();
        state.authentications.push(participant.sender_id.clone());
        state
            .session
            .clone()
            .ok_or_else(|| CommunicationError::Authentication {
                reason: "registration answered 400".into(),
            })
    }

    async fn current_tokens(&self) -> Option<TokenPair> {
        self.read(|s| s.session.as_ref().map(AuthSession::tokens))
    }
}
