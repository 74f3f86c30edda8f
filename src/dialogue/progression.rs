//! The vote loop: what happens after each vote-slot update.
//!
//! Precedence, first match wins:
//! 0. control commands (restart on another conversation, stop)
//! 1. statistics fetch failure
//! 2. anonymous vote limit reached
//! 3. profile question due
//! 4. the input itself: vote, internal stop, new comment or fallback

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::dialogue::command::{Command, CommandParser};
use crate::dialogue::context::{ConversationContext, VoteTurn};
use crate::dialogue::gates::{
    GateResult, authentication_gate, comment_invitation, needs_profile_question,
    profile_question_progression, user_can_add_comment,
};
use crate::dialogue::output::{Progression, Utterance, followups, slots, templates};
use crate::dialogue::snapshot::StatisticsSnapshot;
use crate::dialogue::state::DialogueState;
use crate::dialogue::vote::{STOP_SENTINEL, VoteChoice};
use crate::ej::models::{NewComment, NewVote};
use crate::ej::platform::EjPlatform;
use crate::error::{Error, ValidationError};
use crate::profile::{ProfileSession, QuestionCatalog};

/// Drives one participant turn against the EJ platform.
pub struct DialogueProgression<'a, P: EjPlatform + ?Sized> {
    platform: &'a P,
    commands: &'a CommandParser,
    catalog: &'a QuestionCatalog,
}

impl<'a, P: EjPlatform + ?Sized> DialogueProgression<'a, P> {
    pub fn new(platform: &'a P, commands: &'a CommandParser, catalog: &'a QuestionCatalog) -> Self {
        Self {
            platform,
            commands,
            catalog,
        }
    }

    /// Compute the next state after the participant filled the vote slot.
    pub async fn on_vote(
        &self,
        context: &ConversationContext,
        turn: &VoteTurn,
        current: DialogueState,
    ) -> Progression {
        if let Some(command) = self.commands.parse(&turn.raw) {
            return on_command(command);
        }

        let progression = match self.settle_vote(context, turn, current).await {
            Ok(progression) => progression,
            Err(err) => Progression::failure(&err),
        };

        if !current.can_transition_to(progression.state) {
            warn!(from = %current, to = %progression.state, "Unexpected dialogue transition");
        }
        info!(
            conversation_id = context.conversation_id,
            from = %current,
            state = %progression.state,
            "Vote turn settled"
        );
        progression
    }

    async fn settle_vote(
        &self,
        context: &ConversationContext,
        turn: &VoteTurn,
        current: DialogueState,
    ) -> Result<Progression, Error> {
        let snapshot = self
            .platform
            .participant_statistics(context.conversation_id)
            .await?;

        let gate = authentication_gate(
            context.has_completed_registration,
            context.anonymous_vote_limit,
            &snapshot,
        );
        if let Some(progression) = gate.settle() {
            return Ok(progression);
        }
        if let Some(progression) = self.profile_gate(context, turn, &snapshot).await.settle() {
            return Ok(progression);
        }

        let choice = VoteChoice::classify(&turn.raw);
        if let Some(value) = choice.ej_value() {
            self.record_vote(context, turn, value).await
        } else if choice == VoteChoice::InternalStop {
            self.next_comment_or_finish(Progression::new(DialogueState::Voting), context, turn, &snapshot)
                .await
        } else if context.participant_can_add_comments {
            self.comment_from_vote(context, turn, &snapshot, current).await
        } else {
            let err = ValidationError::InvalidVote {
                raw: turn.raw.clone(),
            };
            debug!(error = %err, "Input is not a vote");
            Ok(out_of_context())
        }
    }

    async fn profile_gate(
        &self,
        context: &ConversationContext,
        turn: &VoteTurn,
        snapshot: &StatisticsSnapshot,
    ) -> GateResult {
        if !context.send_profile_questions {
            return GateResult::Continue;
        }
        let mut session = match ProfileSession::load(self.platform, self.catalog).await {
            Ok(session) => session,
            Err(err) => return GateResult::Fail(err.into()),
        };
        let Some(next_trigger) = needs_profile_question(
            session.remaining(),
            context.send_profile_questions,
            context.votes_to_send_profile_questions,
            snapshot.voted_comments(),
            turn.last_profile_trigger,
        ) else {
            return GateResult::Continue;
        };
        match session.next_question() {
            Some(question) => {
                GateResult::Transition(profile_question_progression(&question, next_trigger))
            }
            None => GateResult::Continue,
        }
    }

    async fn record_vote(
        &self,
        context: &ConversationContext,
        turn: &VoteTurn,
        value: i8,
    ) -> Result<Progression, Error> {
        let Some(comment_id) = turn.current_comment_id else {
            warn!(raw = %turn.raw, "{}", ValidationError::NoPendingComment);
            return Ok(out_of_context());
        };

        let vote = NewVote::new(comment_id, value, turn.input_channel.as_deref());
        let receipt = self.platform.submit_vote(&vote).await?;
        let mut acknowledged = Progression::new(DialogueState::Voting);
        if receipt.created {
            acknowledged = acknowledged.say_template(templates::VOTE_RECEIVED);
        }

        let snapshot = self
            .platform
            .participant_statistics(context.conversation_id)
            .await?;
        if user_can_add_comment(context.participant_can_add_comments, &snapshot) {
            debug!(voted = snapshot.voted_comments(), "Inviting participant to comment");
            return Ok(comment_invitation(&turn.raw).after(acknowledged));
        }
        self.next_comment_or_finish(acknowledged, context, turn, &snapshot)
            .await
    }

    /// Free text in the vote slot becomes a new comment.
    ///
    /// A rejected submission leaves the participant where they were.
    async fn comment_from_vote(
        &self,
        context: &ConversationContext,
        turn: &VoteTurn,
        snapshot: &StatisticsSnapshot,
        current: DialogueState,
    ) -> Result<Progression, Error> {
        let comment = match NewComment::new(&turn.raw, context.conversation_id) {
            Ok(comment) => comment,
            Err(err) => {
                debug!(error = %err, "Input is neither a vote nor a comment");
                return Ok(out_of_context());
            }
        };
        match self.platform.submit_comment(&comment).await {
            Ok(_) => {
                let sent = Progression::new(DialogueState::Voting)
                    .say_template(templates::SENT_COMMENT);
                self.next_comment_or_finish(sent, context, turn, snapshot)
                    .await
            }
            Err(err) => {
                warn!(error = %err, "Comment submission failed");
                Ok(Progression::new(current)
                    .slot(slots::VOTE, Value::Null)
                    .say_template(templates::SEND_COMMENT_ERROR))
            }
        }
    }

    async fn next_comment_or_finish(
        &self,
        base: Progression,
        context: &ConversationContext,
        turn: &VoteTurn,
        snapshot: &StatisticsSnapshot,
    ) -> Result<Progression, Error> {
        if !snapshot.comments_remain() {
            return Ok(Progression::completed().after(base));
        }
        match self.platform.next_comment(context.conversation_id).await? {
            Some(comment) => Ok(base.present_comment(&comment, snapshot, turn.buttons_supported)),
            None => Ok(Progression::completed().after(base)),
        }
    }

    /// Show the next comment to vote on, or finish when none is left.
    pub async fn ask_vote(&self, context: &ConversationContext, turn: &VoteTurn) -> Progression {
        match self.present_next(context, turn).await {
            Ok(progression) => progression,
            Err(err) => Progression::failure(&err),
        }
    }

    async fn present_next(
        &self,
        context: &ConversationContext,
        turn: &VoteTurn,
    ) -> Result<Progression, Error> {
        let snapshot = self
            .platform
            .participant_statistics(context.conversation_id)
            .await?;
        self.next_comment_or_finish(Progression::new(DialogueState::Voting), context, turn, &snapshot)
            .await
    }
}

/// Control commands leave whatever form is active.
pub(crate) fn on_command(command: Command) -> Progression {
    match command {
        Command::Restart { conversation_id } => {
            info!(conversation_id, "Restarting on another conversation");
            Progression::new(DialogueState::Voting)
                .slot(slots::VOTE, STOP_SENTINEL)
                .slot(slots::CONVERSATION_ID, conversation_id)
                .followup(followups::SESSION_START)
        }
        Command::Stop => {
            info!("Participant stopped voting");
            Progression::new(DialogueState::Finished)
                .slot(slots::VOTE, STOP_SENTINEL)
                .say(Utterance::template(templates::STOPPED_PARTICIPATION))
                .followup(followups::DEACTIVATE_LOOP)
        }
    }
}

fn out_of_context() -> Progression {
    Progression::new(DialogueState::Voting)
        .slot(slots::VOTE, Value::Null)
        .say_template(templates::OUT_OF_CONTEXT)
}
