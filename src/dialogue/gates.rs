//! Gates checked before a vote is processed.
//!
//! Each gate either lets the turn continue or takes it over. The
//! orchestrator evaluates them in a fixed order and stops at the first one
//! that does not continue.

use serde_json::Value;
use tracing::debug;

use crate::dialogue::output::{Progression, slots};
use crate::dialogue::snapshot::StatisticsSnapshot;
use crate::dialogue::state::DialogueState;
use crate::dialogue::vote::STOP_SENTINEL;
use crate::error::Error;
use crate::profile::ProfileQuestion;

/// Below this many comments the comment invitation comes after 2 votes,
/// otherwise after 4.
const COMMENT_INVITATION_THRESHOLD: u32 = 4;

/// Votes between two profile questions.
const PROFILE_QUESTION_INTERVAL: u32 = 2;

/// Outcome of one gate.
#[derive(Debug)]
pub enum GateResult {
    Continue,
    Transition(Progression),
    Fail(Error),
}

impl GateResult {
    /// The progression that ends the turn, if this gate ends it.
    pub fn settle(self) -> Option<Progression> {
        match self {
            Self::Continue => None,
            Self::Transition(progression) => Some(progression),
            Self::Fail(err) => Some(Progression::failure(&err)),
        }
    }
}

/// Anonymous participants must authenticate once they reach the vote limit.
///
/// Exact equality: a participant already past the limit is not asked again.
pub fn should_request_authentication(
    has_completed_registration: bool,
    anonymous_vote_limit: u32,
    snapshot: &StatisticsSnapshot,
) -> bool {
    !has_completed_registration && snapshot.voted_comments() == anonymous_vote_limit
}

/// Whether the participant is invited to write a comment at this point.
pub fn user_can_add_comment(participant_can_add_comments: bool, snapshot: &StatisticsSnapshot) -> bool {
    if !participant_can_add_comments {
        return false;
    }
    let total = snapshot.total_comments();
    let voted = snapshot.voted_comments();
    (total >= COMMENT_INVITATION_THRESHOLD && voted == 4)
        || (total < COMMENT_INVITATION_THRESHOLD && voted == 2)
}

/// Whether a profile question interrupts voting now.
///
/// Returns the vote count at which the next question is due when one is
/// due now. `last_trigger_vote` is that value from the previous trigger,
/// `None` before the first one.
pub fn needs_profile_question(
    remaining: &[ProfileQuestion],
    send_profile_questions: bool,
    votes_to_trigger: u32,
    current_votes: u32,
    last_trigger_vote: Option<u32>,
) -> Option<u32> {
    if remaining.is_empty() || !send_profile_questions {
        return None;
    }
    let baseline = last_trigger_vote.unwrap_or(current_votes);
    if current_votes >= votes_to_trigger && baseline == current_votes {
        debug!(current_votes, next = baseline + PROFILE_QUESTION_INTERVAL, "Profile question due");
        return Some(baseline + PROFILE_QUESTION_INTERVAL);
    }
    None
}

/// Gate wrapper for [`should_request_authentication`].
pub fn authentication_gate(
    has_completed_registration: bool,
    anonymous_vote_limit: u32,
    snapshot: &StatisticsSnapshot,
) -> GateResult {
    if !should_request_authentication(has_completed_registration, anonymous_vote_limit, snapshot) {
        return GateResult::Continue;
    }
    GateResult::Transition(
        Progression::new(DialogueState::AwaitingAuthentication)
            .slot(slots::VOTE, STOP_SENTINEL)
            .slot(slots::ASK_TO_AUTHENTICATE, true),
    )
}

/// Progression that suspends voting on `question`.
pub fn profile_question_progression(question: &ProfileQuestion, next_trigger: u32) -> Progression {
    Progression::new(DialogueState::AwaitingProfileAnswer)
        .slot(slots::VOTE, STOP_SENTINEL)
        .slot(slots::NEED_TO_ASK_PROFILE_QUESTION, true)
        .slot(slots::NEXT_COUNT_TO_SEND_PROFILE_QUESTION, next_trigger.to_string())
        .slot(slots::PROFILE_QUESTION, Value::Null)
        .slot(slots::PROFILE_QUESTION_ID, question.id)
        .say(question.utterance())
}

/// Slots that pause voting for the comment form, keeping the vote value.
pub fn comment_invitation(raw_vote: &str) -> Progression {
    Progression::new(DialogueState::AwaitingComment)
        .slot(slots::VOTE, raw_vote)
        .slot(slots::COMMENT_CONFIRMATION, Value::Null)
        .slot(slots::COMMENT, Value::Null)
}
