//! `action_ask_profile_question` and `validate_profile_form`.

use serde_json::Value;
use tracing::{debug, info};

use crate::actions::{ActionContext, control_command};
use crate::actions::protocol::ActionRequest;
use crate::dialogue::output::{Progression, slots, templates};
use crate::dialogue::state::DialogueState;
use crate::dialogue::vote::STOP_SENTINEL;
use crate::ej::platform::EjPlatform;
use crate::error::{Error, ValidationError};
use crate::profile::ProfileSession;
use crate::profile::session::submit_answer;

/// Ask the pending profile question again if it is still unanswered,
/// otherwise the next one. Resumes voting when the profile is complete.
pub async fn ask_profile_question<P: EjPlatform + ?Sized>(
    context: &ActionContext,
    platform: &P,
    request: &ActionRequest,
) -> Progression {
    let mut session = match ProfileSession::load(platform, &context.catalog).await {
        Ok(session) => session,
        Err(err) => return Progression::failure(&err.into()),
    };
    let pending = request
        .tracker
        .slot_u32(slots::PROFILE_QUESTION_ID)
        .and_then(|id| session.remaining().iter().find(|q| q.id == id).cloned());

    match pending.or_else(|| session.next_question()) {
        Some(question) => Progression::new(DialogueState::AwaitingProfileAnswer)
            .slot(slots::PROFILE_QUESTION_ID, question.id)
            .say(question.utterance()),
        None => {
            debug!(user = session.user, "Profile already complete");
            Progression::new(DialogueState::Voting)
                .slot(slots::NEED_TO_ASK_PROFILE_QUESTION, false)
                .slot(slots::PROFILE_QUESTION, STOP_SENTINEL)
        }
    }
}

/// Store the answer on the participant's EJ profile.
pub async fn validate_profile_answer<P: EjPlatform + ?Sized>(
    context: &ActionContext,
    platform: &P,
    request: &ActionRequest,
) -> Progression {
    let tracker = &request.tracker;
    let Some(answer) = tracker.slot_str(slots::PROFILE_QUESTION) else {
        return Progression::new(DialogueState::AwaitingProfileAnswer);
    };
    if let Some(progression) = control_command(context, [Some(answer.clone())]) {
        return progression;
    }
    let Some(question_id) = tracker.slot_u32(slots::PROFILE_QUESTION_ID) else {
        return fallback(&ValidationError::InvalidProfileAnswer {
            answer,
            question_id: 0,
        });
    };

    let user = match platform.profile().await {
        Ok(profile) => profile.user,
        Err(err) => return Progression::failure(&err.into()),
    };
    match submit_answer(platform, &context.catalog, user, &answer, question_id).await {
        Ok(()) => {
            info!(user, question_id, "Profile answer stored");
            Progression::new(DialogueState::Voting)
                .say_template(templates::PROFILE_RECEIVED)
                .slot(slots::PROFILE_QUESTION, answer)
                .slot(slots::PROFILE_QUESTION_ID, Value::Null)
                .slot(slots::NEED_TO_ASK_PROFILE_QUESTION, false)
                .slot(slots::VOTE, Value::Null)
        }
        Err(Error::Validation(err)) => fallback(&err),
        Err(err) => Progression::failure(&err),
    }
}

fn fallback(err: &ValidationError) -> Progression {
    debug!(error = %err, "Profile answer rejected");
    Progression::new(DialogueState::AwaitingProfileAnswer)
        .say_template(templates::PROFILE_FALLBACK)
        .slot(slots::PROFILE_QUESTION, Value::Null)
}
