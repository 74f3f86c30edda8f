//! `action_ask_vote` and `validate_vote_form`.

use crate::actions::protocol::ActionRequest;
use crate::actions::{ActionContext, conversation_context, unchanged, vote_turn};
use crate::dialogue::output::{Progression, slots};
use crate::dialogue::progression::DialogueProgression;
use crate::dialogue::state::DialogueState;
use crate::ej::platform::EjPlatform;

/// Present the next comment.
pub async fn ask_vote<P: EjPlatform + ?Sized>(
    context: &ActionContext,
    platform: &P,
    request: &ActionRequest,
) -> Progression {
    let conversation = match conversation_context(&request.tracker) {
        Ok(conversation) => conversation,
        Err(err) => return Progression::failure(&err.into()),
    };
    let turn = vote_turn(&request.tracker, String::new());
    DialogueProgression::new(platform, &context.commands, &context.catalog)
        .ask_vote(&conversation, &turn)
        .await
}

/// Run the vote loop on the value the participant put in the vote slot.
pub async fn validate_vote<P: EjPlatform + ?Sized>(
    context: &ActionContext,
    platform: &P,
    request: &ActionRequest,
    current: DialogueState,
) -> Progression {
    let Some(raw) = request.tracker.slot_str(slots::VOTE) else {
        return unchanged(current);
    };
    let conversation = match conversation_context(&request.tracker) {
        Ok(conversation) => conversation,
        Err(err) => return Progression::failure(&err.into()),
    };
    let turn = vote_turn(&request.tracker, raw);
    DialogueProgression::new(platform, &context.commands, &context.catalog)
        .on_vote(&conversation, &turn, current)
        .await
}
