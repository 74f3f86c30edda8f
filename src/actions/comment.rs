//! `validate_comment_form`: the participant was invited to write a comment.

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::actions::protocol::ActionRequest;
use crate::actions::{ActionContext, control_command, conversation_context, unchanged};
use crate::dialogue::output::{Progression, slots, templates};
use crate::dialogue::state::DialogueState;
use crate::ej::models::NewComment;
use crate::ej::platform::EjPlatform;

const CONFIRM: &str = "sim";
const DECLINE: &str = "não";

pub async fn validate_comment<P: EjPlatform + ?Sized>(
    context: &ActionContext,
    platform: &P,
    request: &ActionRequest,
    current: DialogueState,
) -> Progression {
    let tracker = &request.tracker;
    let typed = [
        tracker.slot_str(slots::COMMENT),
        tracker.slot_str(slots::COMMENT_CONFIRMATION),
    ];
    if let Some(progression) = control_command(context, typed) {
        return progression;
    }
    let Some(confirmation) = tracker.slot_str(slots::COMMENT_CONFIRMATION) else {
        return unchanged(current);
    };

    match confirmation.trim().to_lowercase().as_str() {
        CONFIRM => match tracker.slot_str(slots::COMMENT) {
            Some(text) => {
                let conversation_id = match conversation_context(tracker) {
                    Ok(conversation) => conversation.conversation_id,
                    Err(err) => return Progression::failure(&err.into()),
                };
                submit(platform, &text, conversation_id).await
            }
            None => Progression::new(DialogueState::AwaitingComment),
        },
        DECLINE | "nao" => {
            debug!("Participant declined to comment");
            resume_voting()
                .slot(slots::COMMENT_CONFIRMATION, DECLINE)
                .slot(slots::COMMENT, "")
        }
        _ => Progression::new(DialogueState::AwaitingComment)
            .slot(slots::COMMENT_CONFIRMATION, Value::Null)
            .say_template(templates::COMMENT_FALLBACK),
    }
}

async fn submit<P: EjPlatform + ?Sized>(platform: &P, text: &str, conversation_id: u64) -> Progression {
    let comment = match NewComment::new(text, conversation_id) {
        Ok(comment) => comment,
        Err(err) => {
            debug!(error = %err, "Comment rejected");
            return Progression::new(DialogueState::AwaitingComment)
                .slot(slots::COMMENT, Value::Null)
                .say_template(templates::COMMENT_FALLBACK);
        }
    };
    match platform.submit_comment(&comment).await {
        Ok(receipt) => {
            info!(conversation_id, created = receipt.created, "Comment submitted");
            resume_voting()
                .say_template(templates::SENT_COMMENT)
                .slot(slots::COMMENT, comment.content)
        }
        Err(err) => {
            warn!(conversation_id, error = %err, "Comment submission failed");
            resume_voting().say_template(templates::SEND_COMMENT_ERROR)
        }
    }
}

/// Clearing the vote slot makes the vote form ask for the next comment.
fn resume_voting() -> Progression {
    Progression::new(DialogueState::Voting).slot(slots::VOTE, Value::Null)
}
