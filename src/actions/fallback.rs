//! `action_customized_fallback` and `action_stop_vote`.

use tracing::debug;

use crate::actions::protocol::ActionRequest;
use crate::dialogue::output::{Progression, followups, templates};
use crate::dialogue::state::DialogueState;

/// Reply to input nothing else understood, depending on what was asked last.
pub fn customized_fallback(request: &ActionRequest, current: DialogueState) -> Progression {
    let last_action = request.tracker.last_action();
    debug!(last_action, "Fallback triggered");
    let template = match last_action {
        Some(templates::ASK_TO_ADD_COMMENT) => templates::COMMENT_FALLBACK,
        _ => templates::HELP,
    };
    Progression::new(current).say_template(template)
}

/// Leave the active form without touching the session.
pub fn stop_vote(current: DialogueState) -> Progression {
    Progression::new(current).followup(followups::DEACTIVATE_LOOP)
}
