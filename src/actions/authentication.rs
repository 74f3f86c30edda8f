//! `action_ask_check_authentication` and `validate_authentication_form`.
//!
//! Reached when an anonymous participant hits the vote limit. They register
//! on the external authentication service through a signed link, then
//! confirm here so the bot can log in again and see the completed
//! registration.

use chrono::Utc;
use serde_json::Value;
use tracing::{info, warn};

use crate::actions::protocol::ActionRequest;
use crate::actions::setup::conversation_slots;
use crate::actions::{ActionContext, authenticate_participant, conversation_context, sender_id, unchanged};
use crate::dialogue::output::{Button, Progression, Utterance, followups, slots, templates};
use crate::dialogue::state::DialogueState;
use crate::ej::auth_link::authentication_link;
use crate::ej::participant::sha256_hex;
use crate::ej::platform::EjPlatform;
use crate::error::Error;

pub const CHECK_AUTHENTICATION: &str = "check_participant_authentication";
pub const END_CONVERSATION: &str = "end_participant_conversation";

const WAITING_TEXT: &str = "Estou aguardando você se autenticar para continuar a votação. 😊";

/// Send the authentication link and wait for the participant.
pub fn ask_check_authentication(context: &ActionContext, request: &ActionRequest) -> Progression {
    let tracker = &request.tracker;
    let link = match tracker.slot_str(slots::AUTH_LINK) {
        Some(link) => link,
        None => {
            let sender = sender_id(request);
            match authentication_link(&context.config, sender, &sha256_hex(sender), Utc::now()) {
                Ok(link) => link,
                Err(err) => return Progression::failure(&err.into()),
            }
        }
    };

    let waiting = if tracker.buttons_supported() {
        Utterance::with_buttons(
            WAITING_TEXT,
            vec![
                Button::new("Confirmar", CHECK_AUTHENTICATION),
                Button::new("Encerrar", END_CONVERSATION),
            ],
        )
    } else {
        Utterance::text(WAITING_TEXT)
    };
    Progression::new(DialogueState::AwaitingAuthentication)
        .slot(slots::AUTH_LINK, link.as_str())
        .say(Utterance::template_with(templates::GET_TOKEN, "auth_link", link))
        .say(waiting)
}

/// Log in again and resume voting once the registration is complete.
pub async fn validate_authentication<P: EjPlatform + ?Sized>(
    context: &ActionContext,
    platform: &P,
    request: &ActionRequest,
    current: DialogueState,
) -> Progression {
    let Some(answer) = request.tracker.slot_str(slots::CHECK_AUTHENTICATION) else {
        return unchanged(current);
    };
    if answer == END_CONVERSATION {
        info!("Participant ended the conversation instead of authenticating");
        return Progression::new(DialogueState::Finished)
            .slot(slots::CHECK_AUTHENTICATION, false)
            .slot(slots::HAS_COMPLETED_REGISTRATION, false)
            .followup(followups::DEACTIVATE_LOOP);
    }
    match recheck(context, platform, request).await {
        Ok(progression) => progression,
        Err(err) => Progression::failure(&err),
    }
}

async fn recheck<P: EjPlatform + ?Sized>(
    context: &ActionContext,
    platform: &P,
    request: &ActionRequest,
) -> Result<Progression, Error> {
    let session = authenticate_participant(context, platform, request).await?;
    if !session.has_completed_registration {
        warn!(sender_id = %sender_id(request), "Registration still incomplete");
        return Ok(Progression::new(DialogueState::AwaitingAuthentication)
            .say_template(templates::AUTHENTICATION_VALIDATION_ERROR)
            .slot(slots::CHECK_AUTHENTICATION, Value::Null)
            .slot(slots::HAS_COMPLETED_REGISTRATION, Value::Null));
    }

    let conversation_id = conversation_context(&request.tracker)?.conversation_id;
    let conversation = platform.conversation(conversation_id).await?;
    Ok(conversation_slots(
        Progression::new(DialogueState::Voting),
        conversation_id,
        &conversation,
    )
    .slot(slots::HAS_COMPLETED_REGISTRATION, true)
    .slot(slots::CHECK_AUTHENTICATION, true)
    .slot(slots::ASK_TO_AUTHENTICATE, false)
    .slot(slots::VOTE, Value::Null))
}
