//! `action_setup_conversation`: first action of every session.

use chrono::Utc;
use serde_json::json;
use tracing::{debug, info};

use crate::actions::protocol::{ActionRequest, Tracker};
use crate::actions::{ActionContext, authenticate_participant, sender_id};
use crate::dialogue::command::Command;
use crate::dialogue::output::{Progression, followups, slots, templates};
use crate::dialogue::snapshot::StatisticsSnapshot;
use crate::dialogue::state::DialogueState;
use crate::ej::auth_link::authentication_link;
use crate::ej::models::ConversationData;
use crate::ej::participant::{ANONYMOUS_PARTICIPANT_NAME, sha256_hex};
use crate::ej::platform::EjPlatform;
use crate::error::{ConfigError, Error};

pub async fn setup_conversation<P: EjPlatform + ?Sized>(
    context: &ActionContext,
    platform: &P,
    request: &ActionRequest,
) -> Progression {
    match prepare(context, platform, request).await {
        Ok(progression) => progression,
        Err(err) => Progression::failure(&err),
    }
}

async fn prepare<P: EjPlatform + ?Sized>(
    context: &ActionContext,
    platform: &P,
    request: &ActionRequest,
) -> Result<Progression, Error> {
    let tracker = &request.tracker;
    let registered = match tracker.tokens() {
        Some(_) => tracker.slot_bool(slots::HAS_COMPLETED_REGISTRATION),
        None => {
            authenticate_participant(context, platform, request)
                .await?
                .has_completed_registration
        }
    };

    let Some(conversation_id) = resolve_conversation(context, platform, tracker).await? else {
        info!("Board has no conversations");
        return Ok(Progression::new(DialogueState::Finished)
            .say_template(templates::NO_CONVERSATIONS)
            .followup(followups::DEACTIVATE_LOOP));
    };
    let conversation = platform.conversation(conversation_id).await?;
    let snapshot = platform.participant_statistics(conversation_id).await?;

    let mut progression = conversation_slots(
        Progression::new(DialogueState::Voting),
        conversation_id,
        &conversation,
    )
    .slot(slots::CONVERSATION_STATISTICS, statistics_json(&snapshot))
    .slot(
        slots::CONTACT_NAME,
        tracker.contact_name().unwrap_or(ANONYMOUS_PARTICIPANT_NAME),
    )
    .slot(slots::HAS_COMPLETED_REGISTRATION, registered);

    if !registered {
        let sender = sender_id(request);
        match authentication_link(&context.config, sender, &sha256_hex(sender), Utc::now()) {
            Ok(link) => progression = progression.slot(slots::AUTH_LINK, link),
            Err(err) => debug!(error = %err, "No external authentication link"),
        }
    }

    info!(
        conversation_id,
        voted = snapshot.voted_comments(),
        total = snapshot.total_comments(),
        registered,
        "Conversation set up"
    );
    Ok(progression)
}

/// A start command in the latest message, else the pinned conversation,
/// else the first conversation of the configured board.
async fn resolve_conversation<P: EjPlatform + ?Sized>(
    context: &ActionContext,
    platform: &P,
    tracker: &Tracker,
) -> Result<Option<u64>, Error> {
    let command = tracker
        .latest_text()
        .and_then(|text| context.commands.parse(text));
    if let Some(Command::Restart { conversation_id }) = command {
        return Ok(Some(conversation_id));
    }
    if let Some(conversation_id) = context.config.conversation_id {
        return Ok(Some(conversation_id));
    }
    let board_id = context
        .config
        .board_id
        .ok_or_else(|| {
            ConfigError::NoConversation("set CONVERSATION_ID or BOARD_ID".into())
        })?;
    let board = platform.board(board_id).await?;
    Ok(board.conversations.iter().find_map(|c| c.id))
}

/// Slots describing a conversation's settings.
pub(crate) fn conversation_slots(
    progression: Progression,
    conversation_id: u64,
    conversation: &ConversationData,
) -> Progression {
    progression
        .slot(slots::CONVERSATION_ID, conversation_id)
        .slot(slots::CONVERSATION_TEXT, conversation.text.as_str())
        .slot(slots::ANONYMOUS_VOTES_LIMIT, conversation.anonymous_votes_limit)
        .slot(
            slots::PARTICIPANT_CAN_ADD_COMMENTS,
            conversation.participants_can_add_comments,
        )
        .slot(slots::SEND_PROFILE_QUESTIONS, conversation.send_profile_question)
        .slot(
            slots::VOTES_TO_SEND_PROFILE_QUESTIONS,
            conversation.votes_to_send_profile_question,
        )
}

fn statistics_json(snapshot: &StatisticsSnapshot) -> serde_json::Value {
    json!({
        "total_comments": snapshot.total_comments(),
        "comments": snapshot.voted_comments(),
        "missing_votes": snapshot.missing_votes(),
    })
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;
    use crate::actions::test_support::*;
    use crate::ej::mock::MockPlatform;
    use crate::ej::models::{AuthSession, BoardData};

    fn platform() -> MockPlatform {
        let platform = MockPlatform::new(20, 3);
        platform.with(|s| {
            s.conversation = ConversationData {
                id: None,
                text: "Mobilidade urbana".into(),
                anonymous_votes_limit: 5,
                participants_can_add_comments: true,
                send_profile_question: true,
                votes_to_send_profile_question: 2,
            };
            s.session = Some(AuthSession {
                has_completed_registration: false,
                ..registered_session()
            });
        });
        platform
    }

    #[tokio::test]
    async fn first_contact_authenticates_and_fills_the_context() {
        let context = context();
        let platform = platform();
        let request = request("action_setup_conversation", json!({}));

        let progression = setup_conversation(&context, &platform, &request).await;

        assert_eq!(progression.state, DialogueState::Voting);
        assert_eq!(progression.slot_value(slots::CONVERSATION_ID), Some(&json!(74)));
        assert_eq!(
            progression.slot_value(slots::CONVERSATION_TEXT),
            Some(&json!("Mobilidade urbana"))
        );
        assert_eq!(progression.slot_value(slots::ANONYMOUS_VOTES_LIMIT), Some(&json!(5)));
        assert_eq!(
            progression.slot_value(slots::PARTICIPANT_CAN_ADD_COMMENTS),
            Some(&json!(true))
        );
        assert_eq!(
            progression.slot_value(slots::CONVERSATION_STATISTICS),
            Some(&json!({"total_comments": 20, "comments": 3, "missing_votes": 17}))
        );
        assert_eq!(
            progression.slot_value(slots::HAS_COMPLETED_REGISTRATION),
            Some(&json!(false))
        );
        assert_eq!(
            progression.slot_value(slots::CONTACT_NAME),
            Some(&json!(ANONYMOUS_PARTICIPANT_NAME))
        );
        let link = progression.slot_value(slots::AUTH_LINK).and_then(Value::as_str).unwrap();
        assert!(link.starts_with("https://auth.test/component/link_external_user?user_data="));
        platform.read(|s| assert_eq!(s.authentications, vec!["42".to_string()]));
    }

    #[tokio::test]
    async fn existing_tokens_skip_authentication() {
        let context = context();
        let platform = platform();
        let request = request(
            "action_setup_conversation",
            json!({"access_token": "a", "refresh_token": "r", "has_completed_registration": true}),
        );

        let progression = setup_conversation(&context, &platform, &request).await;

        assert_eq!(progression.state, DialogueState::Voting);
        assert_eq!(progression.slot_value(slots::AUTH_LINK), None);
        platform.read(|s| assert!(s.authentications.is_empty()));
    }

    #[tokio::test]
    async fn start_command_picks_the_conversation() {
        let context = context();
        let platform = platform();
        let mut request = request("action_setup_conversation", json!({}));
        request.tracker.latest_message.text = Some("/start 99".into());

        let progression = setup_conversation(&context, &platform, &request).await;

        assert_eq!(progression.slot_value(slots::CONVERSATION_ID), Some(&json!(99)));
    }

    #[tokio::test]
    async fn board_supplies_the_first_conversation() {
        let context = context_with(|c| {
            c.conversation_id = None;
            c.board_id = Some(3);
        });
        let platform = platform();
        platform.with(|s| {
            s.board = BoardData {
                title: Some("Cidade".into()),
                description: None,
                conversations: vec![
                    ConversationData {
                        id: Some(8),
                        ..Default::default()
                    },
                    ConversationData {
                        id: Some(9),
                        ..Default::default()
                    },
                ],
            };
        });
        let request = request("action_setup_conversation", json!({}));

        let progression = setup_conversation(&context, &platform, &request).await;

        assert_eq!(progression.slot_value(slots::CONVERSATION_ID), Some(&json!(8)));
    }

    #[tokio::test]
    async fn empty_board_has_no_conversations() {
        let context = context_with(|c| {
            c.conversation_id = None;
            c.board_id = Some(3);
        });
        let platform = platform();
        let request = request("action_setup_conversation", json!({}));

        let progression = setup_conversation(&context, &platform, &request).await;

        assert_eq!(progression.state, DialogueState::Finished);
        assert!(progression.has_template(templates::NO_CONVERSATIONS));
    }

    #[tokio::test]
    async fn nothing_to_vote_on_is_a_configuration_error() {
        let context = context_with(|c| c.conversation_id = None);
        let platform = platform();
        let request = request("action_setup_conversation", json!({}));

        let progression = setup_conversation(&context, &platform, &request).await;

        assert_eq!(progression.state, DialogueState::Error);
        assert!(progression.has_template(templates::NO_SELECTED_CONVERSATION));
    }

    #[tokio::test]
    async fn missing_secret_key_is_a_configuration_error() {
        let context = context_with(|c| c.secret_key = None);
        let platform = platform();
        let request = request("action_setup_conversation", json!({}));

        let progression = setup_conversation(&context, &platform, &request).await;

        assert_eq!(progression.state, DialogueState::Error);
        assert!(!progression.has_template(templates::NO_SELECTED_CONVERSATION));
        assert!(progression.has_template(templates::ERROR_TRY_AGAIN_LATER));
        platform.read(|s| assert!(s.authentications.is_empty()));
    }

    #[tokio::test]
    async fn failed_login_is_a_communication_error() {
        let context = context();
        let platform = platform();
        platform.with(|s| s.session = None);
        let request = request("action_setup_conversation", json!({}));

        let progression = setup_conversation(&context, &platform, &request).await;

        assert_eq!(progression.state, DialogueState::Error);
        assert!(progression.has_template(templates::EJ_COMMUNICATION_ERROR));
    }
}
