//! Custom actions called by the dialogue runtime.
//!
//! Each action reads the tracker into typed inputs, runs the dialogue core
//! against an [`EjPlatform`] and renders the resulting [`Progression`].

pub mod authentication;
pub mod comment;
pub mod fallback;
pub mod help;
pub mod profile;
pub mod protocol;
pub mod server;
pub mod setup;
pub mod voting;

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::BotConfig;
use crate::dialogue::command::CommandParser;
use crate::dialogue::context::{ConversationContext, VoteTurn};
use crate::dialogue::output::{Progression, slots};
use crate::dialogue::progression::on_command;
use crate::dialogue::state::DialogueState;
use crate::ej::models::AuthSession;
use crate::ej::participant::Participant;
use crate::ej::platform::EjPlatform;
use crate::error::{ConfigError, Error};
use crate::profile::QuestionCatalog;

use self::protocol::{ActionRequest, ActionResponse, Tracker};

/// Everything an action needs besides the platform. Built once at start-up.
pub struct ActionContext {
    pub config: Arc<BotConfig>,
    pub commands: CommandParser,
    pub catalog: QuestionCatalog,
}

impl ActionContext {
    pub fn new(config: Arc<BotConfig>) -> Result<Self, Error> {
        let commands = CommandParser::new()
            .map_err(|e| ConfigError::ParseError(format!("command patterns: {e}")))?;
        let catalog = QuestionCatalog::load(&config)?;
        Ok(Self {
            config,
            commands,
            catalog,
        })
    }
}

/// Actions this server implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionName {
    SetupConversation,
    AskVote,
    ValidateVoteForm,
    AskProfileQuestion,
    ValidateProfileForm,
    AskCheckAuthentication,
    ValidateAuthenticationForm,
    ValidateCommentForm,
    ValidateHelpForm,
    ResetHelpSlots,
    CustomizedFallback,
    StopVote,
}

impl ActionName {
    pub const ALL: [ActionName; 12] = [
        Self::SetupConversation,
        Self::AskVote,
        Self::ValidateVoteForm,
        Self::AskProfileQuestion,
        Self::ValidateProfileForm,
        Self::AskCheckAuthentication,
        Self::ValidateAuthenticationForm,
        Self::ValidateCommentForm,
        Self::ValidateHelpForm,
        Self::ResetHelpSlots,
        Self::CustomizedFallback,
        Self::StopVote,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SetupConversation => "action_setup_conversation",
            Self::AskVote => "action_ask_vote",
            Self::ValidateVoteForm => "validate_vote_form",
            Self::AskProfileQuestion => "action_ask_profile_question",
            Self::ValidateProfileForm => "validate_profile_form",
            Self::AskCheckAuthentication => "action_ask_check_authentication",
            Self::ValidateAuthenticationForm => "validate_authentication_form",
            Self::ValidateCommentForm => "validate_comment_form",
            Self::ValidateHelpForm => "validate_help_form",
            Self::ResetHelpSlots => "action_reset_help_slots",
            Self::CustomizedFallback => "action_customized_fallback",
            Self::StopVote => "action_stop_vote",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.as_str() == name)
    }
}

impl std::fmt::Display for ActionName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Run one action and render its events.
pub async fn run_action<P: EjPlatform + ?Sized>(
    context: &ActionContext,
    platform: &P,
    action: ActionName,
    request: &ActionRequest,
) -> ActionResponse {
    let current = current_state(&request.tracker);
    debug!(action = %action, sender_id = %request.sender_id, state = %current, "Running action");

    let progression = match action {
        ActionName::SetupConversation => setup::setup_conversation(context, platform, request).await,
        ActionName::AskVote => voting::ask_vote(context, platform, request).await,
        ActionName::ValidateVoteForm => voting::validate_vote(context, platform, request, current).await,
        ActionName::AskProfileQuestion => profile::ask_profile_question(context, platform, request).await,
        ActionName::ValidateProfileForm => {
            profile::validate_profile_answer(context, platform, request).await
        }
        ActionName::AskCheckAuthentication => authentication::ask_check_authentication(context, request),
        ActionName::ValidateAuthenticationForm => {
            authentication::validate_authentication(context, platform, request, current).await
        }
        ActionName::ValidateCommentForm => {
            comment::validate_comment(context, platform, request, current).await
        }
        ActionName::ValidateHelpForm => help::validate_help(request, current),
        ActionName::ResetHelpSlots => help::reset_help_slots(current),
        ActionName::CustomizedFallback => fallback::customized_fallback(request, current),
        ActionName::StopVote => fallback::stop_vote(current),
    };

    info!(action = %action, state = %progression.state, "Action finished");
    ActionResponse::render(progression, platform.current_tokens().await)
}

/// Dialogue state stored by the previous turn; `Voting` before the first.
pub fn current_state(tracker: &Tracker) -> DialogueState {
    tracker
        .slot_str(slots::DIALOGUE_STATE)
        .and_then(|s| DialogueState::from_slot(&s))
        .unwrap_or_default()
}

/// Conversation settings from the session slots.
pub fn conversation_context(tracker: &Tracker) -> Result<ConversationContext, ConfigError> {
    let conversation_id =
        tracker
            .slot_u64(slots::CONVERSATION_ID)
            .ok_or_else(|| {
                ConfigError::NoConversation(
                    "the session has no conversation; run action_setup_conversation first".into(),
                )
            })?;
    Ok(ConversationContext {
        conversation_id,
        text: tracker.slot_str(slots::CONVERSATION_TEXT).unwrap_or_default(),
        anonymous_vote_limit: tracker.slot_u32(slots::ANONYMOUS_VOTES_LIMIT).unwrap_or(0),
        participant_can_add_comments: tracker.slot_bool(slots::PARTICIPANT_CAN_ADD_COMMENTS),
        has_completed_registration: tracker.slot_bool(slots::HAS_COMPLETED_REGISTRATION),
        send_profile_questions: tracker.slot_bool(slots::SEND_PROFILE_QUESTIONS),
        votes_to_send_profile_questions: tracker
            .slot_u32(slots::VOTES_TO_SEND_PROFILE_QUESTIONS)
            .unwrap_or(0),
    })
}

/// Per-turn vote inputs from the tracker.
pub fn vote_turn(tracker: &Tracker, raw: String) -> VoteTurn {
    VoteTurn {
        raw,
        current_comment_id: tracker.slot_u64(slots::CURRENT_COMMENT_ID),
        last_profile_trigger: tracker.slot_u32(slots::NEXT_COUNT_TO_SEND_PROFILE_QUESTION),
        input_channel: tracker.latest_input_channel.clone(),
        buttons_supported: tracker.buttons_supported(),
    }
}

/// Channel sender id, from the request or else the tracker.
pub(crate) fn sender_id(request: &ActionRequest) -> &str {
    if request.sender_id.is_empty() {
        request.tracker.sender_id.as_deref().unwrap_or_default()
    } else {
        &request.sender_id
    }
}

/// Log the participant in (registering on first contact).
pub(crate) async fn authenticate_participant<P: EjPlatform + ?Sized>(
    context: &ActionContext,
    platform: &P,
    request: &ActionRequest,
) -> Result<AuthSession, Error> {
    let secret_key =
        context
            .config
            .secret_key
            .as_ref()
            .ok_or_else(|| ConfigError::MissingRequired {
                key: "SECRET_KEY".into(),
                hint: "Required to derive participant passwords.".into(),
            })?;
    let participant = Participant::new(
        sender_id(request),
        request.tracker.contact_name(),
        secret_key,
    );
    let session = platform.authenticate(&participant).await?;
    debug!(
        sender_id = %participant.sender_id,
        registered = session.has_completed_registration,
        "Session ready"
    );
    Ok(session)
}

/// Restart or stop typed into a form slot, which takes precedence over the
/// form's own validation.
pub(crate) fn control_command(
    context: &ActionContext,
    inputs: impl IntoIterator<Item = Option<String>>,
) -> Option<Progression> {
    inputs
        .into_iter()
        .flatten()
        .find_map(|raw| context.commands.parse(&raw))
        .map(on_command)
}

/// An action that changes nothing.
pub(crate) fn unchanged(current: DialogueState) -> Progression {
    Progression::new(current)
}
