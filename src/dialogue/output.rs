//! What a dialogue step produces: the next state, ordered slot updates,
//! outgoing messages and follow-up actions.

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::dialogue::snapshot::StatisticsSnapshot;
use crate::dialogue::state::DialogueState;
use crate::dialogue::vote::STOP_SENTINEL;
use crate::ej::models::NextComment;
use crate::error::{ConfigError, Error};

/// Session slot names shared with the dialogue runtime's domain.
pub mod slots {
    pub const VOTE: &str = "vote";
    pub const DIALOGUE_STATE: &str = "dialogue_state";
    pub const ASK_TO_AUTHENTICATE: &str = "ask_to_authenticate";
    pub const CHECK_AUTHENTICATION: &str = "check_authentication";
    pub const HAS_COMPLETED_REGISTRATION: &str = "has_completed_registration";
    pub const ACCESS_TOKEN: &str = "access_token";
    pub const REFRESH_TOKEN: &str = "refresh_token";
    pub const AUTH_LINK: &str = "auth_link";
    pub const CONTACT_NAME: &str = "contact_name";
    pub const NEED_TO_ASK_PROFILE_QUESTION: &str = "need_to_ask_profile_question";
    pub const NEXT_COUNT_TO_SEND_PROFILE_QUESTION: &str = "next_count_to_send_profile_question";
    pub const PROFILE_QUESTION: &str = "profile_question";
    pub const PROFILE_QUESTION_ID: &str = "profile_question_id";
    pub const COMMENT: &str = "comment";
    pub const COMMENT_CONFIRMATION: &str = "comment_confirmation";
    pub const EJ_API_CONNECTION_ERROR: &str = "ej_api_connection_error";
    pub const PARTICIPANT_VOTED_IN_ALL_COMMENTS: &str = "participant_voted_in_all_comments";
    pub const CURRENT_COMMENT_ID: &str = "current_comment_id";
    pub const COMMENT_CONTENT: &str = "comment_content";
    pub const USER_VOTED_COMMENTS: &str = "user_voted_comments";
    pub const NUMBER_COMMENTS: &str = "number_comments";
    pub const CONVERSATION_ID: &str = "conversation_id";
    pub const CONVERSATION_TEXT: &str = "conversation_text";
    pub const CONVERSATION_STATISTICS: &str = "conversation_statistics";
    pub const ANONYMOUS_VOTES_LIMIT: &str = "anonymous_votes_limit";
    pub const PARTICIPANT_CAN_ADD_COMMENTS: &str = "participant_can_add_comments";
    pub const SEND_PROFILE_QUESTIONS: &str = "send_profile_questions";
    pub const VOTES_TO_SEND_PROFILE_QUESTIONS: &str = "votes_to_send_profile_questions";
    pub const HELP_TOPIC: &str = "help_topic";
}

/// Response templates defined in the dialogue runtime's domain.
pub mod templates {
    pub const VOTE_RECEIVED: &str = "utter_vote_received";
    pub const THANKS_PARTICIPATION: &str = "utter_thanks_participation";
    pub const EJ_COMMUNICATION_ERROR: &str = "utter_ej_communication_error";
    pub const ERROR_TRY_AGAIN_LATER: &str = "utter_error_try_again_later";
    pub const OUT_OF_CONTEXT: &str = "utter_out_of_context";
    pub const SENT_COMMENT: &str = "utter_sent_comment";
    pub const SEND_COMMENT_ERROR: &str = "utter_send_comment_error";
    pub const COMMENT_FALLBACK: &str = "utter_comment_fallback";
    pub const ASK_TO_ADD_COMMENT: &str = "utter_ask_to_add_comment";
    pub const PROFILE_RECEIVED: &str = "utter_profile_received";
    pub const PROFILE_FALLBACK: &str = "utter_profile_fallback";
    pub const GET_TOKEN: &str = "utter_get_token";
    pub const AUTHENTICATION_VALIDATION_ERROR: &str = "utter_error_during_authentication_validation";
    pub const NO_SELECTED_CONVERSATION: &str = "utter_no_selected_conversation";
    pub const NO_CONVERSATIONS: &str = "utter_no_conversations";
    pub const STOPPED_PARTICIPATION: &str = "utter_stopped_participation";
    pub const HELP: &str = "utter_help";
}

/// Follow-up actions requested from the runtime.
pub mod followups {
    pub const SESSION_START: &str = "action_session_start";
    pub const DEACTIVATE_LOOP: &str = "action_deactivate_loop";
}

/// A quick-reply button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Button {
    pub title: String,
    pub payload: String,
}

impl Button {
    pub fn new(title: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            payload: payload.into(),
        }
    }
}

/// One outgoing message.
#[derive(Debug, Clone, PartialEq)]
pub enum Utterance {
    /// A response template rendered by the runtime, with template arguments.
    Template {
        name: String,
        args: serde_json::Map<String, Value>,
    },
    /// Literal text with optional buttons.
    Text { text: String, buttons: Vec<Button> },
}

impl Utterance {
    pub fn template(name: &str) -> Self {
        Self::Template {
            name: name.to_string(),
            args: serde_json::Map::new(),
        }
    }

    pub fn template_with(name: &str, key: &str, value: impl Into<Value>) -> Self {
        let mut args = serde_json::Map::new();
        args.insert(key.to_string(), value.into());
        Self::Template {
            name: name.to_string(),
            args,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            buttons: Vec::new(),
        }
    }

    pub fn with_buttons(text: impl Into<String>, buttons: Vec<Button>) -> Self {
        Self::Text {
            text: text.into(),
            buttons,
        }
    }

    /// Template name, if this is a template.
    pub fn template_name(&self) -> Option<&str> {
        match self {
            Self::Template { name, .. } => Some(name),
            Self::Text { .. } => None,
        }
    }
}

/// The outcome of one dialogue step.
#[derive(Debug, Clone, PartialEq)]
pub struct Progression {
    pub state: DialogueState,
    /// Slot updates, applied by the runtime in order.
    pub slots: Vec<(String, Value)>,
    pub messages: Vec<Utterance>,
    pub followups: Vec<String>,
}

impl Progression {
    pub fn new(state: DialogueState) -> Self {
        Self {
            state,
            slots: Vec::new(),
            messages: Vec::new(),
            followups: Vec::new(),
        }
    }

    pub fn slot(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.slots.push((name.to_string(), value.into()));
        self
    }

    pub fn say(mut self, utterance: Utterance) -> Self {
        self.messages.push(utterance);
        self
    }

    pub fn say_template(self, name: &str) -> Self {
        self.say(Utterance::template(name))
    }

    pub fn followup(mut self, action: &str) -> Self {
        self.followups.push(action.to_string());
        self
    }

    /// Put the slots and messages of `earlier` in front of this step's own.
    pub fn after(mut self, earlier: Progression) -> Self {
        let mut slots = earlier.slots;
        slots.append(&mut self.slots);
        self.slots = slots;
        let mut messages = earlier.messages;
        messages.append(&mut self.messages);
        self.messages = messages;
        self
    }

    /// Last value set for a slot in this step.
    pub fn slot_value(&self, name: &str) -> Option<&Value> {
        self.slots.iter().rev().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.messages.iter().any(|m| m.template_name() == Some(name))
    }

    /// Apology and forced restart after any failure in a step.
    ///
    /// Only a missing conversation gets its own explanation; other
    /// configuration problems are not the participant's business.
    pub fn failure(err: &Error) -> Self {
        warn!(kind = err.kind(), error = %err, "Dialogue step failed");
        let progression = Self::new(DialogueState::Error)
            .slot(slots::VOTE, STOP_SENTINEL)
            .slot(slots::COMMENT, STOP_SENTINEL)
            .slot(slots::COMMENT_CONFIRMATION, STOP_SENTINEL);
        let progression = match err {
            Error::Config(ConfigError::NoConversation(_)) => {
                progression.say_template(templates::NO_SELECTED_CONVERSATION)
            }
            Error::Config(_) => progression,
            _ => progression
                .slot(slots::EJ_API_CONNECTION_ERROR, true)
                .say_template(templates::EJ_COMMUNICATION_ERROR),
        };
        progression
            .say_template(templates::ERROR_TRY_AGAIN_LATER)
            .followup(followups::SESSION_START)
    }

    /// The participant voted on every comment.
    pub fn completed() -> Self {
        Self::new(DialogueState::Finished)
            .say_template(templates::THANKS_PARTICIPATION)
            .slot(slots::VOTE, STOP_SENTINEL)
            .slot(slots::PARTICIPANT_VOTED_IN_ALL_COMMENTS, true)
            .followup(followups::DEACTIVATE_LOOP)
    }

    /// Show a comment and wait for the vote.
    ///
    /// Channels that cannot render buttons get the plain text.
    pub fn present_comment(
        self,
        comment: &NextComment,
        snapshot: &StatisticsSnapshot,
        buttons_supported: bool,
    ) -> Self {
        let title = comment_title(comment, snapshot);
        let utterance = if buttons_supported {
            Utterance::with_buttons(title, vote_buttons())
        } else {
            Utterance::text(title)
        };
        self.say(utterance)
            .slot(slots::VOTE, Value::Null)
            .slot(slots::USER_VOTED_COMMENTS, snapshot.voted_comments())
            .slot(slots::COMMENT_CONTENT, comment.content.as_str())
            .slot(slots::NUMBER_COMMENTS, snapshot.total_comments())
            .slot(slots::CURRENT_COMMENT_ID, comment.id)
    }
}

/// Comment text followed by the participant's progress.
pub fn comment_title(comment: &NextComment, snapshot: &StatisticsSnapshot) -> String {
    format!(
        "{}\n\nO que você acha disso ({}/{})?",
        comment.content,
        snapshot.voted_comments(),
        snapshot.total_comments()
    )
}

pub fn vote_buttons() -> Vec<Button> {
    vec![
        Button::new("Concordar", "1"),
        Button::new("Discordar", "-1"),
        Button::new("Pular", "0"),
    ]
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::error::CommunicationError;

    fn comment() -> NextComment {
        NextComment {
            id: 7,
            content: "Mais ciclovias".into(),
        }
    }

    #[test]
    fn title_shows_progress() {
        let title = comment_title(&comment(), &StatisticsSnapshot::new(20, 3));
        assert_eq!(title, "Mais ciclovias\n\nO que você acha disso (3/20)?");
    }

    #[test]
    fn presenting_a_comment_resets_the_vote() {
        let progression = Progression::new(DialogueState::Voting).present_comment(
            &comment(),
            &StatisticsSnapshot::new(20, 3),
            true,
        );
        assert_eq!(progression.slot_value(slots::VOTE), Some(&Value::Null));
        assert_eq!(progression.slot_value(slots::CURRENT_COMMENT_ID), Some(&json!(7)));
        match &progression.messages[0] {
            Utterance::Text { buttons, .. } => assert_eq!(buttons.len(), 3),
            other => panic!("expected text, got {other:?}"),
        }
    }

    #[test]
    fn livechat_gets_plain_text() {
        let progression = Progression::new(DialogueState::Voting).present_comment(
            &comment(),
            &StatisticsSnapshot::new(20, 3),
            false,
        );
        match &progression.messages[0] {
            Utterance::Text { buttons, .. } => assert!(buttons.is_empty()),
            other => panic!("expected text, got {other:?}"),
        }
    }

    #[test]
    fn communication_failure_forces_restart() {
        let err: Error = CommunicationError::Status {
            route: "/votes/".into(),
            status: 500,
        }
        .into();
        let progression = Progression::failure(&err);
        assert_eq!(progression.state, DialogueState::Error);
        assert_eq!(progression.slot_value(slots::VOTE), Some(&json!("-")));
        assert_eq!(
            progression.slot_value(slots::EJ_API_CONNECTION_ERROR),
            Some(&json!(true))
        );
        assert!(progression.has_template(templates::EJ_COMMUNICATION_ERROR));
        assert_eq!(progression.followups, vec![followups::SESSION_START]);
    }

    #[test]
    fn missing_conversation_has_its_own_apology() {
        let err: Error = ConfigError::NoConversation("set CONVERSATION_ID or BOARD_ID".into()).into();
        let progression = Progression::failure(&err);
        assert_eq!(progression.state, DialogueState::Error);
        assert!(progression.has_template(templates::NO_SELECTED_CONVERSATION));
        assert_eq!(progression.slot_value(slots::EJ_API_CONNECTION_ERROR), None);
    }

    #[test]
    fn other_configuration_failures_get_a_generic_apology() {
        let err: Error = ConfigError::MissingRequired {
            key: "SECRET_KEY".into(),
            hint: "Required to derive participant passwords.".into(),
        }
        .into();
        let progression = Progression::failure(&err);
        assert_eq!(progression.state, DialogueState::Error);
        assert!(!progression.has_template(templates::NO_SELECTED_CONVERSATION));
        assert!(progression.has_template(templates::ERROR_TRY_AGAIN_LATER));
        assert_eq!(progression.slot_value(slots::EJ_API_CONNECTION_ERROR), None);
        assert_eq!(progression.followups, vec![followups::SESSION_START]);
    }

    #[test]
    fn completed_deactivates_the_loop() {
        let progression = Progression::completed();
        assert_eq!(progression.state, DialogueState::Finished);
        assert!(progression.has_template(templates::THANKS_PARTICIPATION));
        assert_eq!(
            progression.slot_value(slots::PARTICIPANT_VOTED_IN_ALL_COMMENTS),
            Some(&json!(true))
        );
        assert_eq!(progression.followups, vec![followups::DEACTIVATE_LOOP]);
    }
}
