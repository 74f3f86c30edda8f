//! `validate_help_form`: explain one topic without leaving the current state.

use std::str::FromStr;

use serde_json::Value;
use tracing::debug;

use crate::actions::protocol::ActionRequest;
use crate::actions::unchanged;
use crate::dialogue::output::{Progression, slots, templates};
use crate::dialogue::state::DialogueState;
use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HelpTopic {
    Voting,
    Plan,
    KnowMore,
    Authentication,
    Lgpd,
}

impl HelpTopic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Voting => "help_voting",
            Self::Plan => "help_plan",
            Self::KnowMore => "help_know_more",
            Self::Authentication => "help_authentication",
            Self::Lgpd => "help_lgpd",
        }
    }

    /// Template explaining this topic.
    pub fn template(&self) -> String {
        format!("utter_explain_{}", self.as_str())
    }
}

impl FromStr for HelpTopic {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "help_voting" => Ok(Self::Voting),
            "help_plan" => Ok(Self::Plan),
            "help_know_more" => Ok(Self::KnowMore),
            "help_authentication" => Ok(Self::Authentication),
            "help_lgpd" => Ok(Self::Lgpd),
            other => Err(ValidationError::UnknownHelpTopic {
                topic: other.to_string(),
            }),
        }
    }
}

pub fn validate_help(request: &ActionRequest, current: DialogueState) -> Progression {
    let Some(raw) = request.tracker.slot_str(slots::HELP_TOPIC) else {
        return unchanged(current);
    };
    match raw.parse::<HelpTopic>() {
        Ok(topic) => Progression::new(current)
            .slot(slots::HELP_TOPIC, topic.as_str())
            .say_template(&topic.template()),
        Err(err) => {
            debug!(error = %err, "Help topic rejected");
            Progression::new(current)
                .slot(slots::HELP_TOPIC, Value::Null)
                .say_template(templates::HELP)
        }
    }
}

/// `action_reset_help_slots`: let the participant open the help form again.
pub fn reset_help_slots(current: DialogueState) -> Progression {
    Progression::new(current).slot(slots::HELP_TOPIC, Value::Null)
}
