//! Dialogue state machine for one participant session.

use serde::{Deserialize, Serialize};

/// Where the participant is in the voting dialogue.
///
/// Starts in `Voting`. `Finished` and `Error` are terminal: only a
/// conversation restart leaves them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DialogueState {
    #[default]
    Voting,
    AwaitingProfileAnswer,
    AwaitingComment,
    AwaitingAuthentication,
    Finished,
    Error,
}

impl DialogueState {
    /// Check if a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: DialogueState) -> bool {
        use DialogueState::*;
        if self.is_terminal() {
            return false;
        }
        match self {
            Voting => true,
            AwaitingProfileAnswer => matches!(target, Voting | AwaitingProfileAnswer | Error),
            AwaitingComment => matches!(target, Voting | AwaitingComment | Finished | Error),
            AwaitingAuthentication => {
                matches!(target, Voting | AwaitingAuthentication | Finished | Error)
            }
            Finished | Error => false,
        }
    }

    /// Whether the dialogue is over for this session.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Error)
    }

    /// Parse the value stored in the `dialogue_state` slot.
    pub fn from_slot(value: &str) -> Option<Self> {
        serde_json::from_value(serde_json::Value::String(value.to_string())).ok()
    }
}

impl std::fmt::Display for DialogueState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Voting => "voting",
            Self::AwaitingProfileAnswer => "awaiting_profile_answer",
            Self::AwaitingComment => "awaiting_comment",
            Self::AwaitingAuthentication => "awaiting_authentication",
            Self::Finished => "finished",
            Self::Error => "error",
        };
        write!(f, "{s}")
    }
}
