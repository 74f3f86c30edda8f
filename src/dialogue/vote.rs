//! Classification of raw vote input.

use serde::{Deserialize, Serialize};

/// Slot value that stops the vote loop without voting.
pub const STOP_SENTINEL: &str = "-";

/// What the participant's input means for the vote loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteChoice {
    Agree,
    Disagree,
    Skip,
    /// Internal marker used to leave the vote loop.
    InternalStop,
    /// Anything else. May still be a new comment.
    Invalid,
}

impl VoteChoice {
    /// Classify raw input. Labels are matched exactly as the buttons send them.
    pub fn classify(raw: &str) -> Self {
        match raw {
            "1" | "Concordar" => Self::Agree,
            "-1" | "Discordar" => Self::Disagree,
            "0" | "Pular" => Self::Skip,
            STOP_SENTINEL => Self::InternalStop,
            _ => Self::Invalid,
        }
    }

    /// Choice value EJ stores for this vote, if it is one.
    pub fn ej_value(&self) -> Option<i8> {
        match self {
            Self::Agree => Some(1),
            Self::Disagree => Some(-1),
            Self::Skip => Some(0),
            Self::InternalStop | Self::Invalid => None,
        }
    }

    pub fn is_vote(&self) -> bool {
        self.ej_value().is_some()
    }
}
