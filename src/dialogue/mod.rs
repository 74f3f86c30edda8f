//! Voting dialogue core: vote classification, gates and the state
//! progression that composes them.

pub mod command;
pub mod context;
pub mod gates;
pub mod output;
pub mod progression;
pub mod snapshot;
pub mod state;
pub mod vote;

pub use context::{ConversationContext, VoteTurn};
pub use output::Progression;
pub use progression::DialogueProgression;
pub use snapshot::StatisticsSnapshot;
pub use state::DialogueState;
pub use vote::VoteChoice;
