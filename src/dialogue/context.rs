//! Per-turn inputs of the dialogue core.

/// Conversation settings carried in the session slots.
///
/// Rebuilt every turn; never persisted by the bot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationContext {
    pub conversation_id: u64,
    pub text: String,
    pub anonymous_vote_limit: u32,
    pub participant_can_add_comments: bool,
    pub has_completed_registration: bool,
    pub send_profile_questions: bool,
    pub votes_to_send_profile_questions: u32,
}

/// One vote-slot update.
#[derive(Debug, Clone, Default)]
pub struct VoteTurn {
    pub raw: String,
    /// Comment shown to the participant last turn.
    pub current_comment_id: Option<u64>,
    /// `next_count_to_send_profile_question` from the previous trigger.
    pub last_profile_trigger: Option<u32>,
    pub input_channel: Option<String>,
    /// False on channels that only render plain text.
    pub buttons_supported: bool,
}
