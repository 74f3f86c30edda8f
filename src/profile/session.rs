//! One participant's pass through the profile questionnaire.

use rand::Rng;
use tracing::debug;

use crate::ej::platform::EjPlatform;
use crate::error::{CommunicationError, Result, ValidationError};
use crate::profile::catalog::{ProfileQuestion, QuestionCatalog};

/// Questions still unanswered for one participant.
#[derive(Debug, Clone)]
pub struct ProfileSession {
    /// EJ user id, used for the profile update route.
    pub user: u64,
    remaining: Vec<ProfileQuestion>,
    random: bool,
}

impl ProfileSession {
    /// Fetch the participant profile and work out what is left to ask.
    pub async fn load<P: EjPlatform + ?Sized>(
        platform: &P,
        catalog: &QuestionCatalog,
    ) -> std::result::Result<Self, CommunicationError> {
        let profile = platform.profile().await?;
        let remaining = catalog.remaining_for(&profile);
        debug!(user = profile.user, remaining = remaining.len(), "Profile loaded");
        Ok(Self {
            user: profile.user,
            remaining,
            random: catalog.random_questions,
        })
    }

    pub fn remaining(&self) -> &[ProfileQuestion] {
        &self.remaining
    }

    /// Take the next question: lowest id, or a random one when the catalog
    /// asks for it.
    pub fn next_question_with<R: Rng>(&mut self, rng: &mut R) -> Option<ProfileQuestion> {
        if self.remaining.is_empty() {
            return None;
        }
        let index = if self.random {
            rng.gen_range(0..self.remaining.len())
        } else {
            0
        };
        Some(self.remaining.remove(index))
    }

    pub fn next_question(&mut self) -> Option<ProfileQuestion> {
        self.next_question_with(&mut rand::thread_rng())
    }
}

/// Check an answer against the catalog without contacting EJ.
pub fn is_valid_answer<'c>(
    catalog: &'c QuestionCatalog,
    answer: &str,
    question_id: u32,
) -> std::result::Result<(&'c ProfileQuestion, i64), ValidationError> {
    let question = catalog
        .question(question_id)
        .ok_or(ValidationError::UnknownProfileQuestion { id: question_id })?;
    let invalid = || ValidationError::InvalidProfileAnswer {
        answer: answer.to_string(),
        question_id,
    };
    let value: i64 = answer.trim().parse().map_err(|_| invalid())?;
    if !question.accepts(value) {
        return Err(invalid());
    }
    Ok((question, value))
}

/// Validate an answer and store it on the participant's EJ profile.
pub async fn submit_answer<P: EjPlatform + ?Sized>(
    platform: &P,
    catalog: &QuestionCatalog,
    user: u64,
    answer: &str,
    question_id: u32,
) -> Result<()> {
    let (question, value) = is_valid_answer(catalog, answer, question_id)?;
    platform
        .update_profile_field(user, &question.put_payload, value)
        .await?;
    Ok(())
}
