//! Static catalog of demographic profile questions.
//!
//! Loaded once at start-up. The built-in catalog is compiled in; a JSON file
//! with the same shape can replace it through `PROFILE_QUESTIONS_PATH`.

use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::config::BotConfig;
use crate::dialogue::output::{Button, Utterance};
use crate::ej::models::ProfileFields;
use crate::error::ConfigError;

const BUILTIN_CATALOG: &str = include_str!("../../data/profile-questions.json");

/// Value EJ reports for a profile field nobody filled in.
pub const NOT_FILLED: u8 = 0;

/// The EJ profile field a question fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum ProfileField {
    Gender,
    Region,
    Ethnicity,
    AgeRange,
}

impl ProfileField {
    /// Accepted answer codes, excluding [`NOT_FILLED`].
    pub fn valid_codes(&self) -> &'static [i64] {
        match self {
            Self::Ethnicity => &[1, 2, 3, 4, 5, 6],
            Self::Region => &[1, 2, 3, 4, 5],
            Self::Gender => &[1, 2, 3, 20],
            Self::AgeRange => &[1, 2, 3, 4, 5, 6],
        }
    }

    /// Current value of this field in a participant profile.
    pub fn current(&self, profile: &ProfileFields) -> u8 {
        match self {
            Self::Ethnicity => profile.ethnicity_choices,
            Self::Region => profile.region,
            Self::Gender => profile.gender,
            Self::AgeRange => profile.age_range,
        }
    }

    pub fn is_filled(&self, profile: &ProfileFields) -> bool {
        self.current(profile) != NOT_FILLED
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Answer {
    pub title: String,
    pub payload: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProfileQuestion {
    pub id: u32,
    pub body: String,
    pub answers: Vec<Answer>,
    #[serde(rename = "change")]
    pub target_field: ProfileField,
    /// Name of the field sent in the profile update.
    pub put_payload: String,
}

impl ProfileQuestion {
    /// The question text with one button per answer.
    pub fn utterance(&self) -> Utterance {
        let buttons = self
            .answers
            .iter()
            .map(|a| Button::new(a.title.clone(), a.payload.to_string()))
            .collect();
        Utterance::with_buttons(self.body.clone(), buttons)
    }

    pub fn accepts(&self, answer: i64) -> bool {
        self.answers.iter().any(|a| a.payload == answer)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuestionCatalog {
    /// Pick remaining questions at random instead of by ascending id.
    #[serde(default)]
    pub random_questions: bool,
    pub questions: Vec<ProfileQuestion>,
}

impl QuestionCatalog {
    /// The compiled-in catalog.
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::parse(BUILTIN_CATALOG)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::parse(&raw)
    }

    /// Configured override if any, else the built-in catalog.
    pub fn load(config: &BotConfig) -> Result<Self, ConfigError> {
        let catalog = match &config.profile_questions_path {
            Some(path) => Self::from_file(path)?,
            None => Self::builtin()?,
        };
        info!(
            questions = catalog.questions.len(),
            random = catalog.random_questions,
            "Profile question catalog loaded"
        );
        Ok(catalog)
    }

    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let catalog: Self =
            serde_json::from_str(raw).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        catalog.validate()?;
        Ok(catalog)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let mut ids = std::collections::HashSet::new();
        for question in &self.questions {
            if !ids.insert(question.id) {
                return Err(ConfigError::ParseError(format!(
                    "duplicate profile question id {}",
                    question.id
                )));
            }
            let codes = question.target_field.valid_codes();
            if let Some(bad) = question.answers.iter().find(|a| !codes.contains(&a.payload)) {
                return Err(ConfigError::ParseError(format!(
                    "question {} answer {:?} has payload {} outside {:?}",
                    question.id, bad.title, bad.payload, question.target_field
                )));
            }
        }
        Ok(())
    }

    pub fn question(&self, id: u32) -> Option<&ProfileQuestion> {
        self.questions.iter().find(|q| q.id == id)
    }

    /// Questions whose target field is still unfilled, by ascending id.
    pub fn remaining_for(&self, profile: &ProfileFields) -> Vec<ProfileQuestion> {
        let mut remaining: Vec<ProfileQuestion> = self
            .questions
            .iter()
            .filter(|q| !q.target_field.is_filled(profile))
            .cloned()
            .collect();
        remaining.sort_by_key(|q| q.id);
        remaining
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn profile(gender: u8, age_range: u8, region: u8, ethnicity: u8) -> ProfileFields {
        ProfileFields {
            user: 1,
            phone_number: None,
            ethnicity_choices: ethnicity,
            gender,
            age_range,
            region,
        }
    }

    #[test]
    fn builtin_catalog_is_valid() {
        let catalog = QuestionCatalog::builtin().unwrap();
        assert_eq!(catalog.questions.len(), 4);
        assert!(!catalog.random_questions);
        for field in [
            ProfileField::Gender,
            ProfileField::AgeRange,
            ProfileField::Region,
            ProfileField::Ethnicity,
        ] {
            assert!(catalog.questions.iter().any(|q| q.target_field == field));
        }
    }

    #[test]
    fn remaining_skips_filled_fields_and_sorts_by_id() {
        let catalog = QuestionCatalog::builtin().unwrap();
        let remaining = catalog.remaining_for(&profile(2, 0, 0, 4));
        let fields: Vec<ProfileField> = remaining.iter().map(|q| q.target_field).collect();
        assert_eq!(fields, vec![ProfileField::AgeRange, ProfileField::Region]);
        assert!(remaining.windows(2).all(|w| w[0].id < w[1].id));

        assert!(catalog.remaining_for(&profile(1, 1, 1, 1)).is_empty());
    }

    #[test]
    fn rejects_answers_outside_field_codes() {
        let raw = r#"{"questions": [{"id": 1, "body": "?", "change": "Gender",
            "put_payload": "gender", "answers": [{"title": "x", "payload": 4}]}]}"#;
        assert!(matches!(
            QuestionCatalog::parse(raw),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn rejects_duplicate_ids() {
        let raw = r#"{"questions": [
            {"id": 1, "body": "?", "change": "Region", "put_payload": "region", "answers": []},
            {"id": 1, "body": "?", "change": "Gender", "put_payload": "gender", "answers": []}]}"#;
        assert!(QuestionCatalog::parse(raw).is_err());
    }

    #[test]
    fn loads_override_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"random_questions": true, "questions": [{{"id": 9, "body": "Região?",
                "change": "Region", "put_payload": "region",
                "answers": [{{"title": "Sul", "payload": 5}}]}}]}}"#
        )
        .unwrap();

        let mut config = BotConfig::new("https://ej.test");
        config.profile_questions_path = Some(file.path().to_path_buf());
        let catalog = QuestionCatalog::load(&config).unwrap();
        assert!(catalog.random_questions);
        assert_eq!(catalog.question(9).unwrap().put_payload, "region");
        assert!(catalog.question(1).is_none());
    }

    #[test]
    fn missing_override_file_is_a_config_error() {
        let mut config = BotConfig::new("https://ej.test");
        config.profile_questions_path = Some("/nonexistent/questions.json".into());
        assert!(matches!(
            QuestionCatalog::load(&config),
            Err(ConfigError::Io(_))
        ));
    }

    #[test]
    fn question_renders_answer_buttons() {
        let catalog = QuestionCatalog::builtin().unwrap();
        match catalog.question(1).unwrap().utterance() {
            Utterance::Text { buttons, .. } => {
                assert_eq!(buttons.len(), 4);
                assert_eq!(buttons[3].payload, "20");
            }
            other => panic!("expected text, got {other:?}"),
        }
    }
}
