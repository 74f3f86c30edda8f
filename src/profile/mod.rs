//! Demographic profile questionnaire interleaved into voting.

pub mod catalog;
pub mod session;

pub use catalog::{ProfileField, ProfileQuestion, QuestionCatalog};
pub use session::ProfileSession;
