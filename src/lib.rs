//! EJ bot: custom actions for a participatory voting chatbot backed by the
//! EJ platform.

pub mod actions;
pub mod config;
pub mod dialogue;
pub mod ej;
pub mod error;
pub mod profile;
