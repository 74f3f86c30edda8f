//! Commands that short-circuit the active form.
//!
//! Checked before anything else on every vote, comment and profile input:
//! - `/start <id>` (or `start <id>`) restarts on another conversation
//! - `parar` / `/stop` abandons the loop

use regex::Regex;
use tracing::debug;

/// A recognised control command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Restart the session on the given conversation id.
    Restart { conversation_id: u64 },
    /// Leave the vote loop.
    Stop,
}

/// Compiled command patterns.
#[derive(Debug, Clone)]
pub struct CommandParser {
    start: Regex,
    stop: Regex,
}

impl CommandParser {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            start: Regex::new(r"^/?start\s+(\d+)")?,
            stop: Regex::new(r"(?i)^\s*(parar|/stop)\s*$")?,
        })
    }

    /// Match raw input against the command patterns.
    pub fn parse(&self, raw: &str) -> Option<Command> {
        if let Some(caps) = self.start.captures(raw.trim_start()) {
            if let Some(conversation_id) = caps.get(1).and_then(|m| m.as_str().parse().ok()) {
                debug!(conversation_id, "Start command matched");
                return Some(Command::Restart { conversation_id });
            }
        }
        if self.stop.is_match(raw) {
            debug!("Stop command matched");
            return Some(Command::Stop);
        }
        None
    }
}
