//! Action endpoint wire format.
//!
//! The dialogue runtime POSTs one [`ActionRequest`] per turn and applies the
//! returned events in order.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dialogue::output::{Button, Progression, Utterance, slots};
use crate::ej::models::TokenPair;

#[derive(Debug, Clone, Deserialize)]
pub struct ActionRequest {
    pub next_action: String,
    #[serde(default)]
    pub sender_id: String,
    #[serde(default)]
    pub tracker: Tracker,
}

/// The runtime's view of the session.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Tracker {
    #[serde(default)]
    pub sender_id: Option<String>,
    #[serde(default)]
    pub slots: HashMap<String, Value>,
    #[serde(default)]
    pub latest_message: LatestMessage,
    #[serde(default)]
    pub latest_input_channel: Option<String>,
    /// Session history, oldest first. Only action events are read.
    #[serde(default)]
    pub events: Vec<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LatestMessage {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub intent: Option<Intent>,
    #[serde(default)]
    pub metadata: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Intent {
    #[serde(default)]
    pub name: Option<String>,
}

impl Tracker {
    /// A slot's value, treating JSON `null` as unset.
    pub fn slot(&self, name: &str) -> Option<&Value> {
        self.slots.get(name).filter(|v| !v.is_null())
    }

    /// String slots; numbers are rendered as strings.
    pub fn slot_str(&self, name: &str) -> Option<String> {
        match self.slot(name)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Numeric slots, also accepting numeric strings (`"4"`, `4.0`).
    pub fn slot_u64(&self, name: &str) -> Option<u64> {
        match self.slot(name)? {
            Value::Number(n) => n
                .as_u64()
                .or_else(|| n.as_f64().filter(|f| *f >= 0.0 && f.fract() == 0.0).map(|f| f as u64)),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn slot_u32(&self, name: &str) -> Option<u32> {
        self.slot_u64(name).and_then(|n| u32::try_from(n).ok())
    }

    pub fn slot_bool(&self, name: &str) -> bool {
        match self.slot(name) {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
            _ => false,
        }
    }

    /// Session tokens, when both are present.
    pub fn tokens(&self) -> Option<TokenPair> {
        Some(TokenPair {
            access: self.slot_str(slots::ACCESS_TOKEN)?,
            refresh: self.slot_str(slots::REFRESH_TOKEN)?,
        })
    }

    pub fn latest_text(&self) -> Option<&str> {
        self.latest_message.text.as_deref()
    }

    /// Name of the last action or response the runtime ran, skipping
    /// `action_listen`.
    pub fn last_action(&self) -> Option<&str> {
        self.events
            .iter()
            .rev()
            .filter(|event| event.get("event").and_then(Value::as_str) == Some("action"))
            .filter_map(|event| event.get("name")?.as_str())
            .find(|name| *name != "action_listen")
    }

    fn metadata(&self, key: &str) -> Option<&Value> {
        self.latest_message.metadata.as_ref()?.get(key)
    }

    /// Livechat channels mark messages with an `agent` and cannot render
    /// buttons.
    pub fn buttons_supported(&self) -> bool {
        self.metadata("agent").is_none()
    }

    pub fn contact_name(&self) -> Option<&str> {
        self.metadata("user_name")?.as_str()
    }
}

/// One tracker event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    Slot { name: String, value: Value },
    Followup { name: String },
}

/// One message for the participant.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BotResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub buttons: Vec<Button>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(flatten)]
    pub args: serde_json::Map<String, Value>,
}

impl From<Utterance> for BotResponse {
    fn from(utterance: Utterance) -> Self {
        match utterance {
            Utterance::Template { name, args } => Self {
                response: Some(name),
                args,
                ..Default::default()
            },
            Utterance::Text { text, buttons } => Self {
                text: Some(text),
                buttons,
                ..Default::default()
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ActionResponse {
    pub events: Vec<Event>,
    pub responses: Vec<BotResponse>,
}

impl ActionResponse {
    /// Render a progression. The dialogue state goes after the step's own
    /// slots, refreshed tokens after that, follow-ups last.
    pub fn render(progression: Progression, tokens: Option<TokenPair>) -> Self {
        let mut events: Vec<Event> = progression
            .slots
            .into_iter()
            .map(|(name, value)| Event::Slot { name, value })
            .collect();
        events.push(Event::Slot {
            name: slots::DIALOGUE_STATE.to_string(),
            value: Value::String(progression.state.to_string()),
        });
        if let Some(tokens) = tokens {
            events.push(Event::Slot {
                name: slots::ACCESS_TOKEN.to_string(),
                value: Value::String(tokens.access),
            });
            events.push(Event::Slot {
                name: slots::REFRESH_TOKEN.to_string(),
                value: Value::String(tokens.refresh),
            });
        }
        events.extend(
            progression
                .followups
                .into_iter()
                .map(|name| Event::Followup { name }),
        );

        Self {
            events,
            responses: progression.messages.into_iter().map(BotResponse::from).collect(),
        }
    }

    /// Value of the last event setting `name`.
    pub fn slot(&self, name: &str) -> Option<&Value> {
        self.events.iter().rev().find_map(|event| match event {
            Event::Slot { name: n, value } if n == name => Some(value),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::dialogue::output::templates;
    use crate::dialogue::state::DialogueState;

    fn tracker(slots: Value) -> Tracker {
        serde_json::from_value(json!({ "slots": slots })).unwrap()
    }

    #[test]
    fn parses_runtime_request() {
        let request: ActionRequest = serde_json::from_value(json!({
            "next_action": "validate_vote_form",
            "sender_id": "42",
            "version": "3.6.0",
            "domain": {},
            "tracker": {
                "sender_id": "42",
                "slots": {"vote": "1", "conversation_id": 74},
                "latest_message": {
                    "text": "1",
                    "intent": {"name": "vote", "confidence": 0.9},
                    "metadata": {"agent": {"name": "livechat"}}
                },
                "latest_input_channel": "rocketchat"
            }
        }))
        .unwrap();

        assert_eq!(request.next_action, "validate_vote_form");
        assert_eq!(request.tracker.slot_str("vote").as_deref(), Some("1"));
        assert_eq!(request.tracker.slot_u64("conversation_id"), Some(74));
        assert!(!request.tracker.buttons_supported());
        assert_eq!(
            request.tracker.latest_message.intent.unwrap().name.as_deref(),
            Some("vote")
        );
    }

    #[test]
    fn slot_coercions() {
        let tracker = tracker(json!({
            "a": "4", "b": 4.0, "c": null, "d": "true", "e": true, "f": "", "g": -1
        }));
        assert_eq!(tracker.slot_u64("a"), Some(4));
        assert_eq!(tracker.slot_u64("b"), Some(4));
        assert_eq!(tracker.slot_u64("c"), None);
        assert_eq!(tracker.slot_u64("g"), None);
        assert!(tracker.slot_bool("d"));
        assert!(tracker.slot_bool("e"));
        assert!(!tracker.slot_bool("missing"));
        assert_eq!(tracker.slot_str("f"), None);
        assert_eq!(tracker.slot_str("g").as_deref(), Some("-1"));
    }

    #[test]
    fn tokens_need_both_slots() {
        assert!(tracker(json!({"access_token": "a"})).tokens().is_none());
        let tokens = tracker(json!({"access_token": "a", "refresh_token": "r"}))
            .tokens()
            .unwrap();
        assert_eq!(tokens.refresh, "r");
    }

    #[test]
    fn renders_events_in_order() {
        let progression = Progression::new(DialogueState::Error)
            .slot(slots::VOTE, "-")
            .say_template(templates::EJ_COMMUNICATION_ERROR)
            .followup("action_session_start");
        let response = ActionResponse::render(
            progression,
            Some(TokenPair {
                access: "new".into(),
                refresh: "r".into(),
            }),
        );

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(
            json["events"],
            json!([
                {"event": "slot", "name": "vote", "value": "-"},
                {"event": "slot", "name": "dialogue_state", "value": "error"},
                {"event": "slot", "name": "access_token", "value": "new"},
                {"event": "slot", "name": "refresh_token", "value": "r"},
                {"event": "followup", "name": "action_session_start"}
            ])
        );
        assert_eq!(
            json["responses"],
            json!([{"response": "utter_ej_communication_error"}])
        );
    }

    #[test]
    fn renders_template_arguments_and_buttons() {
        let response = ActionResponse::render(
            Progression::new(DialogueState::AwaitingAuthentication)
                .say(Utterance::template_with("utter_get_token", "auth_link", "https://x"))
                .say(Utterance::with_buttons("Ok?", vec![Button::new("Sim", "sim")])),
            None,
        );
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(
            json["responses"],
            json!([
                {"response": "utter_get_token", "auth_link": "https://x"},
                {"text": "Ok?", "buttons": [{"title": "Sim", "payload": "sim"}]}
            ])
        );
    }

    #[test]
    fn last_action_skips_listening_and_slot_events() {
        let tracker: Tracker = serde_json::from_value(json!({
            "events": [
                {"event": "action", "name": "action_ask_vote"},
                {"event": "bot", "text": "Quer comentar?"},
                {"event": "action", "name": "utter_ask_to_add_comment"},
                {"event": "action", "name": "action_listen"},
                {"event": "user", "text": "hmm"},
                {"event": "slot", "name": "conversation_id", "value": 74}
            ]
        }))
        .unwrap();
        assert_eq!(tracker.last_action(), Some("utter_ask_to_add_comment"));
        assert_eq!(Tracker::default().last_action(), None);
    }
}
