//! The command vocabulary and the voice-intent parser.
//!
//! Commands are immutable value objects that flow from the MQTT intent
//! layer and the routine engine into the managers. The union is closed:
//! adding a variant without handling it in the daemon dispatch fails to
//! compile.

use serde_json::Value;
use tracing::{info, warn};

// ─── Directions and Actions ─────────────────────────────────────────

/// Direction in which a control can move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    /// Raise the part.
    Up,
    /// Lower the part.
    Down,
}

impl MoveDirection {
    /// Readable phrase describing the direction.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
        }
    }
}

/// Action requested on a routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutineAction {
    /// Begin running the routine.
    Start,
    /// Stop the running routine.
    Stop,
}

impl RoutineAction {
    /// Readable phrase describing the action.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
        }
    }
}

// ─── Command Union ──────────────────────────────────────────────────

/// A command for the daemon to process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Report overall status.
    Status,
    /// Move a named control in a direction.
    MoveControl {
        /// Name of the control to move.
        control_name: String,
        /// Direction to move it in.
        direction: MoveDirection,
        /// Provenance tag: "voice", "command" or "routine".
        source: String,
    },
    /// Start or stop a named routine.
    Routine {
        /// Name of the routine.
        routine_name: String,
        /// Whether to start or stop it.
        action: RoutineAction,
    },
}

// ─── Intent Parsing ─────────────────────────────────────────────────

/// Parse a voice-assistant intent payload into a command.
///
/// Returns `None` for unrecognized or malformed intents; those are
/// logged and absorbed, never an error.
pub fn parse_from_intent(intent_json: &Value) -> Option<Command> {
    let Some(intent) = intent_json.get("intent") else {
        warn!("Invalid intent.");
        return None;
    };

    let Some(intent_name) = intent.get("intentName").and_then(Value::as_str) else {
        warn!("Invalid intent: missing name.");
        return None;
    };

    match intent_name {
        "GetStatus" => {
            info!("Recognized a get status intent.");
            Some(Command::Status)
        }
        "MovePart" => {
            info!("Attempting to recognize a move control intent.");
            parse_move_control_intent(intent_json)
        }
        "ControlRoutine" => {
            info!("Attempting to recognize a routine intent.");
            parse_routine_intent(intent_json)
        }
        "" => {
            warn!("Invalid intent: empty name.");
            None
        }
        unknown => {
            warn!("Unrecognized intent '{unknown}'.");
            None
        }
    }
}

/// Pull the `rawValue` strings out of the intent's slot list, keyed by
/// slot name. Slots missing either key are skipped.
fn collect_slots<'a>(intent_json: &'a Value) -> Option<Vec<(&'a str, &'a Value)>> {
    let slots = intent_json.get("slots")?.as_array()?;

    let mut found = Vec::new();

    for slot in slots {
        let Some(slot_name) = slot.get("slotName").and_then(Value::as_str) else {
            continue;
        };

        let Some(raw_value) = slot.get("rawValue") else {
            continue;
        };

        found.push((slot_name, raw_value));
    }

    Some(found)
}

fn parse_move_control_intent(intent_json: &Value) -> Option<Command> {
    let Some(slots) = collect_slots(intent_json) else {
        warn!("Invalid move control intent: missing or malformed slots.");
        return None;
    };

    let mut control_name: Option<&str> = None;
    let mut direction: Option<MoveDirection> = None;

    for (slot_name, raw_value) in slots {
        match slot_name {
            "name" => {
                if let Some(value) = raw_value.as_str() {
                    control_name = Some(value);
                }
            }
            "direction" => match raw_value.as_str() {
                Some("raise") => direction = Some(MoveDirection::Up),
                Some("lower") => direction = Some(MoveDirection::Down),
                _ => {}
            },
            _ => {}
        }
    }

    let Some(control_name) = control_name else {
        warn!("Invalid move control intent: missing control name.");
        return None;
    };

    let Some(direction) = direction else {
        warn!("Invalid move control intent: missing direction.");
        return None;
    };

    info!(
        "Recognized a move control intent: move '{control_name}' '{}'.",
        direction.as_str()
    );
    Some(Command::MoveControl {
        control_name: control_name.to_owned(),
        direction,
        source: "voice".to_owned(),
    })
}

fn parse_routine_intent(intent_json: &Value) -> Option<Command> {
    let Some(slots) = collect_slots(intent_json) else {
        warn!("Invalid routine intent: missing or malformed slots.");
        return None;
    };

    let mut routine_name: Option<&str> = None;
    let mut action: Option<RoutineAction> = None;

    for (slot_name, raw_value) in slots {
        match slot_name {
            "name" => {
                if let Some(value) = raw_value.as_str() {
                    routine_name = Some(value);
                }
            }
            "action" => match raw_value.as_str() {
                Some("start") => action = Some(RoutineAction::Start),
                Some("stop") => action = Some(RoutineAction::Stop),
                _ => {}
            },
            _ => {}
        }
    }

    let Some(routine_name) = routine_name else {
        warn!("Invalid routine intent: missing routine name.");
        return None;
    };

    let Some(action) = action else {
        warn!("Invalid routine intent: missing action.");
        return None;
    };

    info!(
        "Recognized a routine intent: '{}' the '{routine_name}' routine.",
        action.as_str()
    );
    Some(Command::Routine {
        routine_name: routine_name.to_owned(),
        action,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn invalid_intents() {
        // Intents are expected to have an intent key.
        assert_eq!(parse_from_intent(&json!({})), None);

        // Which is expected to have an intentName key.
        assert_eq!(parse_from_intent(&json!({"intent": {}})), None);

        // Which should be a non-empty string.
        assert_eq!(parse_from_intent(&json!({"intent": {"intentName": 1}})), None);
        assert_eq!(
            parse_from_intent(&json!({"intent": {"intentName": ""}})),
            None
        );
    }

    #[test]
    fn get_status_intent() {
        let command = parse_from_intent(&json!({"intent": {"intentName": "GetStatus"}}));
        assert_eq!(command, Some(Command::Status));
    }

    #[test]
    fn move_control_intents() {
        // These intents must have a slots key.
        assert_eq!(
            parse_from_intent(&json!({"intent": {"intentName": "MovePart"}})),
            None
        );

        // Which is expected to be a list.
        assert_eq!(
            parse_from_intent(&json!({
                "intent": {"intentName": "MovePart"},
                "slots": null,
            })),
            None
        );

        // Slots without both a name and a value are skipped.
        assert_eq!(
            parse_from_intent(&json!({
                "intent": {"intentName": "MovePart"},
                "slots": [{"rawValue": 1}, {"slotName": 1}],
            })),
            None
        );

        // The name must be a string and the direction raise or lower.
        assert_eq!(
            parse_from_intent(&json!({
                "intent": {"intentName": "MovePart"},
                "slots": [
                    {"slotName": "direction", "rawValue": "chicken"},
                    {"slotName": "name", "rawValue": -1},
                ],
            })),
            None
        );
        assert_eq!(
            parse_from_intent(&json!({
                "intent": {"intentName": "MovePart"},
                "slots": [
                    {"slotName": "direction", "rawValue": "chicken"},
                    {"slotName": "name", "rawValue": "legs"},
                ],
            })),
            None
        );

        let command = parse_from_intent(&json!({
            "intent": {"intentName": "MovePart"},
            "slots": [
                {"slotName": "direction", "rawValue": "raise"},
                {"slotName": "name", "rawValue": "legs"},
            ],
        }));
        assert_eq!(
            command,
            Some(Command::MoveControl {
                control_name: "legs".to_owned(),
                direction: MoveDirection::Up,
                source: "voice".to_owned(),
            })
        );

        let command = parse_from_intent(&json!({
            "intent": {"intentName": "MovePart"},
            "slots": [
                {"slotName": "direction", "rawValue": "lower"},
                {"slotName": "name", "rawValue": "legs"},
            ],
        }));
        assert_eq!(
            command,
            Some(Command::MoveControl {
                control_name: "legs".to_owned(),
                direction: MoveDirection::Down,
                source: "voice".to_owned(),
            })
        );
    }

    #[test]
    fn routine_intents() {
        assert_eq!(
            parse_from_intent(&json!({"intent": {"intentName": "ControlRoutine"}})),
            None
        );

        // Missing action.
        assert_eq!(
            parse_from_intent(&json!({
                "intent": {"intentName": "ControlRoutine"},
                "slots": [{"slotName": "name", "rawValue": "wake"}],
            })),
            None
        );

        // Unknown action.
        assert_eq!(
            parse_from_intent(&json!({
                "intent": {"intentName": "ControlRoutine"},
                "slots": [
                    {"slotName": "name", "rawValue": "wake"},
                    {"slotName": "action", "rawValue": "pause"},
                ],
            })),
            None
        );

        let command = parse_from_intent(&json!({
            "intent": {"intentName": "ControlRoutine"},
            "slots": [
                {"slotName": "name", "rawValue": "wake"},
                {"slotName": "action", "rawValue": "start"},
            ],
        }));
        assert_eq!(
            command,
            Some(Command::Routine {
                routine_name: "wake".to_owned(),
                action: RoutineAction::Start,
            })
        );

        let command = parse_from_intent(&json!({
            "intent": {"intentName": "ControlRoutine"},
            "slots": [
                {"slotName": "name", "rawValue": "wake"},
                {"slotName": "action", "rawValue": "stop"},
            ],
        }));
        assert_eq!(
            command,
            Some(Command::Routine {
                routine_name: "wake".to_owned(),
                action: RoutineAction::Stop,
            })
        );
    }

    #[test]
    fn direction_and_action_strings() {
        assert_eq!(MoveDirection::Up.as_str(), "up");
        assert_eq!(MoveDirection::Down.as_str(), "down");
        assert_eq!(RoutineAction::Start.as_str(), "start");
        assert_eq!(RoutineAction::Stop.as_str(), "stop");
    }
}
