//! The persisted routine description (`routines/*.rtn`).

use std::path::Path;

use lull_common::MoveDirection;
use serde_json::{Value, json};
use tracing::{error, info, warn};

/// One step of a routine: after `delay_ms`, move a control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub delay_ms: i64,
    pub control_name: String,
    pub move_direction: MoveDirection,
}

impl Step {
    pub fn new(delay_ms: i64, control_name: &str, move_direction: MoveDirection) -> Self {
        Self {
            delay_ms,
            control_name: control_name.to_owned(),
            move_direction,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.delay_ms >= 0 && !self.control_name.is_empty()
    }

    /// Parse a step from its JSON object, leaving bad fields at their
    /// sentinels so the caller can discard the step.
    fn load_from_json(step_json: &Value, path: &Path) -> Self {
        let mut step = Self {
            delay_ms: -1,
            control_name: String::new(),
            move_direction: MoveDirection::Up,
        };

        match step_json.get("delayMS").and_then(Value::as_i64) {
            Some(delay_ms) if delay_ms >= 0 => step.delay_ms = delay_ms,
            _ => {
                warn!(
                    "Missing or invalid 'delayMS' in step in routine description file '{}'.",
                    path.display()
                );
            }
        }

        match step_json.get("controlName").and_then(Value::as_str) {
            Some(name) if !name.is_empty() => step.control_name = name.to_owned(),
            _ => {
                warn!(
                    "Missing or invalid 'controlName' in step in routine description file '{}'.",
                    path.display()
                );
            }
        }

        match step_json.get("moveDirection").and_then(Value::as_str) {
            Some("up") => step.move_direction = MoveDirection::Up,
            Some("down") => step.move_direction = MoveDirection::Down,
            _ => {
                warn!(
                    "Missing or invalid 'moveDirection' in step in routine description file '{}'.",
                    path.display()
                );
            }
        }

        step
    }

    fn get_as_json(&self) -> Value {
        json!({
            "delayMS": self.delay_ms,
            "controlName": self.control_name,
            "moveDirection": self.move_direction.as_str(),
        })
    }
}

/// Describes a routine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutineDesc {
    pub name: String,
    pub is_looping: bool,
    steps: Vec<Step>,
}

impl RoutineDesc {
    pub fn new(name: &str, is_looping: bool) -> Self {
        Self {
            name: name.to_owned(),
            is_looping,
            steps: Vec::new(),
        }
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Add a step to the end. Invalid steps are refused.
    pub fn append_step(&mut self, step: Step) -> bool {
        if !step.is_valid() {
            warn!(routine = %self.name, "Cannot append an invalid step.");
            return false;
        }

        self.steps.push(step);
        true
    }

    pub fn is_valid(&self) -> bool {
        !self.name.is_empty() && self.steps.iter().all(Step::is_valid)
    }

    /// Parse a description from a file. Invalid steps are skipped,
    /// never kept.
    pub fn parse_from_file(path: &Path) -> Self {
        let mut desc = Self::default();

        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(_) => {
                error!(
                    "Could not find routine description file '{}'.",
                    path.display()
                );
                return desc;
            }
        };

        let desc_json: Value = match serde_json::from_str(&contents) {
            Ok(value) => value,
            Err(_) => {
                error!(
                    "JSON error decoding routine description file '{}'.",
                    path.display()
                );
                return desc;
            }
        };

        match desc_json.get("name").and_then(Value::as_str) {
            Some(name) if !name.is_empty() => desc.name = name.to_owned(),
            _ => {
                warn!(
                    "Missing or invalid 'name' in routine description file '{}'.",
                    path.display()
                );
            }
        }

        match desc_json.get("isLooping") {
            // Omitting the looping flag is acceptable.
            None => {}
            Some(value) => match value.as_bool() {
                Some(is_looping) => desc.is_looping = is_looping,
                None => {
                    warn!(
                        "Invalid looping '{value}' in routine description file '{}'.",
                        path.display()
                    );
                }
            },
        }

        match desc_json.get("steps") {
            // Omitting the steps is acceptable.
            None => {}
            Some(Value::Array(steps_json)) => {
                for step_json in steps_json {
                    let step = Step::load_from_json(step_json, path);

                    if step.is_valid() {
                        desc.steps.push(step);
                    }
                }
            }
            Some(_) => {
                warn!(
                    "Steps in routine description file '{}' is not a list.",
                    path.display()
                );
            }
        }

        desc
    }

    /// Save the description to a file. Invalid descriptions are never
    /// persisted.
    pub fn save_to_file(&self, path: &Path) -> bool {
        if !self.is_valid() {
            warn!(
                "Cannot save invalid routine description to '{}'.",
                path.display()
            );
            return false;
        }

        let steps_json: Vec<Value> = self.steps.iter().map(Step::get_as_json).collect();

        let desc_json = json!({
            "name": self.name,
            "isLooping": self.is_looping,
            "steps": steps_json,
        });

        let Ok(contents) = serde_json::to_string_pretty(&desc_json) else {
            return false;
        };

        if let Err(err) = std::fs::write(path, contents) {
            error!(
                "Failed to open '{}' to save routine description: {err}.",
                path.display()
            );
            return false;
        }

        true
    }
}

/// Create the routines directory with an empty looping sleep routine
/// on first run.
pub fn bootstrap_routines(base_dir: &Path) {
    let routines_path = base_dir.join("routines");

    if routines_path.exists() {
        return;
    }

    info!(
        "Creating missing routines directory '{}'.",
        routines_path.display()
    );

    if let Err(err) = std::fs::create_dir_all(&routines_path) {
        warn!(
            "Failed to create routines directory '{}': {err}.",
            routines_path.display()
        );
        return;
    }

    let sleep_desc = RoutineDesc::new("sleep", true);
    sleep_desc.save_to_file(&routines_path.join("sleep.rtn"));
}
