//! The persisted control configuration record (`controls/*.ctl`).
//!
//! Records are JSON and parsed field-tolerantly: a missing or mistyped
//! field is logged and left at its sentinel (or default, for the cool
//! down duration), so `is_valid` reliably reflects whether the record
//! is usable. Loaders skip invalid records; they never abort a whole
//! load over one bad file.

use std::path::Path;

use serde_json::{Value, json};
use tracing::{error, info, warn};

/// Default cool down duration when the record omits it, in ms.
pub const DEFAULT_COOL_DOWN_DURATION_MS: i64 = 25;

/// Sentinel for numeric fields that were missing or invalid.
const INVALID: i64 = -1;

/// Specifies the configuration of a control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlConfig {
    /// Control name. Empty means missing.
    pub name: String,
    /// GPIO line that moves the part up.
    pub up_gpio_line: i64,
    /// GPIO line that moves the part down.
    pub down_gpio_line: i64,
    /// How long a movement runs, in ms.
    pub moving_duration_ms: i64,
    /// How long the control rests after moving, in ms.
    pub cool_down_duration_ms: i64,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            up_gpio_line: INVALID,
            down_gpio_line: INVALID,
            moving_duration_ms: INVALID,
            cool_down_duration_ms: DEFAULT_COOL_DOWN_DURATION_MS,
        }
    }
}

impl ControlConfig {
    /// A fully specified record.
    pub fn new(
        name: &str,
        up_gpio_line: i64,
        down_gpio_line: i64,
        moving_duration_ms: i64,
        cool_down_duration_ms: i64,
    ) -> Self {
        Self {
            name: name.to_owned(),
            up_gpio_line,
            down_gpio_line,
            moving_duration_ms,
            cool_down_duration_ms,
        }
    }

    /// Check whether this is a usable control config.
    pub fn is_valid(&self) -> bool {
        if self.name.is_empty() {
            return false;
        }

        if self.up_gpio_line < 0 || self.down_gpio_line < 0 {
            return false;
        }

        // GPIO lines cannot be the same.
        if self.up_gpio_line == self.down_gpio_line {
            return false;
        }

        if self.moving_duration_ms < 0 {
            return false;
        }

        self.cool_down_duration_ms >= 0
    }

    /// Parse a config from a file, leaving missing or invalid fields at
    /// their sentinel or default.
    pub fn parse_from_file(path: &Path) -> Self {
        let mut config = Self::default();

        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(_) => {
                error!("Could not find control config file '{}'.", path.display());
                return config;
            }
        };

        let config_json: Value = match serde_json::from_str(&contents) {
            Ok(value) => value,
            Err(_) => {
                error!(
                    "JSON error decoding control config file '{}'.",
                    path.display()
                );
                return config;
            }
        };

        match config_json.get("name").and_then(Value::as_str) {
            Some(name) if !name.is_empty() => config.name = name.to_owned(),
            _ => {
                warn!(
                    "Missing or invalid 'name' in control config file '{}'.",
                    path.display()
                );
            }
        }

        config.up_gpio_line = parse_line_field(&config_json, "upGPIOLine", path);
        config.down_gpio_line = parse_line_field(&config_json, "downGPIOLine", path);

        match config_json.get("movingDurationMS").and_then(Value::as_i64) {
            Some(duration_ms) if duration_ms >= 0 => config.moving_duration_ms = duration_ms,
            _ => {
                warn!(
                    "Missing or invalid 'movingDurationMS' in control config file '{}'.",
                    path.display()
                );
            }
        }

        match config_json.get("coolDownDurationMS") {
            // Omitting the cool down duration is acceptable.
            None => {}
            Some(value) => match value.as_i64() {
                Some(duration_ms) if duration_ms >= 0 => {
                    config.cool_down_duration_ms = duration_ms;
                }
                _ => {
                    warn!(
                        "Invalid cool down duration '{value}' in control config file '{}'.",
                        path.display()
                    );
                }
            },
        }

        config
    }

    /// Save a config to a file. Invalid configs are never persisted.
    pub fn save_to_file(&self, path: &Path) -> bool {
        if !self.is_valid() {
            warn!("Cannot save invalid control config to '{}'.", path.display());
            return false;
        }

        let config_json = json!({
            "name": self.name,
            "upGPIOLine": self.up_gpio_line,
            "downGPIOLine": self.down_gpio_line,
            "movingDurationMS": self.moving_duration_ms,
            "coolDownDurationMS": self.cool_down_duration_ms,
        });

        let Ok(contents) = serde_json::to_string_pretty(&config_json) else {
            return false;
        };

        if let Err(err) = std::fs::write(path, contents) {
            error!(
                "Failed to open '{}' to save control config: {err}.",
                path.display()
            );
            return false;
        }

        true
    }
}

fn parse_line_field(config_json: &Value, key: &str, path: &Path) -> i64 {
    match config_json.get(key).and_then(Value::as_i64) {
        Some(line) if line >= 0 => line,
        _ => {
            warn!(
                "Missing or invalid '{key}' in control config file '{}'.",
                path.display()
            );
            INVALID
        }
    }
}

/// Create the controls directory with the stock bed controls on first
/// run.
pub fn bootstrap_control_configs(base_dir: &Path) {
    let controls_path = base_dir.join("controls");

    if controls_path.exists() {
        return;
    }

    info!(
        "Creating missing control config directory '{}'.",
        controls_path.display()
    );

    if let Err(err) = std::fs::create_dir_all(&controls_path) {
        warn!(
            "Failed to create control config directory '{}': {err}.",
            controls_path.display()
        );
        return;
    }

    // Now that the directory exists, populate it with the stock controls.
    let back = ControlConfig::new("back", 20, 16, 7000, DEFAULT_COOL_DOWN_DURATION_MS);
    back.save_to_file(&controls_path.join("back.ctl"));

    let legs = ControlConfig::new("legs", 13, 26, 4000, DEFAULT_COOL_DOWN_DURATION_MS);
    legs.save_to_file(&controls_path.join("legs.ctl"));

    let elevation = ControlConfig::new("elevation", 5, 19, 4000, DEFAULT_COOL_DOWN_DURATION_MS);
    elevation.save_to_file(&controls_path.join("elevation.ctl"));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_invalid() {
        let config = ControlConfig::default();
        assert!(!config.is_valid());
        assert_eq!(config.cool_down_duration_ms, DEFAULT_COOL_DOWN_DURATION_MS);
    }

    #[test]
    fn validity_rules() {
        let valid = ControlConfig::new("back", 20, 16, 7000, 25);
        assert!(valid.is_valid());

        let mut config = valid.clone();
        config.name = String::new();
        assert!(!config.is_valid());

        let mut config = valid.clone();
        config.up_gpio_line = -1;
        assert!(!config.is_valid());

        let mut config = valid.clone();
        config.down_gpio_line = -1;
        assert!(!config.is_valid());

        // GPIO lines cannot be the same.
        let mut config = valid.clone();
        config.down_gpio_line = config.up_gpio_line;
        assert!(!config.is_valid());

        let mut config = valid.clone();
        config.moving_duration_ms = -1;
        assert!(!config.is_valid());

        let mut config = valid.clone();
        config.cool_down_duration_ms = -1;
        assert!(!config.is_valid());
    }

    #[test]
    fn parse_valid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("back.ctl");
        std::fs::write(
            &path,
            r#"{
                "name": "back",
                "upGPIOLine": 20,
                "downGPIOLine": 16,
                "movingDurationMS": 7000,
                "coolDownDurationMS": 30
            }"#,
        )
        .unwrap();

        let config = ControlConfig::parse_from_file(&path);
        assert_eq!(config, ControlConfig::new("back", 20, 16, 7000, 30));
        assert!(config.is_valid());
    }

    #[test]
    fn cool_down_duration_defaults_when_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("back.ctl");
        std::fs::write(
            &path,
            r#"{"name": "back", "upGPIOLine": 20, "downGPIOLine": 16, "movingDurationMS": 7000}"#,
        )
        .unwrap();

        let config = ControlConfig::parse_from_file(&path);
        assert!(config.is_valid());
        assert_eq!(config.cool_down_duration_ms, DEFAULT_COOL_DOWN_DURATION_MS);
    }

    #[test]
    fn malformed_fields_leave_sentinels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.ctl");
        std::fs::write(
            &path,
            r#"{
                "name": 7,
                "upGPIOLine": "twenty",
                "downGPIOLine": -3,
                "movingDurationMS": 7000,
                "coolDownDurationMS": "fast"
            }"#,
        )
        .unwrap();

        let config = ControlConfig::parse_from_file(&path);
        assert!(config.name.is_empty());
        assert_eq!(config.up_gpio_line, -1);
        assert_eq!(config.down_gpio_line, -1);
        assert_eq!(config.moving_duration_ms, 7000);
        assert_eq!(config.cool_down_duration_ms, DEFAULT_COOL_DOWN_DURATION_MS);
        assert!(!config.is_valid());
    }

    #[test]
    fn broken_json_yields_the_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.ctl");
        std::fs::write(&path, "{not json").unwrap();

        let config = ControlConfig::parse_from_file(&path);
        assert_eq!(config, ControlConfig::default());
    }

    #[test]
    fn save_and_reload_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("legs.ctl");

        let config = ControlConfig::new("legs", 13, 26, 4000, 25);
        assert!(config.save_to_file(&path));

        let reloaded = ControlConfig::parse_from_file(&path);
        assert_eq!(reloaded, config);
    }

    #[test]
    fn invalid_configs_are_not_saved() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("invalid.ctl");

        let config = ControlConfig::default();
        assert!(!config.save_to_file(&path));
        assert!(!path.exists());
    }

    #[test]
    fn bootstrap_creates_stock_controls() {
        let dir = tempfile::tempdir().unwrap();
        bootstrap_control_configs(dir.path());

        let back = ControlConfig::parse_from_file(&dir.path().join("controls/back.ctl"));
        assert!(back.is_valid());
        assert_eq!(back.name, "back");

        assert!(dir.path().join("controls/legs.ctl").exists());
        assert!(dir.path().join("controls/elevation.ctl").exists());

        // Bootstrapping again leaves existing files alone.
        bootstrap_control_configs(dir.path());
    }
}
