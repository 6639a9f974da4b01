//! Daemon-wide settings, persisted as `settings.cfg` in the base
//! directory.
//!
//! Parsing is field-tolerant: a missing or invalid field is logged and
//! replaced with its default, and the file is rewritten so it converges
//! to a fully valid state. An invalid file is first backed up for
//! investigation.

use std::path::Path;

use chrono_tz::Tz;
use serde_json::{Value, json};
use tracing::{error, info, warn};

use crate::error::{LullError, LullResult};

/// Default IANA zone used for report day boundaries.
pub const DEFAULT_TIME_ZONE_NAME: &str = "America/Chicago";

/// Default delay before the main loop starts, in seconds.
pub const DEFAULT_STARTUP_DELAY_SEC: u64 = 4;

/// Overall daemon settings, not specific to any one subsystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    time_zone_name: String,
    startup_delay_sec: u64,
    was_any_missing_on_load: bool,
    was_any_invalid_on_load: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            time_zone_name: DEFAULT_TIME_ZONE_NAME.to_owned(),
            startup_delay_sec: DEFAULT_STARTUP_DELAY_SEC,
            was_any_missing_on_load: false,
            was_any_invalid_on_load: false,
        }
    }
}

impl Settings {
    /// The configured IANA time zone name.
    pub fn time_zone_name(&self) -> &str {
        &self.time_zone_name
    }

    /// Set the time zone name. Fails when the name is not a known zone.
    pub fn set_time_zone_name(&mut self, time_zone_name: &str) -> LullResult<()> {
        if time_zone_name.parse::<Tz>().is_err() {
            return Err(LullError::UnknownTimeZone {
                name: time_zone_name.to_owned(),
            });
        }

        self.time_zone_name = time_zone_name.to_owned();
        Ok(())
    }

    /// The startup delay in seconds.
    pub fn startup_delay_sec(&self) -> u64 {
        self.startup_delay_sec
    }

    /// Set the startup delay in seconds.
    pub fn set_startup_delay_sec(&mut self, startup_delay_sec: u64) {
        self.startup_delay_sec = startup_delay_sec;
    }

    /// Whether any value was missing when the settings were loaded.
    pub fn was_any_missing_on_load(&self) -> bool {
        self.was_any_missing_on_load
    }

    /// Whether any value was invalid when the settings were loaded.
    pub fn was_any_invalid_on_load(&self) -> bool {
        self.was_any_invalid_on_load
    }

    /// Check whether these are valid settings.
    pub fn is_valid(&self) -> bool {
        self.time_zone_name.parse::<Tz>().is_ok()
    }

    /// Parse settings from a file, defaulting any missing or invalid
    /// field and recording that it happened.
    pub fn parse_from_file(path: &Path) -> Self {
        let mut settings = Self::default();

        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(_) => {
                error!("Could not find settings file '{}'.", path.display());
                return settings;
            }
        };

        let settings_json: Value = match serde_json::from_str(&contents) {
            Ok(value) => value,
            Err(_) => {
                error!("JSON error decoding settings file '{}'.", path.display());
                return settings;
            }
        };

        match settings_json.get("timeZoneName") {
            None => {
                settings.was_any_missing_on_load = true;
                warn!(
                    "Missing 'timeZoneName' key in settings file '{}'.",
                    path.display()
                );
            }
            Some(value) => {
                let valid = value
                    .as_str()
                    .is_some_and(|name| settings.set_time_zone_name(name).is_ok());

                if !valid {
                    settings.was_any_invalid_on_load = true;
                    warn!(
                        "Invalid time zone name '{value}' in settings file '{}'.",
                        path.display()
                    );
                }
            }
        }

        match settings_json.get("startupDelaySec") {
            None => {
                settings.was_any_missing_on_load = true;
                warn!(
                    "Missing 'startupDelaySec' key in settings file '{}'.",
                    path.display()
                );
            }
            Some(value) => match value.as_u64() {
                Some(delay_sec) => settings.startup_delay_sec = delay_sec,
                None => {
                    settings.was_any_invalid_on_load = true;
                    warn!(
                        "Invalid startup delay '{value}' in settings file '{}'.",
                        path.display()
                    );
                }
            },
        }

        settings
    }

    /// Save settings to a file. Invalid settings are never persisted.
    pub fn save_to_file(&self, path: &Path) -> bool {
        if !self.is_valid() {
            warn!("Cannot save invalid settings to '{}'.", path.display());
            return false;
        }

        let settings_json = json!({
            "timeZoneName": self.time_zone_name,
            "startupDelaySec": self.startup_delay_sec,
        });

        let Ok(contents) = serde_json::to_string_pretty(&settings_json) else {
            return false;
        };

        if let Err(err) = std::fs::write(path, contents) {
            error!("Failed to open '{}' to save settings: {err}.", path.display());
            return false;
        }

        true
    }
}

/// Load settings from the base directory, creating the file with
/// defaults when missing and repairing it when any value was missing or
/// invalid. Invalid files are backed up first.
pub fn load_or_create_settings(base_dir: &Path) -> Settings {
    let settings_path = base_dir.join("settings.cfg");

    if !settings_path.exists() {
        info!(
            "Creating missing settings file '{}'.",
            settings_path.display()
        );

        let new_settings = Settings::default();
        new_settings.save_to_file(&settings_path);
        return new_settings;
    }

    let loaded = Settings::parse_from_file(&settings_path);

    // Keep a copy of bad files for investigation before overwriting.
    if loaded.was_any_invalid_on_load() {
        let backup_path = settings_path.with_extension("cfg.bak");

        if std::fs::copy(&settings_path, &backup_path).is_ok() {
            warn!(
                "Settings file '{}' had an invalid value. A backup copy '{}' was made for \
                 investigation.",
                settings_path.display(),
                backup_path.display()
            );
        }
    }

    if loaded.was_any_missing_on_load() {
        info!(
            "Settings file '{}' had a missing value but it was filled with the default.",
            settings_path.display()
        );
    }

    loaded.save_to_file(&settings_path);

    loaded
}
