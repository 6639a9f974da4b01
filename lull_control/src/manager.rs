//! Owns the set of controls loaded from the config directory and
//! routes movement commands to them.

use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;

use lull_common::{Clock, MoveDirection, ReportManager};
use tracing::{info, warn};

use crate::config::ControlConfig;
use crate::control::{Control, ControlState};
use crate::gpio::LineRegistry;

/// Manages the set of controls.
pub struct ControlManager {
    clock: Rc<dyn Clock>,
    controls: HashMap<String, Control>,
}

impl ControlManager {
    pub fn new(clock: Rc<dyn Clock>) -> Self {
        Self {
            clock,
            controls: HashMap::new(),
        }
    }

    /// Load every `.ctl` record under `{base_dir}/controls` and bring
    /// the resulting controls up on the registry.
    ///
    /// Invalid records are skipped, as is any record whose name is
    /// already taken by an earlier one. A control whose GPIO lines
    /// cannot be acquired is dropped rather than kept half-alive.
    pub fn initialize(&mut self, base_dir: &Path, registry: &mut LineRegistry) {
        self.uninitialize(registry);

        let controls_path = base_dir.join("controls");

        let entries = match std::fs::read_dir(&controls_path) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(
                    "Failed to read control config directory '{}': {err}.",
                    controls_path.display()
                );
                return;
            }
        };

        let mut paths: Vec<_> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "ctl"))
            .collect();

        // Load order decides which record wins a name collision.
        paths.sort();

        for path in paths {
            let config = ControlConfig::parse_from_file(&path);

            if !config.is_valid() {
                warn!(
                    "Skipping invalid control config file '{}'.",
                    path.display()
                );
                continue;
            }

            if self.controls.contains_key(&config.name) {
                warn!(
                    control = %config.name,
                    "Skipping duplicate control from '{}'.",
                    path.display()
                );
                continue;
            }

            let mut control = Control::new(&config.name, Rc::clone(&self.clock));

            let initialized = control.initialize(
                registry,
                config.up_gpio_line as u32,
                config.down_gpio_line as u32,
                config.moving_duration_ms as u64,
                config.cool_down_duration_ms as u64,
            );

            if !initialized {
                warn!(
                    control = %config.name,
                    "Dropping control that failed to initialize."
                );
                continue;
            }

            info!(control = %config.name, "Loaded control.");
            self.controls.insert(config.name, control);
        }

        info!("Loaded {} controls.", self.controls.len());
    }

    /// Tear down every control, releasing its GPIO lines.
    pub fn uninitialize(&mut self, registry: &mut LineRegistry) {
        for control in self.controls.values_mut() {
            control.uninitialize(registry);
        }

        self.controls.clear();
    }

    /// Apply a movement command to the named control.
    ///
    /// The request is journaled before the state change so the report
    /// reflects what was asked for, even if the control is mid
    /// cool down and the request goes nowhere.
    pub fn process_command(
        &mut self,
        control_name: &str,
        direction: MoveDirection,
        source: &str,
        reports: &mut ReportManager,
    ) -> bool {
        let Some(control) = self.controls.get_mut(control_name) else {
            warn!(control = control_name, "No such control.");
            return false;
        };

        reports.add_control_event(control_name, direction.as_str(), source);

        let desired_state = match direction {
            MoveDirection::Up => ControlState::MoveUp,
            MoveDirection::Down => ControlState::MoveDown,
        };

        control.set_desired_state(desired_state);
        true
    }

    /// Run one processing tick on every control.
    pub fn process_controls(
        &mut self,
        registry: &mut LineRegistry,
        notifications: &mut Vec<String>,
    ) {
        for control in self.controls.values_mut() {
            control.process(registry, notifications);
        }
    }

    /// The current state of every control, keyed by name.
    pub fn get_states(&self) -> HashMap<String, ControlState> {
        self.controls
            .iter()
            .map(|(name, control)| (name.clone(), control.state()))
            .collect()
    }

    pub fn has_control(&self, control_name: &str) -> bool {
        self.controls.contains_key(control_name)
    }

    pub fn num_controls(&self) -> usize {
        self.controls.len()
    }
}
