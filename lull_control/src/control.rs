//! The per-actuator control state machine.
//!
//! A control owns two GPIO lines (up and down) for its lifetime and
//! moves through `Idle → MoveUp/MoveDown → CoolDown → Idle`. Movement
//! and cool-down both have fixed durations; stopping always passes
//! through cool-down, and cool-down cannot be interrupted. Desired
//! state is recorded immediately but only takes effect on the next
//! `process` tick.

use std::rc::Rc;

use tracing::{error, info};

use lull_common::Clock;

use crate::gpio::LineRegistry;

/// The states a control can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlState {
    /// Not moving; ready for a new command.
    Idle,
    /// Driving the up line.
    MoveUp,
    /// Driving the down line.
    MoveDown,
    /// Mandatory inert period after any movement.
    CoolDown,
}

impl ControlState {
    /// Human readable phrase describing the state.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::MoveUp => "move up",
            Self::MoveDown => "move down",
            Self::CoolDown => "cool down",
        }
    }
}

/// The state and logic for a control that manages a part of the bed.
pub struct Control {
    name: String,
    clock: Rc<dyn Clock>,
    state: ControlState,
    desired_state: ControlState,
    state_start_ms: u64,
    up_line: u32,
    down_line: u32,
    moving_duration_ms: u64,
    cool_down_duration_ms: u64,
    initialized: bool,
}

impl Control {
    /// Create an idle, uninitialized control. No resources are acquired
    /// until `initialize`.
    pub fn new(name: &str, clock: Rc<dyn Clock>) -> Self {
        Self {
            name: name.to_owned(),
            clock,
            state: ControlState::Idle,
            desired_state: ControlState::Idle,
            state_start_ms: 0,
            up_line: 0,
            down_line: 0,
            moving_duration_ms: 0,
            cool_down_duration_ms: 0,
            initialized: false,
        }
    }

    /// The control's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The current state.
    pub fn state(&self) -> ControlState {
        self.state
    }

    /// Whether the control has been initialized.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Initialize the control for use, acquiring both GPIO lines.
    ///
    /// Fails without side effects when already initialized, when the
    /// lines are not distinct, or when the moving duration is zero.
    /// When the down-line acquisition fails the up line is released
    /// again, so a control is never left half-initialized.
    pub fn initialize(
        &mut self,
        registry: &mut LineRegistry,
        up_line: u32,
        down_line: u32,
        moving_duration_ms: u64,
        cool_down_duration_ms: u64,
    ) -> bool {
        if self.initialized {
            error!(
                control = %self.name,
                "Tried to initialize control, but it's already initialized."
            );
            return false;
        }

        if up_line == down_line {
            error!(
                control = %self.name,
                "Control must use different GPIO lines for moving up and down."
            );
            return false;
        }

        if moving_duration_ms < 1 {
            error!(
                control = %self.name,
                "Invalid moving duration for control: {moving_duration_ms} ms."
            );
            return false;
        }

        if !registry.acquire_output_line(up_line) {
            error!(control = %self.name, "Failed to acquire up GPIO line.");
            return false;
        }

        if !registry.acquire_output_line(down_line) {
            error!(control = %self.name, "Failed to acquire down GPIO line.");
            registry.release_output_line(up_line);
            return false;
        }

        self.up_line = up_line;
        self.down_line = down_line;
        self.moving_duration_ms = moving_duration_ms;
        self.cool_down_duration_ms = cool_down_duration_ms;

        // Should be redundant, but force both lines inactive just in case.
        registry.set_line_inactive(self.up_line);
        registry.set_line_inactive(self.down_line);

        self.initialized = true;

        info!(
            control = %self.name,
            "Initialized control with GPIO lines [up {up_line}, down {down_line}] and with \
             moving duration {moving_duration_ms} ms and cool down duration \
             {cool_down_duration_ms} ms."
        );

        true
    }

    /// Uninitialize the control, releasing both GPIO lines.
    ///
    /// The control is always marked uninitialized; the result is false
    /// when either release failed.
    pub fn uninitialize(&mut self, registry: &mut LineRegistry) -> bool {
        if !self.initialized {
            error!(
                control = %self.name,
                "Tried to uninitialize control, but it's already uninitialized."
            );
            return false;
        }

        let mut release_failed = false;

        if !registry.release_output_line(self.up_line) {
            error!(control = %self.name, "Failed to release up GPIO line.");
            release_failed = true;
        }

        if !registry.release_output_line(self.down_line) {
            error!(control = %self.name, "Failed to release down GPIO line.");
            release_failed = true;
        }

        self.initialized = false;

        !release_failed
    }

    /// Record the state the control should move toward on the next
    /// `process` tick.
    ///
    /// Cool-down is never an externally requested target; asking for it
    /// is ignored.
    ///
    /// # Panics
    ///
    /// Panics when the control is not initialized — that is a caller
    /// invariant violation, not a runtime condition.
    pub fn set_desired_state(&mut self, state: ControlState) {
        assert!(
            self.initialized,
            "attempted to set state on an uninitialized control"
        );

        if state == ControlState::CoolDown {
            return;
        }

        self.desired_state = state;

        info!(
            control = %self.name,
            "Set desired state to '{}'.",
            state.as_str()
        );
    }

    /// Advance the state machine one tick, appending any notifications
    /// produced by transitions.
    ///
    /// # Panics
    ///
    /// Panics when the control is not initialized.
    pub fn process(&mut self, registry: &mut LineRegistry, notifications: &mut Vec<String>) {
        assert!(
            self.initialized,
            "attempted to process an uninitialized control"
        );

        match self.state {
            ControlState::Idle => self.process_idle_state(registry, notifications),
            ControlState::MoveUp | ControlState::MoveDown => {
                self.process_moving_states(registry, notifications);
            }
            ControlState::CoolDown => self.process_cool_down_state(registry, notifications),
        }
    }

    /// Trigger a state transition, driving the lines and emitting the
    /// transition's notification.
    fn set_state(
        &mut self,
        registry: &mut LineRegistry,
        notifications: &mut Vec<String>,
        state: ControlState,
    ) {
        info!(
            control = %self.name,
            "State transition from '{}' to '{}'.",
            self.state.as_str(),
            state.as_str()
        );

        match state {
            ControlState::MoveUp => {
                registry.set_line_inactive(self.down_line);
                registry.set_line_active(self.up_line);
                notifications.push(format!("Raising the {}.", self.name));
            }
            ControlState::MoveDown => {
                registry.set_line_inactive(self.up_line);
                registry.set_line_active(self.down_line);
                notifications.push(format!("Lowering the {}.", self.name));
            }
            ControlState::CoolDown => {
                registry.set_line_inactive(self.up_line);
                registry.set_line_inactive(self.down_line);
                notifications.push(format!("{} stopped.", self.name));
            }
            ControlState::Idle => {
                registry.set_line_inactive(self.up_line);
                registry.set_line_inactive(self.down_line);
            }
        }

        self.state = state;
        self.state_start_ms = self.clock.now_ms();
    }

    fn process_idle_state(&mut self, registry: &mut LineRegistry, notifications: &mut Vec<String>) {
        if self.desired_state == ControlState::Idle {
            return;
        }

        // Only transitions to moving up or down are allowed.
        if self.desired_state != ControlState::MoveUp
            && self.desired_state != ControlState::MoveDown
        {
            self.desired_state = ControlState::Idle;
            return;
        }

        self.set_state(registry, notifications, self.desired_state);
    }

    fn process_moving_states(
        &mut self,
        registry: &mut LineRegistry,
        notifications: &mut Vec<String>,
    ) {
        // Allow immediate transitions to idle or the other moving state.
        if self.desired_state != self.state {
            match self.desired_state {
                ControlState::MoveUp | ControlState::MoveDown => {
                    self.set_state(registry, notifications, self.desired_state);
                    return;
                }
                ControlState::Idle => {
                    // Stopping always passes through cool-down.
                    self.set_state(registry, notifications, ControlState::CoolDown);
                    return;
                }
                ControlState::CoolDown => {}
            }
        }

        // Otherwise automatically transition when the time is up.
        let elapsed_ms = self.clock.elapsed_ms(self.state_start_ms);

        if elapsed_ms < self.moving_duration_ms {
            return;
        }

        self.desired_state = ControlState::Idle;
        self.set_state(registry, notifications, ControlState::CoolDown);
    }

    fn process_cool_down_state(
        &mut self,
        registry: &mut LineRegistry,
        notifications: &mut Vec<String>,
    ) {
        // Cool-down cannot be interrupted; only the timer ends it.
        let elapsed_ms = self.clock.elapsed_ms(self.state_start_ms);

        if elapsed_ms < self.cool_down_duration_ms {
            return;
        }

        self.desired_state = ControlState::Idle;
        self.set_state(registry, notifications, ControlState::Idle);
    }
}
