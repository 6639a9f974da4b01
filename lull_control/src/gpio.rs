//! Exclusive ownership of GPIO output lines.
//!
//! The registry is the single arena for line ownership: controls
//! contend for line numbers here and never hold hardware handles
//! themselves. Two backends exist — `Live` drives the GPIO character
//! device through libgpiod (feature `hardware`), `Simulation` keeps the
//! same bookkeeping with no hardware effects, which is what tests and
//! off-device runs use.
//!
//! NOTE - The physical signal polarity is inverted relative to the
//! logical names: setting a line logically active drives it electrically
//! inactive and vice versa. This matches the actuator relay wiring and
//! must not be "fixed".

use std::collections::HashMap;

use tracing::{info, warn};

#[cfg(feature = "hardware")]
const CHIP_PATH: &str = "/dev/gpiochip0";

#[cfg(feature = "hardware")]
const CONSUMER: &str = "lull";

/// Which backend a registry drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// The real GPIO character device.
    Live,
    /// Bookkeeping only; no hardware is touched.
    Simulation,
}

/// Acquisition handle for one output line.
enum LineHandle {
    /// Simulation mode: ownership marker only.
    Simulated,
    /// Live request on the chip.
    #[cfg(feature = "hardware")]
    Live(gpiod::Lines<gpiod::Output>),
}

/// Owns acquisition, release and signal level of numbered output lines.
pub struct LineRegistry {
    backend: Backend,
    #[cfg(feature = "hardware")]
    chip: Option<gpiod::Chip>,
    line_requests: HashMap<u32, LineHandle>,
    initialized: bool,
}

impl LineRegistry {
    /// Create a registry for the given backend. No resources are
    /// touched until `initialize`.
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            #[cfg(feature = "hardware")]
            chip: None,
            line_requests: HashMap::new(),
            initialized: false,
        }
    }

    /// Set up the registry for use.
    ///
    /// In live mode this opens the GPIO chip; failure leaves the
    /// registry uninitialized and every later line operation failing.
    /// Simulation mode always succeeds.
    pub fn initialize(&mut self) {
        if self.backend == Backend::Simulation {
            self.initialized = true;
            return;
        }

        #[cfg(feature = "hardware")]
        {
            match gpiod::Chip::new(CHIP_PATH) {
                Ok(chip) => {
                    self.chip = Some(chip);
                    self.initialized = true;
                }
                Err(err) => {
                    warn!("Failed to open GPIO chip {CHIP_PATH}: {err}.");
                }
            }
        }

        #[cfg(not(feature = "hardware"))]
        {
            warn!("Live GPIO requested but this build has no hardware support.");
        }
    }

    /// Release every acquired line and close the chip.
    pub fn uninitialize(&mut self) {
        for line in self.acquired_lines() {
            self.release_output_line(line);
        }

        #[cfg(feature = "hardware")]
        {
            self.chip = None;
        }

        self.initialized = false;
    }

    /// The currently acquired line numbers.
    pub fn acquired_lines(&self) -> Vec<u32> {
        self.line_requests.keys().copied().collect()
    }

    /// How many lines are currently acquired.
    pub fn num_acquired(&self) -> usize {
        self.line_requests.len()
    }

    /// Acquire a line for output and drive it to its logically inactive
    /// level.
    ///
    /// Fails when the registry is uninitialized, when the chip is
    /// required but absent, or when the line is already acquired; in
    /// that case nothing changes.
    pub fn acquire_output_line(&mut self, line: u32) -> bool {
        if !self.initialized {
            return false;
        }

        #[cfg(feature = "hardware")]
        if self.backend == Backend::Live && self.chip.is_none() {
            warn!("Tried to acquire output line {line}, but there is no chip.");
            return false;
        }

        if self.line_requests.contains_key(&line) {
            info!(
                "Ignoring request to acquire output line {line} because it has already been \
                 acquired."
            );
            return false;
        }

        // When not in live mode, pretend that the line was requested.
        if self.backend == Backend::Simulation {
            self.line_requests.insert(line, LineHandle::Simulated);
            return true;
        }

        #[cfg(feature = "hardware")]
        {
            let Some(chip) = self.chip.as_ref() else {
                return false;
            };

            // Electrically active is logically inactive (inverted wiring).
            let options = gpiod::Options::output([line])
                .values([true])
                .consumer(CONSUMER);

            match chip.request_lines(options) {
                Ok(request) => {
                    self.line_requests.insert(line, LineHandle::Live(request));
                    true
                }
                Err(err) => {
                    warn!("Failed to acquire output line {line}: {err}.");
                    false
                }
            }
        }

        #[cfg(not(feature = "hardware"))]
        {
            false
        }
    }

    /// Release a line that was acquired for output.
    ///
    /// Fails when the line is not acquired. The line is always removed
    /// from the ownership map; in live mode the request is dropped and
    /// the line is best-effort reconfigured as an input.
    pub fn release_output_line(&mut self, line: u32) -> bool {
        let Some(handle) = self.line_requests.remove(&line) else {
            info!("Tried to release output line {line}, but it is not acquired.");
            return false;
        };

        match handle {
            LineHandle::Simulated => {}
            #[cfg(feature = "hardware")]
            LineHandle::Live(request) => {
                drop(request);

                // Set the line back to input. Best effort only.
                if let Some(chip) = self.chip.as_ref() {
                    let options = gpiod::Options::input([line]).consumer(CONSUMER);

                    if let Err(err) = chip.request_lines(options) {
                        warn!("Failed to reconfigure line {line} as input: {err}.");
                    }
                }
            }
        }

        true
    }

    /// Set a line to its logically active level.
    pub fn set_line_active(&mut self, line: u32) -> bool {
        // Inverted wiring: logically active drives the line electrically
        // inactive.
        self.set_line_value(line, false)
    }

    /// Set a line to its logically inactive level.
    pub fn set_line_inactive(&mut self, line: u32) -> bool {
        self.set_line_value(line, true)
    }

    fn set_line_value(&mut self, line: u32, electrical_level: bool) -> bool {
        let Some(handle) = self.line_requests.get(&line) else {
            info!("Tried to set output line {line} value, but it is not acquired.");
            return false;
        };

        match handle {
            LineHandle::Simulated => true,
            #[cfg(feature = "hardware")]
            LineHandle::Live(request) => match request.set_values([electrical_level]) {
                Ok(()) => true,
                Err(err) => {
                    warn!("Failed to set output line {line} value: {err}.");
                    false
                }
            },
        }
    }
}
