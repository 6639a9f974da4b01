//! The daemon's state and main polling loop.

use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use lull_common::{
    Clock, Command, LullError, LullResult, ReportManager, Settings, SystemClock, ZonedTimeSource,
    report::bootstrap_reports, settings::load_or_create_settings,
};
use lull_control::{Backend, ControlManager, LineRegistry, config::bootstrap_control_configs};
use lull_routine::{RoutineManager, bootstrap_routines};
use tracing::info;

use crate::mqtt::MqttClient;

/// The poll interval of the main loop.
const TICK_INTERVAL: Duration = Duration::from_millis(10);

/// The state and logic to run the daemon.
pub struct App {
    base_dir: PathBuf,
    settings: Settings,
    registry: LineRegistry,
    controls: ControlManager,
    routines: RoutineManager,
    reports: ReportManager,
    running: Arc<AtomicBool>,
}

impl App {
    /// Bring up everything except the broker connection: the base
    /// directory, settings, GPIO registry, controls, routines and the
    /// report journal.
    pub fn new(base_dir: &Path, simulate: bool) -> LullResult<Self> {
        if !base_dir.exists() {
            std::fs::create_dir_all(base_dir).map_err(|source| LullError::BaseDir {
                path: base_dir.display().to_string(),
                source,
            })?;
        }

        let settings = load_or_create_settings(base_dir);

        bootstrap_control_configs(base_dir);
        bootstrap_routines(base_dir);
        bootstrap_reports(base_dir);

        let time_source = Rc::new(ZonedTimeSource::new(settings.time_zone_name())?);
        let clock: Rc<dyn Clock> = Rc::new(SystemClock::new());

        let backend = if simulate {
            info!("Simulation mode enabled");
            Backend::Simulation
        } else {
            Backend::Live
        };

        let mut registry = LineRegistry::new(backend);
        registry.initialize();

        let mut controls = ControlManager::new(Rc::clone(&clock));
        controls.initialize(base_dir, &mut registry);

        let mut routines = RoutineManager::new(Rc::clone(&clock));
        routines.initialize(base_dir);

        let reports = ReportManager::new(time_source, base_dir);

        Ok(Self {
            base_dir: base_dir.to_owned(),
            settings,
            registry,
            controls,
            routines,
            reports,
            running: Arc::new(AtomicBool::new(true)),
        })
    }

    /// Run the daemon until a shutdown signal arrives.
    pub fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        info!("Running from '{}'.", self.base_dir.display());

        let running = Arc::clone(&self.running);
        ctrlc::set_handler(move || {
            info!("Received shutdown signal");
            running.store(false, Ordering::SeqCst);
        })?;

        // Give the voice services a head start after boot.
        let startup_delay_sec = self.settings.startup_delay_sec();

        if startup_delay_sec > 0 {
            info!("Waiting {startup_delay_sec}s before connecting...");
            thread::sleep(Duration::from_secs(startup_delay_sec));
        }

        let mut mqtt = MqttClient::connect()?;
        mqtt.play_notification("Lull initialized.".to_owned());

        while self.running.load(Ordering::SeqCst) {
            let mut commands = Vec::new();

            while let Some(command) = mqtt.pop_command() {
                commands.push(command);
            }

            let notifications = self.step(commands);

            for notification in notifications {
                mqtt.play_notification(notification);
            }

            mqtt.process();

            thread::sleep(TICK_INTERVAL);
        }

        mqtt.stop();
        self.shutdown();
        Ok(())
    }

    /// Run one tick over the given pending commands, returning the
    /// notifications to speak.
    ///
    /// Routines run first so the control commands they emit are applied
    /// on the same tick they fire.
    fn step(&mut self, mut commands: Vec<Command>) -> Vec<String> {
        let mut notifications = Vec::new();

        self.routines.process_routines(&mut commands, &mut notifications);

        for command in commands {
            match command {
                Command::Status => {
                    self.reports.add_status_event();
                    notifications.push("Lull is running.".to_owned());
                }
                Command::MoveControl {
                    control_name,
                    direction,
                    source,
                } => {
                    self.controls.process_command(
                        &control_name,
                        direction,
                        &source,
                        &mut self.reports,
                    );
                }
                Command::Routine {
                    routine_name,
                    action,
                } => {
                    let notification =
                        self.routines
                            .process_command(&routine_name, action, &mut self.reports);

                    if !notification.is_empty() {
                        notifications.push(notification);
                    }
                }
            }
        }

        self.controls
            .process_controls(&mut self.registry, &mut notifications);
        self.reports.process();

        notifications
    }

    fn shutdown(&mut self) {
        self.routines.uninitialize();
        self.controls.uninitialize(&mut self.registry);
        self.registry.uninitialize();
    }
}
