//! Owns the loaded routine descriptions and the routines currently
//! running.

use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;

use lull_common::{Clock, Command, ReportManager, RoutineAction};
use tracing::{info, warn};

use crate::desc::RoutineDesc;
use crate::routine::Routine;

/// Manages routine descriptions and running routines.
pub struct RoutineManager {
    clock: Rc<dyn Clock>,
    descs: HashMap<String, RoutineDesc>,
    routines: HashMap<String, Routine>,
}

impl RoutineManager {
    pub fn new(clock: Rc<dyn Clock>) -> Self {
        Self {
            clock,
            descs: HashMap::new(),
            routines: HashMap::new(),
        }
    }

    pub fn num_loaded(&self) -> usize {
        self.descs.len()
    }

    pub fn num_running(&self) -> usize {
        self.routines.len()
    }

    pub fn running_names(&self) -> Vec<String> {
        self.routines.keys().cloned().collect()
    }

    /// Load every `.rtn` description under `{base_dir}/routines`.
    ///
    /// Invalid descriptions are skipped, as is any description whose
    /// name is already taken by an earlier one.
    pub fn initialize(&mut self, base_dir: &Path) {
        self.uninitialize();

        let routines_path = base_dir.join("routines");
        info!("Loading routines from '{}'.", routines_path.display());

        let entries = match std::fs::read_dir(&routines_path) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(
                    "Failed to read routines directory '{}': {err}.",
                    routines_path.display()
                );
                return;
            }
        };

        let mut paths: Vec<_> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "rtn"))
            .collect();

        // Load order decides which description wins a name collision.
        paths.sort();

        for path in paths {
            info!("Loading routine from '{}'.", path.display());

            let desc = RoutineDesc::parse_from_file(&path);

            if !desc.is_valid() {
                continue;
            }

            if self.descs.contains_key(&desc.name) {
                warn!(
                    routine = %desc.name,
                    "A routine with this name already exists. Ignoring new description."
                );
                continue;
            }

            self.descs.insert(desc.name.clone(), desc);
        }
    }

    /// Drop every description and stop every running routine.
    pub fn uninitialize(&mut self) {
        self.descs.clear();
        self.routines.clear();
    }

    /// Apply a start or stop request to the named routine.
    ///
    /// The request is journaled before it is acted on, so the report
    /// reflects what was asked for even when the request goes nowhere.
    /// Returns a notification string describing the outcome.
    pub fn process_command(
        &mut self,
        routine_name: &str,
        action: RoutineAction,
        reports: &mut ReportManager,
    ) -> String {
        reports.add_routine_event(routine_name, action.as_str());

        match action {
            RoutineAction::Start => self.start_routine(routine_name),
            RoutineAction::Stop => self.stop_routine(routine_name),
        }
    }

    /// Run one tick on every running routine, collecting the control
    /// commands they emit and announcing the ones that finished.
    pub fn process_routines(
        &mut self,
        command_list: &mut Vec<Command>,
        notification_list: &mut Vec<String>,
    ) {
        let mut finished_names = Vec::new();

        for (name, routine) in &mut self.routines {
            routine.process(command_list);

            if routine.is_finished() {
                finished_names.push(name.clone());
            }
        }

        for name in finished_names {
            self.routines.remove(&name);
            notification_list.push(format!("The {name} routine finished."));
        }
    }

    fn start_routine(&mut self, routine_name: &str) -> String {
        if self.routines.contains_key(routine_name) {
            return format!("The {routine_name} routine is already running.");
        }

        let Some(desc) = self.descs.get(routine_name) else {
            return format!("There is no {routine_name} routine.");
        };

        let routine = Routine::new(desc.clone(), Rc::clone(&self.clock));
        self.routines.insert(routine_name.to_owned(), routine);
        format!("Started the {routine_name} routine.")
    }

    fn stop_routine(&mut self, routine_name: &str) -> String {
        if self.routines.remove(routine_name).is_none() {
            return format!("The {routine_name} routine is not running.");
        }

        format!("Stopped the {routine_name} routine.")
    }
}
