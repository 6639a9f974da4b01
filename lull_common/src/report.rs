//! Per-day activity journal.
//!
//! Every control movement, routine action and status query is recorded
//! as a JSON line in a per-day report file. A report day starts at
//! 17:00 local time so one night of sleep lands in one file: an event
//! at 16:59 belongs to the previous day's report. Events are queued as
//! they happen and flushed by `process()` once per tick, fire and
//! forget from the callers' perspective.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use chrono::{DateTime, TimeZone, Timelike};
use chrono_tz::Tz;
use serde_json::{Value, json};
use tracing::{error, info, warn};

use crate::time_source::TimeSource;

/// Version stamp written into every report header.
pub const REPORT_VERSION: u32 = 4;

/// Hour of the local day at which a report day begins.
const REPORT_START_HOUR: u32 = 17;

/// An event waiting to be written to a report file.
#[derive(Debug, Clone)]
struct ReportEvent {
    when: DateTime<Tz>,
    info: Value,
}

/// Records events into per-day report files under `{base_dir}/reports/`.
pub struct ReportManager {
    time_source: Rc<dyn TimeSource>,
    reports_dir: PathBuf,
    pending_events: VecDeque<ReportEvent>,
}

impl ReportManager {
    /// Create a manager journaling below the given base directory.
    pub fn new(time_source: Rc<dyn TimeSource>, base_dir: &Path) -> Self {
        Self {
            time_source,
            reports_dir: base_dir.join("reports"),
            pending_events: VecDeque::new(),
        }
    }

    /// Flush pending events and make sure today's report file exists.
    pub fn process(&mut self) {
        let curr_time = self.time_source.now();

        // Even with no events pending we want empty report files to
        // exist for quiet days.
        self.maybe_create_report_file(&curr_time);

        while let Some(event) = self.pending_events.pop_front() {
            self.write_event(&event);
        }
    }

    /// Queue a control event at the current time.
    pub fn add_control_event(&mut self, control: &str, action: &str, source: &str) {
        let info = json!({
            "type": "control",
            "control": control,
            "action": action,
            "source": source,
        });
        self.add_event(info);
    }

    /// Queue a routine event at the current time.
    pub fn add_routine_event(&mut self, routine: &str, action: &str) {
        let info = json!({
            "type": "routine",
            "routine": routine,
            "action": action,
        });
        self.add_event(info);
    }

    /// Queue a status event at the current time.
    pub fn add_status_event(&mut self) {
        self.add_event(json!({"type": "status"}));
    }

    fn add_event(&mut self, info: Value) {
        let event = ReportEvent {
            when: self.time_source.now(),
            info,
        };
        self.pending_events.push_back(event);
    }

    /// The start of the report day the given moment belongs to.
    fn start_time_for(&self, time: &DateTime<Tz>) -> DateTime<Tz> {
        let mut date = time.date_naive();

        if time.hour() < REPORT_START_HOUR {
            if let Some(previous) = date.pred_opt() {
                date = previous;
            }
        }

        date.and_hms_opt(REPORT_START_HOUR, 0, 0)
            .and_then(|naive| time.timezone().from_local_datetime(&naive).earliest())
            .unwrap_or(*time)
    }

    /// Path of the report file the given moment belongs to.
    fn report_path_for(&self, time: &DateTime<Tz>) -> PathBuf {
        let start_time = self.start_time_for(time);
        let name = format!("lull{}.rpt", start_time.format("%Y-%m-%d"));
        self.reports_dir.join(name)
    }

    /// Create the report file for the given moment, with its header
    /// line, unless it already exists.
    fn maybe_create_report_file(&self, time: &DateTime<Tz>) {
        let report_path = self.report_path_for(time);

        if report_path.exists() {
            return;
        }

        let start_time = self.start_time_for(time);
        let header = json!({
            "version": REPORT_VERSION,
            "start": start_time.to_rfc3339(),
        });

        let header_line = format!("{header}\n");

        if let Err(err) = std::fs::write(&report_path, header_line) {
            warn!(
                "Failed to create report file '{}': {err}.",
                report_path.display()
            );
            return;
        }

        info!("Created report file '{}'.", report_path.display());
    }

    fn write_event(&self, event: &ReportEvent) {
        self.maybe_create_report_file(&event.when);

        let report_path = self.report_path_for(&event.when);

        if !report_path.exists() {
            error!(
                "Failed to add event to '{}' - file doesn't exist.",
                report_path.display()
            );
            return;
        }

        let event_json = json!({
            "when": event.when.to_rfc3339(),
            "info": event.info,
        });
        let event_line = format!("{event_json}\n");

        let appended = std::fs::OpenOptions::new()
            .append(true)
            .open(&report_path)
            .and_then(|mut file| {
                use std::io::Write;
                file.write_all(event_line.as_bytes())
            });

        if let Err(err) = appended {
            error!(
                "Failed to append event to '{}': {err}.",
                report_path.display()
            );
        }
    }
}

/// Create the reports directory below the base directory on first run.
pub fn bootstrap_reports(base_dir: &Path) {
    let reports_path = base_dir.join("reports");

    if reports_path.exists() {
        return;
    }

    info!(
        "Creating missing report directory '{}'.",
        reports_path.display()
    );

    if let Err(err) = std::fs::create_dir_all(&reports_path) {
        warn!(
            "Failed to create report directory '{}': {err}.",
            reports_path.display()
        );
    }
}
