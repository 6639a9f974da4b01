//! End-to-end flow over the control stack: stock configs loaded off
//! disk, commands driving the state machines, movements landing in the
//! report journal.

use std::path::Path;
use std::rc::Rc;

use chrono::TimeZone;
use chrono_tz::Tz;
use lull_common::{Clock, FakeClock, FakeTimeSource, MoveDirection, ReportManager, TimeSource};
use lull_control::config::bootstrap_control_configs;
use lull_control::{Backend, ControlManager, ControlState, LineRegistry};
use serde_json::Value;

fn chicago(hour: u32, minute: u32, second: u32) -> chrono::DateTime<Tz> {
    let tz: Tz = "America/Chicago".parse().unwrap();
    tz.with_ymd_and_hms(2025, 9, 28, hour, minute, second)
        .unwrap()
}

fn read_lines(path: &Path) -> Vec<String> {
    let contents = std::fs::read_to_string(path).unwrap();
    contents.lines().map(str::to_owned).collect()
}

#[test]
fn movements_are_journaled_in_submission_order() {
    let dir = tempfile::tempdir().unwrap();
    bootstrap_control_configs(dir.path());
    std::fs::create_dir_all(dir.path().join("reports")).unwrap();

    let mut registry = LineRegistry::new(Backend::Simulation);
    registry.initialize();

    let clock = Rc::new(FakeClock::new());
    let mut manager = ControlManager::new(Rc::clone(&clock) as Rc<dyn Clock>);
    manager.initialize(dir.path(), &mut registry);

    let time_source = Rc::new(FakeTimeSource::new(chicago(18, 0, 0)));
    let mut reports =
        ReportManager::new(Rc::clone(&time_source) as Rc<dyn TimeSource>, dir.path());

    // Raise the back, then lower the elevation a moment later.
    assert!(manager.process_command("back", MoveDirection::Up, "voice", &mut reports));

    time_source.set_now(chicago(18, 0, 5));
    assert!(manager.process_command(
        "elevation",
        MoveDirection::Down,
        "voice",
        &mut reports
    ));

    // The requests are journaled before any state actually changes.
    reports.process();
    assert_eq!(manager.get_states()["back"], ControlState::Idle);
    assert_eq!(manager.get_states()["elevation"], ControlState::Idle);

    let mut notifications = Vec::new();
    manager.process_controls(&mut registry, &mut notifications);

    assert_eq!(manager.get_states()["back"], ControlState::MoveUp);
    assert_eq!(manager.get_states()["elevation"], ControlState::MoveDown);
    // Controls live in a map, so cross-control order is unspecified.
    assert_eq!(notifications.len(), 2);
    assert!(notifications.contains(&"Raising the back.".to_owned()));
    assert!(notifications.contains(&"Lowering the elevation.".to_owned()));

    let report_path = dir.path().join("reports/lull2025-09-28.rpt");
    let lines = read_lines(&report_path);
    assert_eq!(lines.len(), 3);

    let header: Value = serde_json::from_str(&lines[0]).unwrap();
    assert_eq!(header["version"], 4);

    let first: Value = serde_json::from_str(&lines[1]).unwrap();
    assert_eq!(first["info"]["type"], "control");
    assert_eq!(first["info"]["control"], "back");
    assert_eq!(first["info"]["action"], "up");
    assert_eq!(first["info"]["source"], "voice");

    let second: Value = serde_json::from_str(&lines[2]).unwrap();
    assert_eq!(second["info"]["control"], "elevation");
    assert_eq!(second["info"]["action"], "down");
}

#[test]
fn full_movement_runs_through_cool_down_and_back_to_idle() {
    let dir = tempfile::tempdir().unwrap();
    bootstrap_control_configs(dir.path());
    std::fs::create_dir_all(dir.path().join("reports")).unwrap();

    let mut registry = LineRegistry::new(Backend::Simulation);
    registry.initialize();

    let clock = Rc::new(FakeClock::new());
    let mut manager = ControlManager::new(Rc::clone(&clock) as Rc<dyn Clock>);
    manager.initialize(dir.path(), &mut registry);

    let time_source = Rc::new(FakeTimeSource::new(chicago(18, 0, 0)));
    let mut reports = ReportManager::new(time_source, dir.path());

    manager.process_command("legs", MoveDirection::Down, "voice", &mut reports);

    let mut notifications = Vec::new();
    manager.process_controls(&mut registry, &mut notifications);
    assert_eq!(manager.get_states()["legs"], ControlState::MoveDown);

    // The stock legs control moves for 4000 ms.
    clock.advance_ms(4000);
    manager.process_controls(&mut registry, &mut notifications);
    assert_eq!(manager.get_states()["legs"], ControlState::CoolDown);

    clock.advance_ms(25);
    manager.process_controls(&mut registry, &mut notifications);
    assert_eq!(manager.get_states()["legs"], ControlState::Idle);

    assert_eq!(
        notifications,
        vec![
            "Lowering the legs.".to_owned(),
            "legs stopped.".to_owned(),
        ]
    );
}
