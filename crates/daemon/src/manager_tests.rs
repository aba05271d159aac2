// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use oj_unitconf::test_support::minimal_service;

fn manager_with(units: &[&str]) -> (tempfile::TempDir, Manager) {
    let dir = tempfile::tempdir().unwrap_or_else(|_| panic!("tempdir"));
    for name in units {
        let config = minimal_service(name);
        std::fs::write(dir.path().join(format!("{name}.json")), serde_json::to_string(&config).unwrap()).unwrap();
    }
    let manager = Manager::new(
        dir.path().to_path_buf(),
        dir.path().join("run"),
        dir.path().join("run/notify"),
    );
    (dir, manager)
}

#[test]
fn start_unit_installs_a_job_visible_in_list_jobs() {
    let (_dir, mut manager) = manager_with(&["a.service"]);
    let job_id = manager.start_unit("a.service", JobMode::Replace).unwrap();

    let jobs = manager.list_jobs();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].id, job_id);
    assert_eq!(jobs[0].unit, "a.service");
    assert_eq!(jobs[0].job_type, JobType::Start);
}

#[test]
fn list_units_reflects_a_loaded_unit() {
    let (_dir, mut manager) = manager_with(&["a.service"]);
    manager.start_unit("a.service", JobMode::Replace).unwrap();

    let units = manager.list_units();
    assert_eq!(units.len(), 1);
    assert_eq!(units[0].name, "a.service");
    assert_eq!(units[0].load_state, LoadState::Loaded);
}

#[test]
fn reset_failed_on_an_unresolved_name_is_reported() {
    let (_dir, mut manager) = manager_with(&["a.service"]);
    let err = manager.reset_failed(Some("a.service")).unwrap_err();
    assert!(matches!(err, DaemonError::UnknownUnit(_)));
}

#[test]
fn reset_failed_on_a_loaded_unit_succeeds() {
    let (_dir, mut manager) = manager_with(&["a.service"]);
    manager.start_unit("a.service", JobMode::Replace).unwrap();
    manager.reset_failed(Some("a.service")).unwrap();
}

#[test]
fn reset_failed_all_never_errors_on_an_empty_graph() {
    let (_dir, mut manager) = manager_with(&[]);
    manager.reset_failed(None).unwrap();
}

#[test]
fn subscribe_observes_a_unit_changed_event_from_start_unit() {
    let (_dir, mut manager) = manager_with(&["a.service"]);
    let mut rx = manager.subscribe();

    manager.start_unit("a.service", JobMode::Replace).unwrap();

    match rx.try_recv() {
        Ok(ManagerEvent::UnitChanged(name)) => assert_eq!(name, "a.service"),
        other => panic!("expected UnitChanged, got {other:?}"),
    }
}

#[test]
fn reload_with_no_loaded_units_is_a_noop() {
    let (_dir, mut manager) = manager_with(&[]);
    manager.reload().unwrap();
    assert!(manager.list_units().is_empty());
}
