// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use oj_core::state::ServiceSubState;
use oj_core::{ActiveState, FakeClock, JobMode, JobResult, SubState};
use oj_exec::test_support::FakeResourceController;
use oj_unitconf::test_support::{minimal_service, minimal_target, FixtureSource};
use std::path::PathBuf;
use std::time::Duration;

struct TestEnv;

impl ExecEnvironment for TestEnv {
    fn context_for(&self, _unit_id: &str, _settings: &ServiceSettings) -> ExecContext {
        ExecContext::default()
    }

    fn parameters_for(&self, unit_id: &str) -> ExecParameters {
        ExecParameters {
            cgroup_path: format!("runner-test-{unit_id}"),
            notify_socket: None,
            runtime_directory: PathBuf::from("/tmp"),
        }
    }
}

fn service_with(name: &str, exec_start: &str, configure: impl FnOnce(&mut ServiceSettings)) -> oj_unitconf::UnitConfig {
    let mut cfg = minimal_service(name);
    if let oj_unitconf::KindSettings::Service(settings) = &mut cfg.kind_settings {
        settings.exec.exec_start = vec![exec_start.to_string()];
        configure(settings);
    }
    cfg
}

/// Reaps whatever zombie the test's real `fork()`+`execve()` left behind,
/// mirroring `oj_exec::pipeline_tests`'s own cleanup of its spawned children.
fn reap_any_child() {
    let _ = nix::sys::wait::wait();
}

#[test]
fn starting_a_simple_service_spawns_and_settles_done() {
    let mut g = UnitGraph::new(
        FixtureSource::new().with(service_with("a.service", "/bin/true", |_| {})),
    );
    let a = g.get_or_load("a.service").unwrap();
    let job = Job::new(a, JobType::Start, JobMode::Replace);
    let job_id = job.id;
    let mut runner = JobRunner::new(vec![job], FakeClock::new());
    let controller = FakeResourceController::new();
    let fds = FDSet::new();

    // `Type=simple` is considered ready the instant the process is
    // spawned, so one tick should carry the unit all the way to `Running`
    // and settle the job as `Done`.
    let finished = runner.tick(&mut g, &TestEnv, &controller, &fds).unwrap();

    assert_eq!(finished, vec![job_id]);
    assert_eq!(g.get(a).unwrap().active_state, ActiveState::Active);
    assert_eq!(runner.jobs()[0].result, Some(JobResult::Done));
    reap_any_child();
}

#[test]
fn a_notify_service_stays_activating_until_ready_signaled() {
    let mut g = UnitGraph::new(FixtureSource::new().with(service_with(
        "a.service",
        "/bin/true",
        |s| s.service_type = oj_unitconf::ServiceType::Notify,
    )));
    let a = g.get_or_load("a.service").unwrap();
    let job = Job::new(a, JobType::Start, JobMode::Replace);
    let mut runner = JobRunner::new(vec![job], FakeClock::new());
    let controller = FakeResourceController::new();
    let fds = FDSet::new();

    let finished = runner.tick(&mut g, &TestEnv, &controller, &fds).unwrap();

    assert!(finished.is_empty());
    assert_eq!(g.get(a).unwrap().active_state, ActiveState::Activating);
    assert!(matches!(g.get(a).unwrap().sub_state, SubState::Service(ServiceSubState::Start)));
    reap_any_child();
}

#[test]
fn start_timeout_escalates_to_sigterm() {
    let mut g = UnitGraph::new(FixtureSource::new().with(service_with(
        "a.service",
        "/bin/true",
        |s| {
            s.service_type = oj_unitconf::ServiceType::Notify;
            s.timeout_start_sec = Duration::from_secs(10);
        },
    )));
    let a = g.get_or_load("a.service").unwrap();
    let job = Job::new(a, JobType::Start, JobMode::Replace);
    let clock = FakeClock::new();
    let mut runner = JobRunner::new(vec![job], clock.clone());
    let controller = FakeResourceController::new();
    let fds = FDSet::new();

    runner.tick(&mut g, &TestEnv, &controller, &fds).unwrap();
    assert!(matches!(g.get(a).unwrap().sub_state, SubState::Service(ServiceSubState::Start)));

    clock.advance(Duration::from_secs(11));
    runner.tick(&mut g, &TestEnv, &controller, &fds).unwrap();

    assert_eq!(g.get(a).unwrap().active_state, ActiveState::Deactivating);
    assert!(matches!(g.get(a).unwrap().sub_state, SubState::Service(ServiceSubState::StopSigterm)));
    reap_any_child();
}

#[test]
fn verify_job_succeeds_when_unit_already_active() {
    let mut g = UnitGraph::new(FixtureSource::new().with(minimal_target("a.target")));
    let a = g.get_or_load("a.target").unwrap();
    g.get_mut(a).unwrap().active_state = ActiveState::Active;
    let job = Job::new(a, JobType::Verify, JobMode::Replace);
    let job_id = job.id;
    let mut runner = JobRunner::new(vec![job], FakeClock::new());
    let controller = FakeResourceController::new();
    let fds = FDSet::new();

    let finished = runner.tick(&mut g, &TestEnv, &controller, &fds).unwrap();

    assert_eq!(finished, vec![job_id]);
    assert_eq!(runner.jobs()[0].result, Some(JobResult::Done));
}

#[test]
fn verify_job_fails_when_unit_is_not_active() {
    let mut g = UnitGraph::new(FixtureSource::new().with(minimal_target("a.target")));
    let a = g.get_or_load("a.target").unwrap();
    let job = Job::new(a, JobType::Verify, JobMode::Replace);
    let mut runner = JobRunner::new(vec![job], FakeClock::new());
    let controller = FakeResourceController::new();
    let fds = FDSet::new();

    runner.tick(&mut g, &TestEnv, &controller, &fds).unwrap();

    assert_eq!(runner.jobs()[0].result, Some(JobResult::Failed));
}

#[test]
fn a_failed_predecessor_drops_its_dependent_to_a_dependency_result() {
    let mut g = UnitGraph::new(
        FixtureSource::new()
            .with(minimal_target("a.target"))
            .with(minimal_target("b.target")),
    );
    let a = g.get_or_load("a.target").unwrap();
    let b = g.get_or_load("b.target").unwrap();

    let mut job_a = Job::new(a, JobType::Start, JobMode::Replace);
    job_a.result = Some(JobResult::Failed);
    let mut job_b = Job::new(b, JobType::Start, JobMode::Replace);
    job_b.waits_for.push(job_a.id);
    let job_b_id = job_b.id;

    let mut runner = JobRunner::new(vec![job_a, job_b], FakeClock::new());
    let controller = FakeResourceController::new();
    let fds = FDSet::new();

    let finished = runner.tick(&mut g, &TestEnv, &controller, &fds).unwrap();

    assert!(finished.contains(&job_b_id));
    let b_job = runner.jobs().iter().find(|j| j.id == job_b_id).unwrap();
    assert_eq!(b_job.result, Some(JobResult::Dependency));
    // The dependent never got a chance to start: its unit never left
    // `Inactive`.
    assert_eq!(g.get(b).unwrap().active_state, ActiveState::Inactive);
}

#[test]
fn missing_binary_is_reported_as_a_spawn_failure() {
    let mut g = UnitGraph::new(FixtureSource::new().with(service_with(
        "a.service",
        "/nonexistent/binary-oj-engine-test",
        |_| {},
    )));
    let a = g.get_or_load("a.service").unwrap();
    let job = Job::new(a, JobType::Start, JobMode::Replace);
    let mut runner = JobRunner::new(vec![job], FakeClock::new());
    let controller = FakeResourceController::new();
    let fds = FDSet::new();

    let err = runner.tick(&mut g, &TestEnv, &controller, &fds).unwrap_err();

    assert!(matches!(
        err,
        RunnerError::Runtime(EngineRuntimeError::SpawnFailed { .. })
    ));
}

#[test]
fn a_job_whose_unit_no_longer_exists_is_reported_dangling() {
    let mut g = UnitGraph::new(FixtureSource::new().with(minimal_target("a.target")));
    let a = g.get_or_load("a.target").unwrap();
    g.get_mut(a).unwrap().refs = 0;
    let job = Job::new(a, JobType::Start, JobMode::Replace);
    let job_id = job.id;
    let mut runner = JobRunner::new(vec![job], FakeClock::new());

    // Garbage collect the unit out from under the still-queued job, the
    // defensive scenario `RunnerError::DanglingUnit` exists for.
    g.garbage_collect();
    assert!(g.get(a).is_none());

    let controller = FakeResourceController::new();
    let fds = FDSet::new();
    let err = runner.tick(&mut g, &TestEnv, &controller, &fds).unwrap_err();

    match err {
        RunnerError::DanglingUnit { job } => assert_eq!(job, job_id),
        other => panic!("expected DanglingUnit, got {other:?}"),
    }
}

#[test]
fn is_done_reflects_every_job_having_a_result() {
    let mut g = UnitGraph::new(FixtureSource::new().with(minimal_target("a.target")));
    let a = g.get_or_load("a.target").unwrap();
    let job = Job::new(a, JobType::Verify, JobMode::Replace);
    let mut runner = JobRunner::new(vec![job], FakeClock::new());
    assert!(!runner.is_done());

    let controller = FakeResourceController::new();
    let fds = FDSet::new();
    runner.tick(&mut g, &TestEnv, &controller, &fds).unwrap();

    assert!(runner.is_done());
}

#[test]
fn enqueue_folds_a_later_transaction_into_an_already_running_queue() {
    let mut g = UnitGraph::new(
        FixtureSource::new().with(minimal_target("a.target")).with(minimal_target("b.target")),
    );
    let a = g.get_or_load("a.target").unwrap();
    let b = g.get_or_load("b.target").unwrap();
    let job_a = Job::new(a, JobType::Verify, JobMode::Replace);
    let mut runner = JobRunner::new(vec![job_a], FakeClock::new());

    let job_b = Job::new(b, JobType::Verify, JobMode::Replace);
    let job_b_id = job_b.id;
    runner.enqueue(vec![job_b]);

    let controller = FakeResourceController::new();
    let fds = FDSet::new();
    let finished = runner.tick(&mut g, &TestEnv, &controller, &fds).unwrap();

    assert!(finished.contains(&job_b_id));
    assert!(runner.is_done());
}
