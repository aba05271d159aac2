// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::test_support::FakeResourceController;
use super::*;
use nix::sys::wait::{waitpid, WaitStatus};
use oj_storage::FDSet;
use std::path::PathBuf;

fn params() -> ExecParameters {
    ExecParameters {
        cgroup_path: "spawn-test.service".to_string(),
        notify_socket: None,
        runtime_directory: PathBuf::from("/tmp"),
    }
}

#[test]
fn successful_spawn_attaches_the_child_to_its_cgroup() {
    let controller = FakeResourceController::new();
    let command = ExecCommand::new("/bin/true", vec!["true".to_string()]);
    let context = ExecContext::default();
    let runtime = ExecRuntime::new();
    let fds = FDSet::new();

    let spawned = spawn(&command, &context, &params(), &runtime, &controller, &fds).unwrap();

    assert!(!controller.is_empty(&spawned.cgroup).unwrap());
    match waitpid(spawned.pid, None).unwrap() {
        WaitStatus::Exited(_, code) => assert_eq!(code, 0),
        other => panic!("unexpected wait status: {other:?}"),
    }
    controller.simulate_exit(&spawned.cgroup, spawned.pid);
    assert!(controller.is_empty(&spawned.cgroup).unwrap());
}

#[test]
fn nonzero_exit_is_not_a_spawn_failure() {
    let controller = FakeResourceController::new();
    let command = ExecCommand::new("/bin/false", vec!["false".to_string()]);
    let context = ExecContext::default();
    let runtime = ExecRuntime::new();
    let fds = FDSet::new();

    let spawned = spawn(&command, &context, &params(), &runtime, &controller, &fds).unwrap();
    match waitpid(spawned.pid, None).unwrap() {
        WaitStatus::Exited(_, code) => assert_eq!(code, 1),
        other => panic!("unexpected wait status: {other:?}"),
    }
}

#[test]
fn capability_numbers_accept_both_prefixed_and_bare_names() {
    assert_eq!(capability_number("CAP_NET_BIND_SERVICE"), capability_number("NET_BIND_SERVICE"));
    assert_eq!(capability_number("CAP_CHOWN"), Some(0));
    assert_eq!(capability_number("NOT_A_CAPABILITY"), None);
}

#[test]
fn scheduling_policy_numbers_recognize_the_documented_names() {
    assert_eq!(scheduling_policy_number("SCHED_OTHER"), Some(libc::SCHED_OTHER));
    assert_eq!(scheduling_policy_number("SCHED_FIFO"), Some(libc::SCHED_FIFO));
    assert_eq!(scheduling_policy_number("SCHED_RR"), Some(libc::SCHED_RR));
    assert_eq!(scheduling_policy_number("bogus"), None);
}

#[test]
fn default_context_scheduling_and_capabilities_succeed_with_no_policy_set() {
    // `ExecContext::default()` carries no scheduling policy and an empty
    // bounding/ambient set; `no_new_privileges` defaults on, and setting
    // it needs no privilege, so both phases should succeed even when run
    // directly on the test thread rather than a freshly forked child.
    let context = ExecContext::default();
    assert!(apply_scheduling(&context).is_ok());
    assert!(apply_capabilities(&context).is_ok());
}

#[test]
fn missing_binary_reports_execve_failure_not_a_zombie_exit_code() {
    let controller = FakeResourceController::new();
    let command = ExecCommand::new("/nonexistent/binary-that-does-not-exist", vec![]);
    let context = ExecContext::default();
    let runtime = ExecRuntime::new();
    let fds = FDSet::new();

    let err = spawn(&command, &context, &params(), &runtime, &controller, &fds).unwrap_err();
    match err {
        RuntimeError::SpawnFailed { phase: SpawnPhase::Execve, .. } => {}
        other => panic!("expected an Execve spawn failure, got {other:?}"),
    }
}
