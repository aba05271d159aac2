// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use oj_unitconf::service::ServiceSettings;

fn settings() -> ServiceSettings {
    ServiceSettings::default()
}

#[test]
fn simple_start_goes_straight_to_start_then_running_on_ready() {
    let s = settings();
    let t = ServiceSubState::Dead.advance(&s, &UnitEvent::StartRequested);
    assert_eq!(t.next, ServiceSubState::Start);
    assert!(t.effects.contains(&ServiceEffect::RunExecStart));

    let t2 = ServiceSubState::Start.advance(&s, &UnitEvent::ReadySignaled);
    assert_eq!(t2.next, ServiceSubState::Running);
}

#[test]
fn start_pre_runs_before_start_when_configured() {
    let mut s = settings();
    s.exec_start_pre.push("/bin/true".to_string());
    let t = ServiceSubState::Dead.advance(&s, &UnitEvent::StartRequested);
    assert_eq!(t.next, ServiceSubState::StartPre);
}

#[test]
fn start_pre_failure_skips_main_start_and_goes_to_stop_post_or_failed() {
    let s = settings();
    let t = ServiceSubState::StartPre.advance(&s, &UnitEvent::CommandExited { code: 1 });
    // No exec_stop_post configured by default -> straight to failed.
    assert_eq!(t.next, ServiceSubState::Failed);
    assert!(t.effects.contains(&ServiceEffect::ReportFailed));
}

#[test]
fn start_pre_failure_with_stop_post_configured_runs_stop_post_not_main_start() {
    let mut s = settings();
    s.exec_stop_post.push("/bin/cleanup".to_string());
    let t = ServiceSubState::StartPre.advance(&s, &UnitEvent::CommandExited { code: 1 });
    assert_eq!(t.next, ServiceSubState::StopPost);
    assert!(t.effects.contains(&ServiceEffect::RunExecStopPost));
    assert!(!t.effects.contains(&ServiceEffect::RunExecStart));
}

#[test]
fn reload_failure_leaves_main_process_running() {
    let s = settings();
    let t = ServiceSubState::Reload.advance(&s, &UnitEvent::CommandExited { code: 1 });
    assert_eq!(t.next, ServiceSubState::Running);
}

#[test]
fn watchdog_expiry_escalates_to_sigterm_then_sigkill_on_timeout() {
    let s = settings();
    let t = ServiceSubState::Running.advance(&s, &UnitEvent::WatchdogExpired);
    assert_eq!(t.next, ServiceSubState::StopWatchdog);
    assert!(t.effects.iter().any(|e| matches!(e, ServiceEffect::SendSignal(15))));

    let t2 = ServiceSubState::StopWatchdog.advance(&s, &UnitEvent::TimeoutExpired);
    assert_eq!(t2.next, ServiceSubState::StopSigkill);
    assert!(t2.effects.iter().any(|e| matches!(e, ServiceEffect::SendSignal(9))));
}

#[test]
fn restart_always_reenters_auto_restart_on_exit() {
    let mut s = settings();
    s.restart = oj_unitconf::service::RestartPolicy::Always;
    let t = ServiceSubState::Running.advance(&s, &UnitEvent::MainProcessExited { code: 0, signaled: false });
    assert_eq!(t.next, ServiceSubState::AutoRestart);
    assert!(t.effects.iter().any(|e| matches!(e, ServiceEffect::ArmRestart(_))));
}

#[test]
fn restart_no_policy_goes_dead_on_clean_exit() {
    let s = settings();
    let t = ServiceSubState::Running.advance(&s, &UnitEvent::MainProcessExited { code: 0, signaled: false });
    assert_eq!(t.next, ServiceSubState::Dead);
}

#[test]
fn restart_no_policy_fails_on_nonzero_exit() {
    let s = settings();
    let t = ServiceSubState::Running.advance(&s, &UnitEvent::MainProcessExited { code: 1, signaled: false });
    assert_eq!(t.next, ServiceSubState::Failed);
}

#[test]
fn cgroup_emptied_triggers_cleaning_from_any_state() {
    let s = settings();
    let t = ServiceSubState::Failed.advance(&s, &UnitEvent::CgroupEmptied);
    assert_eq!(t.next, ServiceSubState::Cleaning);
}

#[test]
fn oneshot_exits_to_exited_not_dead() {
    let mut s = settings();
    s.service_type = oj_unitconf::service::ServiceType::Oneshot;
    let t = ServiceSubState::Start.advance(&s, &UnitEvent::CommandExited { code: 0 });
    assert_eq!(t.next, ServiceSubState::Exited);
}

#[test]
fn stop_runs_exec_stop_then_sigterm_on_exit() {
    let mut s = settings();
    s.exec_stop.push("/bin/graceful-stop".to_string());
    let t = ServiceSubState::Running.advance(&s, &UnitEvent::StopRequested);
    assert_eq!(t.next, ServiceSubState::Stop);
    assert!(t.effects.contains(&ServiceEffect::RunExecStop));
}
