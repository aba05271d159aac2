// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Service unit sub-state (spec.md §4.4) — the richest of the per-kind
//! machines, since a service is the only unit kind that runs an arbitrary
//! multi-phase exec pipeline with its own timeout, watchdog and restart
//! policy.
//!
//! This module only decides *what the next sub-state is and what the
//! runner should do about it*; actually spawning or signalling a process
//! is `oj-exec`'s job, reached through the [`ServiceEffect`] list the
//! runner executes after each transition.

use super::UnitEvent;
use crate::unit::ActiveState;
use oj_unitconf::service::{RestartPolicy, ServiceSettings, ServiceType};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceSubState {
    Dead,
    ConditionFailed,
    StartPre,
    Start,
    StartPost,
    Running,
    /// `RemainAfterExit=yes` services and `Type=oneshot` services that
    /// have finished their main process but are still considered active.
    Exited,
    Reload,
    Stop,
    StopWatchdog,
    StopSigterm,
    StopSigkill,
    StopPost,
    FinalSigterm,
    FinalSigkill,
    Failed,
    AutoRestart,
    Cleaning,
}

impl ServiceSubState {
    pub fn active_state(self) -> ActiveState {
        use ServiceSubState::*;
        match self {
            Dead | ConditionFailed => ActiveState::Inactive,
            StartPre | Start | StartPost | AutoRestart => ActiveState::Activating,
            Running | Exited => ActiveState::Active,
            Reload => ActiveState::Reloading,
            Stop | StopWatchdog | StopSigterm | StopSigkill | StopPost | FinalSigterm
            | FinalSigkill => ActiveState::Deactivating,
            Failed => ActiveState::Failed,
            Cleaning => ActiveState::Maintenance,
        }
    }
}

/// Side effect the job runner must carry out after a transition. Each
/// variant names exactly one `oj-exec` call or timer arm; the state
/// machine itself never touches a process handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceEffect {
    RunExecStartPre,
    RunExecStart,
    RunExecStartPost,
    RunExecReload,
    RunExecStop,
    RunExecStopPost,
    SendSignal(i32),
    ArmTimeout(Duration),
    ArmWatchdog(Duration),
    ArmRestart(Duration),
    CancelTimers,
    ReapMainProcess,
    /// Unit entered `Failed`; the engine sets `failed_latch` and emits the
    /// `OnFailure=` dependency propagation (spec.md §3).
    ReportFailed,
    /// Unit left `Failed`/entered a fresh activation cycle successfully.
    ClearFailedLatch,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceTransition {
    pub next: ServiceSubState,
    pub effects: Vec<ServiceEffect>,
}

impl ServiceTransition {
    fn to(next: ServiceSubState) -> Self {
        Self { next, effects: Vec::new() }
    }

    fn with(mut self, effect: ServiceEffect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Whether `exec_start_pre` failing should abort the start entirely
/// (spec.md §4.4 edge case: start-pre failure skips straight to stop, it
/// does not run the main `ExecStart` at all).
fn start_pre_failed(settings: &ServiceSettings) -> ServiceTransition {
    if settings.exec_stop_post.is_empty() {
        ServiceTransition::to(ServiceSubState::Failed).with(ServiceEffect::ReportFailed)
    } else {
        ServiceTransition::to(ServiceSubState::StopPost).with(ServiceEffect::RunExecStopPost)
    }
}

fn restart_or_terminal(settings: &ServiceSettings, success: bool, failed: bool) -> ServiceTransition {
    let should_restart = match settings.restart {
        RestartPolicy::No => false,
        RestartPolicy::Always => true,
        RestartPolicy::OnSuccess => success,
        RestartPolicy::OnFailure | RestartPolicy::OnAbnormal | RestartPolicy::OnAbort => !success,
        RestartPolicy::OnWatchdog => failed,
    };
    if should_restart {
        ServiceTransition::to(ServiceSubState::AutoRestart)
            .with(ServiceEffect::ArmRestart(settings.restart_sec))
    } else if failed {
        ServiceTransition::to(ServiceSubState::Failed).with(ServiceEffect::ReportFailed)
    } else {
        ServiceTransition::to(ServiceSubState::Dead).with(ServiceEffect::ClearFailedLatch)
    }
}

impl ServiceSubState {
    /// Advance one step. `event` is the trigger; `settings` supplies the
    /// policy knobs (`Restart=`, timeouts, watchdog interval) that decide
    /// where a given event leads.
    pub fn advance(self, settings: &ServiceSettings, event: &UnitEvent) -> ServiceTransition {
        use ServiceSubState::*;
        use UnitEvent::*;

        match (self, event) {
            // -- starting a fresh activation cycle --
            (Dead, StartRequested) | (Failed, StartRequested) | (ConditionFailed, StartRequested) => {
                if settings.exec_start_pre.is_empty() {
                    ServiceTransition::to(Start)
                        .with(ServiceEffect::RunExecStart)
                        .with(ServiceEffect::ArmTimeout(settings.timeout_start_sec))
                } else {
                    ServiceTransition::to(StartPre)
                        .with(ServiceEffect::RunExecStartPre)
                        .with(ServiceEffect::ArmTimeout(settings.timeout_start_sec))
                }
            }

            (StartPre, CommandExited { code: 0 }) => ServiceTransition::to(Start)
                .with(ServiceEffect::RunExecStart)
                .with(ServiceEffect::ArmTimeout(settings.timeout_start_sec)),
            (StartPre, CommandExited { code: _ }) => start_pre_failed(settings),
            (StartPre, TimeoutExpired) => start_pre_failed(settings),

            // `Type=simple`/`exec` consider the process ready the instant it
            // is spawned, so the caller should have already driven Start ->
            // Running via `ReadySignaled` synthesized at spawn time; this
            // branch covers `Type=notify`/`forking`/`dbus`, which wait for
            // an explicit readiness signal before moving on.
            (Start, ReadySignaled) => {
                if settings.exec_start_post.is_empty() {
                    let mut t = ServiceTransition::to(Running).with(ServiceEffect::CancelTimers);
                    if let Some(wd) = settings.watchdog_sec {
                        t = t.with(ServiceEffect::ArmWatchdog(wd));
                    }
                    t
                } else {
                    ServiceTransition::to(StartPost).with(ServiceEffect::RunExecStartPost)
                }
            }
            (Start, CommandExited { code: 0 }) if settings.service_type == ServiceType::Oneshot => {
                ServiceTransition::to(Exited).with(ServiceEffect::CancelTimers)
            }
            (Start, CommandExited { code }) if *code != 0 => {
                restart_or_terminal(settings, false, true)
            }
            (Start, MainProcessExited { code, .. }) => restart_or_terminal(settings, *code == 0, *code != 0),
            (Start, TimeoutExpired) => ServiceTransition::to(StopSigterm)
                .with(ServiceEffect::SendSignal(settings.kill_signal))
                .with(ServiceEffect::ArmTimeout(settings.timeout_stop_sec)),

            (StartPost, CommandExited { code: 0 }) => {
                let mut t = ServiceTransition::to(Running).with(ServiceEffect::CancelTimers);
                if let Some(wd) = settings.watchdog_sec {
                    t = t.with(ServiceEffect::ArmWatchdog(wd));
                }
                t
            }
            (StartPost, CommandExited { code: _ }) | (StartPost, TimeoutExpired) => {
                ServiceTransition::to(StopSigterm)
                    .with(ServiceEffect::SendSignal(settings.kill_signal))
                    .with(ServiceEffect::ArmTimeout(settings.timeout_stop_sec))
            }

            // -- steady state --
            (Running, MainProcessExited { code, .. }) => restart_or_terminal(settings, *code == 0, *code != 0),
            (Running, WatchdogExpired) => ServiceTransition::to(StopWatchdog)
                .with(ServiceEffect::SendSignal(settings.kill_signal))
                .with(ServiceEffect::ArmTimeout(settings.timeout_stop_sec)),
            (Running, ReloadRequested) if settings.exec_reload.is_some() => {
                ServiceTransition::to(Reload).with(ServiceEffect::RunExecReload)
            }
            (Running, StopRequested) => {
                if settings.exec_stop.is_empty() {
                    ServiceTransition::to(StopSigterm)
                        .with(ServiceEffect::SendSignal(settings.kill_signal))
                        .with(ServiceEffect::ArmTimeout(settings.timeout_stop_sec))
                } else {
                    ServiceTransition::to(Stop)
                        .with(ServiceEffect::RunExecStop)
                        .with(ServiceEffect::ArmTimeout(settings.timeout_stop_sec))
                }
            }
            // `Exited` has no backing process by definition (that's what
            // distinguishes it from `Running`) — with no `ExecStop=` hook
            // there's nothing to run or signal, so the stop is immediate
            // rather than cycling through the signal-escalation ladder.
            (Exited, StopRequested) => {
                if settings.exec_stop.is_empty() {
                    ServiceTransition::to(Dead).with(ServiceEffect::ClearFailedLatch)
                } else {
                    ServiceTransition::to(Stop)
                        .with(ServiceEffect::RunExecStop)
                        .with(ServiceEffect::ArmTimeout(settings.timeout_stop_sec))
                }
            }
            (Exited, MainProcessExited { .. }) => {
                ServiceTransition::to(Dead).with(ServiceEffect::ClearFailedLatch)
            }

            // reload failure leaves the main process running untouched
            // (spec.md §4.4 edge case): only the reload command failed.
            (Reload, CommandExited { code: 0 }) => ServiceTransition::to(Running),
            (Reload, CommandExited { code: _ }) | (Reload, TimeoutExpired) => {
                ServiceTransition::to(Running)
            }

            // -- stopping --
            (Stop, CommandExited { .. }) | (Stop, TimeoutExpired) => {
                ServiceTransition::to(StopSigterm)
                    .with(ServiceEffect::SendSignal(settings.kill_signal))
                    .with(ServiceEffect::ArmTimeout(settings.timeout_stop_sec))
            }
            // The main process dying in response to our own signal is a
            // completed stop, not a failure — `StopWatchdog` and
            // `StopSigterm` are reached from a watchdog expiry or a plain
            // `StopRequested` alike, and either way the process is gone now.
            (StopWatchdog, MainProcessExited { .. }) | (StopSigterm, MainProcessExited { .. }) => {
                if settings.exec_stop_post.is_empty() {
                    ServiceTransition::to(Dead).with(ServiceEffect::ClearFailedLatch)
                } else {
                    ServiceTransition::to(StopPost).with(ServiceEffect::RunExecStopPost)
                }
            }
            (StopWatchdog, TimeoutExpired) | (StopSigterm, TimeoutExpired) => {
                ServiceTransition::to(StopSigkill)
                    .with(ServiceEffect::SendSignal(settings.final_kill_signal))
                    .with(ServiceEffect::ArmTimeout(Duration::from_secs(5)))
            }
            (StopSigkill, MainProcessExited { .. }) => {
                if settings.exec_stop_post.is_empty() {
                    ServiceTransition::to(Dead).with(ServiceEffect::ClearFailedLatch)
                } else {
                    ServiceTransition::to(StopPost).with(ServiceEffect::RunExecStopPost)
                }
            }
            // Still alive after SIGKILL's own timeout: genuinely stuck.
            (StopSigkill, TimeoutExpired) => ServiceTransition::to(Failed).with(ServiceEffect::ReportFailed),
            (StopPost, CommandExited { code: 0 }) => {
                ServiceTransition::to(Dead).with(ServiceEffect::ClearFailedLatch)
            }
            (StopPost, CommandExited { code: _ }) | (StopPost, TimeoutExpired) => {
                ServiceTransition::to(FinalSigterm)
                    .with(ServiceEffect::SendSignal(settings.kill_signal))
                    .with(ServiceEffect::ArmTimeout(Duration::from_secs(5)))
            }
            (FinalSigterm, MainProcessExited { .. }) => {
                ServiceTransition::to(Failed).with(ServiceEffect::ReportFailed)
            }
            (FinalSigterm, TimeoutExpired) => ServiceTransition::to(FinalSigkill)
                .with(ServiceEffect::SendSignal(settings.final_kill_signal))
                .with(ServiceEffect::ArmTimeout(Duration::from_secs(5))),
            (FinalSigkill, MainProcessExited { .. }) | (FinalSigkill, TimeoutExpired) => {
                ServiceTransition::to(Failed).with(ServiceEffect::ReportFailed)
            }

            (AutoRestart, TimeoutExpired) => {
                if settings.exec_start_pre.is_empty() {
                    ServiceTransition::to(Start)
                        .with(ServiceEffect::RunExecStart)
                        .with(ServiceEffect::ArmTimeout(settings.timeout_start_sec))
                } else {
                    ServiceTransition::to(StartPre)
                        .with(ServiceEffect::RunExecStartPre)
                        .with(ServiceEffect::ArmTimeout(settings.timeout_start_sec))
                }
            }
            (AutoRestart, StopRequested) => ServiceTransition::to(Dead).with(ServiceEffect::CancelTimers),

            (_, CgroupEmptied) => ServiceTransition::to(Cleaning).with(ServiceEffect::ReapMainProcess),
            (Cleaning, ExternalStateObserved) => ServiceTransition::to(Dead),

            // Any other (state, event) pair is a no-op: the runner logs it
            // and drops the event rather than panicking on an impossible
            // transition table entry.
            (state, _) => ServiceTransition::to(state),
        }
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
