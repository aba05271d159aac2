// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The job runner (spec.md §4.6): drains jobs whose predecessors have
//! finished (or failed tolerably), drives each unit's sub-state machine,
//! and turns `oj_core::state` effects into real `oj_exec` calls.
//!
//! This module is the one place `oj-engine` reaches past `oj-core` into
//! `oj-exec`: the state machines decide *what* should happen
//! (`ServiceEffect::RunExecStart`, …), [`JobRunner`] decides *when* (job
//! ordering, timeouts) and calls out to an [`ExecEnvironment`] to learn
//! *how* to translate a unit's settings into the exec pipeline's
//! `ExecContext`/`ExecParameters` — that translation is a daemon-level
//! concern (reading `RuntimeDirectory=`, resolving user/group names),
//! not something this crate should own.

use crate::error::{RunnerError, RuntimeError as EngineRuntimeError};
use oj_core::state::service::{ServiceEffect, ServiceSubState};
use oj_core::{ActiveState, Clock, Job, JobId, JobResult, JobType, SubState, UnitGraph, UnitIdx};
use oj_exec::{CgroupHandle, ExecCommand, ExecContext, ExecParameters, ExecRuntime, ResourceController, Spawned};
use oj_storage::FDSet;
use oj_unitconf::{service::ServiceSettings, UnitConfigSource};
use std::collections::HashMap;
use std::time::Instant;

/// Builds the exec-pipeline inputs for a unit from its settings. Supplied
/// by the daemon, which is the layer that knows about runtime
/// directories, resolved uids/gids, and `NOTIFY_SOCKET` paths (spec.md §6)
/// — none of which `oj-engine` has an opinion on.
pub trait ExecEnvironment {
    fn context_for(&self, unit_id: &str, settings: &ServiceSettings) -> ExecContext;
    fn parameters_for(&self, unit_id: &str) -> ExecParameters;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeadlineKind {
    Timeout,
    Watchdog,
    Restart,
}

#[derive(Default)]
struct JobRuntime {
    deadline: Option<(Instant, DeadlineKind)>,
    main_pid: Option<nix::unistd::Pid>,
    /// Whether `main_pid` is the service's long-running main process (so its
    /// exit is `MainProcessExited`) or a short-lived hook/oneshot command
    /// whose exit the state machine awaits as `CommandExited` (spec.md
    /// §4.4: `ExecStartPre=`/`ExecStartPost=`/`ExecStop=`/`ExecStopPost=`,
    /// and `ExecStart=` itself under `Type=oneshot`).
    tracking_main_process: bool,
    cgroup: Option<CgroupHandle>,
    exec: ExecRuntime,
    /// Remaining command lines in the hook/list phase currently running
    /// (spec.md:157): `ExecStartPre=`/`ExecStartPost=`/`ExecStop=`/
    /// `ExecStopPost=`/`ExecReload=`, and a oneshot's own `ExecStart=`,
    /// are each a list run end to end, not just their first entry.
    pending_commands: Vec<String>,
    /// Whether the command currently tracked as `main_pid` was written
    /// with a `-` prefix (spec.md's ignore-failure convention): its exit
    /// code is treated as 0 for the purpose of advancing the list/phase.
    current_ignore_failure: bool,
}

/// One committed transaction's jobs, plus the bookkeeping needed to drive
/// them to completion (spec.md §4.6).
pub struct JobRunner<C: Clock> {
    jobs: Vec<Job>,
    runtime: HashMap<JobId, JobRuntime>,
    clock: C,
}

fn parse_command(line: &str) -> Option<ExecCommand> {
    let mut parts = line.split_whitespace();
    let path = parts.next()?;
    let (path, ignore_failure) = match path.strip_prefix('-') {
        Some(rest) => (rest, true),
        None => (path, false),
    };
    let argv = std::iter::once(path.to_string()).chain(parts.map(str::to_string)).collect();
    let mut cmd = ExecCommand::new(path, argv);
    cmd.ignore_failure = ignore_failure;
    Some(cmd)
}

impl<C: Clock> JobRunner<C> {
    pub fn new(jobs: Vec<Job>, clock: C) -> Self {
        let runtime = jobs.iter().map(|j| (j.id, JobRuntime::default())).collect();
        Self { jobs, runtime, clock }
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    /// Add newly-installed jobs to this runner's queue. A `JobRunner`
    /// lives for the daemon's entire uptime (spec.md §5 "single-threaded
    /// cooperative" loop, one event loop for the process) rather than
    /// being rebuilt per request, so each committed transaction's jobs
    /// are folded into the existing queue instead of replacing it.
    /// A job carried over from a prior transaction via cross-transaction
    /// merge (spec.md §4.5 step 3) keeps its original `JobId`; replace its
    /// entry in place rather than pushing a duplicate, so the merged
    /// `job_type`/`waits_for` actually take effect here too.
    pub fn enqueue(&mut self, jobs: Vec<Job>) {
        for job in jobs {
            self.runtime.entry(job.id).or_insert_with(JobRuntime::default);
            match self.jobs.iter_mut().find(|j| j.id == job.id) {
                Some(existing) => *existing = job,
                None => self.jobs.push(job),
            }
        }
    }

    pub fn is_done(&self) -> bool {
        self.jobs.iter().all(Job::is_finished)
    }

    fn job_index(&self, id: JobId) -> Option<usize> {
        self.jobs.iter().position(|j| j.id == id)
    }

    /// The job that currently owns `unit`'s live cgroup/main-pid, which may
    /// be an already-finished job: `Stop` runs as a fresh `Job` after the
    /// `Start` job that actually spawned the process has settled to `Done`,
    /// so signalling/reaping the right process means looking past
    /// `is_finished()` rather than only at the job driving this tick.
    fn job_with_live_process(&self, unit: UnitIdx) -> Option<JobId> {
        self.jobs
            .iter()
            .rev()
            .find(|j| j.unit == unit && self.runtime.get(&j.id).is_some_and(|r| r.main_pid.is_some()))
            .map(|j| j.id)
    }

    /// Earliest armed deadline across every job, for the event loop (spec.md
    /// §4.1) to compute how long it may sleep before the next timer fires.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.runtime.values().filter_map(|rt| rt.deadline.map(|(deadline, _)| deadline)).min()
    }

    /// Jobs ready to start: not yet finished, not already running, and
    /// every predecessor either finished successfully or failed along an
    /// edge that tolerates it (spec.md §4.2: `Wants`-derived expansion
    /// tolerates its target's failure; everything pulled in through
    /// `Requires`/`BindsTo` does not).
    fn runnable(&self) -> Vec<usize> {
        (0..self.jobs.len())
            .filter(|&i| {
                let job = &self.jobs[i];
                if job.is_finished() {
                    return false;
                }
                if self.runtime.get(&job.id).is_some_and(|r| r.main_pid.is_some()) {
                    return false;
                }
                job.waits_for.iter().all(|id| {
                    self.job_index(*id).map(|j| self.jobs[j].result.is_some()).unwrap_or(true)
                })
            })
            .collect()
    }

    /// One scheduling tick: start every runnable job, fire any expired
    /// deadlines, and propagate results to dependents. Returns the ids of
    /// jobs that finished this tick.
    pub fn tick<S: UnitConfigSource>(
        &mut self,
        graph: &mut UnitGraph<S>,
        env: &dyn ExecEnvironment,
        controller: &dyn ResourceController,
        fds: &FDSet,
    ) -> Result<Vec<JobId>, RunnerError> {
        // Settle any job whose predecessor already failed in a prior tick
        // before computing this tick's runnable set, so a doomed dependent
        // never gets a spurious chance to start.
        let mut finished = self.propagate(graph);

        for i in self.runnable() {
            let job_id = self.jobs[i].id;
            let unit = self.jobs[i].unit;
            let event = match self.jobs[i].job_type {
                JobType::Start | JobType::Restart | JobType::TryRestart => {
                    oj_core::UnitEvent::StartRequested
                }
                JobType::Stop => oj_core::UnitEvent::StopRequested,
                JobType::Reload | JobType::ReloadOrRestart => oj_core::UnitEvent::ReloadRequested,
                JobType::Verify => {
                    let ok = graph.get(unit).is_some_and(|u| u.active_state == ActiveState::Active);
                    self.finish(graph, job_id, if ok { JobResult::Done } else { JobResult::Failed });
                    finished.push(job_id);
                    continue;
                }
            };
            self.drive(graph, unit, event, env, controller, fds)?;
            self.settle_if_terminal(graph, i);
            if self.jobs[i].is_finished() {
                finished.push(job_id);
            }
        }

        self.check_deadlines(graph, env, controller, fds)?;
        finished.extend(self.propagate(graph));
        Ok(finished)
    }

    /// Records a job's outcome and, on the transition into "finished",
    /// releases its hold on the unit: clears `unit.job` (if it's still
    /// this job — a later merge may have moved it on) and drops `refs` by
    /// the one `install` added (spec.md §3 Lifecycle; without this,
    /// `Unit::gc_eligible`/`reset_failed` can never fire again for a unit
    /// that has ever run a job).
    fn finish<S: UnitConfigSource>(&mut self, graph: &mut UnitGraph<S>, id: JobId, result: JobResult) {
        let Some(idx) = self.job_index(id) else { return };
        if self.jobs[idx].result.is_some() {
            return;
        }
        self.jobs[idx].result = Some(result);
        let unit_idx = self.jobs[idx].unit;
        if let Some(unit) = graph.get_mut(unit_idx) {
            if unit.job == Some(id) {
                unit.job = None;
            }
            unit.refs = unit.refs.saturating_sub(1);
        }
    }

    /// Reports a reaped child back into the job that owns its unit, as
    /// either a main-process exit or a setup-command exit depending on
    /// whether this pid is the tracked main pid. A non-main exit that
    /// still has commands queued in `JobRuntime::pending_commands` spawns
    /// the next one directly instead of reaching the state machine — only
    /// the list's last command (or its first non-ignored failure) is
    /// actually forwarded as `CommandExited` (spec.md:157).
    pub fn on_child_exited<S: UnitConfigSource>(
        &mut self,
        graph: &mut UnitGraph<S>,
        env: &dyn ExecEnvironment,
        controller: &dyn ResourceController,
        fds: &FDSet,
        pid: nix::unistd::Pid,
        code: i32,
        signaled: bool,
    ) -> Result<(), RunnerError> {
        let Some((job_idx, is_main)) = self.jobs.iter().enumerate().find_map(|(i, j)| {
            let rt = self.runtime.get(&j.id)?;
            if rt.main_pid == Some(pid) {
                Some((i, rt.tracking_main_process))
            } else {
                None
            }
        }) else {
            return Ok(());
        };
        let job_id = self.jobs[job_idx].id;
        let unit = self.jobs[job_idx].unit;

        if !is_main {
            let ignore = self.runtime.get(&job_id).is_some_and(|rt| rt.current_ignore_failure);
            let effective_code = if ignore { 0 } else { code };
            if effective_code == 0 {
                let next_line = self.runtime.get_mut(&job_id).and_then(|rt| {
                    (!rt.pending_commands.is_empty()).then(|| rt.pending_commands.remove(0))
                });
                if let Some(line) = next_line {
                    if let Some((unit_id, settings)) = service_settings(graph, unit) {
                        self.spawn_next(graph, unit, &unit_id, &settings, &line, env, controller, fds, job_id, false)?;
                        return Ok(());
                    }
                }
            }
            let event = oj_core::UnitEvent::CommandExited { code: effective_code };
            self.drive(graph, unit, event, env, controller, fds)?;
            self.settle_if_terminal(graph, job_idx);
            self.propagate(graph);
            return Ok(());
        }

        let event = oj_core::UnitEvent::MainProcessExited { code, signaled };
        self.drive(graph, unit, event, env, controller, fds)?;
        self.settle_if_terminal(graph, job_idx);
        self.propagate(graph);
        Ok(())
    }

    fn check_deadlines<S: UnitConfigSource>(
        &mut self,
        graph: &mut UnitGraph<S>,
        env: &dyn ExecEnvironment,
        controller: &dyn ResourceController,
        fds: &FDSet,
    ) -> Result<(), RunnerError> {
        let now = self.clock.now();
        let expired: Vec<(usize, DeadlineKind)> = self
            .jobs
            .iter()
            .enumerate()
            .filter_map(|(i, j)| {
                let rt = self.runtime.get(&j.id)?;
                let (deadline, kind) = rt.deadline?;
                (now >= deadline).then_some((i, kind))
            })
            .collect();

        for (i, kind) in expired {
            let unit = self.jobs[i].unit;
            if let Some(rt) = self.runtime.get_mut(&self.jobs[i].id) {
                rt.deadline = None;
            }
            let event = match kind {
                DeadlineKind::Timeout => oj_core::UnitEvent::TimeoutExpired,
                DeadlineKind::Watchdog => oj_core::UnitEvent::WatchdogExpired,
                DeadlineKind::Restart => oj_core::UnitEvent::TimeoutExpired,
            };
            self.drive(graph, unit, event, env, controller, fds)?;
            self.settle_if_terminal(graph, i);
        }
        Ok(())
    }

    /// Once a unit's sub-state lands in a terminal `active_state` for the
    /// job's direction, record the job's result (spec.md §4.4 common
    /// invariants: `is_terminal()` states end an activation cycle).
    fn settle_if_terminal<S: UnitConfigSource>(&mut self, graph: &mut UnitGraph<S>, job_idx: usize) {
        let job = &self.jobs[job_idx];
        if job.is_finished() {
            return;
        }
        let Some(unit) = graph.get(job.unit) else {
            let id = job.id;
            self.finish(graph, id, JobResult::Invalid);
            return;
        };
        if !unit.active_state.is_terminal() {
            return;
        }
        let result = match job.job_type {
            JobType::Start | JobType::Restart | JobType::TryRestart => {
                if unit.active_state == ActiveState::Active {
                    JobResult::Done
                } else if unit.active_state == ActiveState::Failed {
                    JobResult::Failed
                } else {
                    return;
                }
            }
            JobType::Stop => {
                if unit.active_state == ActiveState::Inactive || unit.active_state == ActiveState::Failed {
                    JobResult::Done
                } else {
                    return;
                }
            }
            JobType::Reload | JobType::ReloadOrRestart => {
                if unit.active_state == ActiveState::Active {
                    JobResult::Done
                } else if unit.active_state == ActiveState::Failed {
                    JobResult::Failed
                } else {
                    return;
                }
            }
            JobType::Verify => return,
        };
        let id = job.id;
        self.finish(graph, id, result);
    }

    /// Cascade a finished job's outcome to jobs waiting on it (spec.md
    /// §4.2 transaction failure propagation): a failed predecessor drops
    /// its dependents to `JobResult::Dependency` unless their edge
    /// tolerates it, in which case they simply proceed (no-op here, since
    /// `runnable()` already only gates on finishedness, not success).
    fn propagate<S: UnitConfigSource>(&mut self, graph: &mut UnitGraph<S>) -> Vec<JobId> {
        let mut newly_finished = Vec::new();
        loop {
            let mut progressed = false;
            for i in 0..self.jobs.len() {
                let job = &self.jobs[i];
                if job.is_finished() {
                    continue;
                }
                let blocking_failure = job.waits_for.iter().any(|id| {
                    self.job_index(*id)
                        .and_then(|j| self.jobs[j].result)
                        .is_some_and(|r| matches!(r, JobResult::Failed | JobResult::Dependency | JobResult::Timeout))
                });
                if blocking_failure {
                    let id = self.jobs[i].id;
                    self.finish(graph, id, JobResult::Dependency);
                    newly_finished.push(id);
                    progressed = true;
                }
            }
            if !progressed {
                break;
            }
        }
        newly_finished
    }

    /// Route one event to `unit`'s state machine and execute the effects
    /// it reports. Non-service kinds have no effects to run — their
    /// `advance()` is pure.
    fn drive<S: UnitConfigSource>(
        &mut self,
        graph: &mut UnitGraph<S>,
        unit_idx: UnitIdx,
        event: oj_core::UnitEvent,
        env: &dyn ExecEnvironment,
        controller: &dyn ResourceController,
        fds: &FDSet,
    ) -> Result<(), RunnerError> {
        let Some(unit) = graph.get(unit_idx) else {
            let job = self.jobs.iter().find(|j| j.unit == unit_idx).map(|j| j.id);
            return match job {
                Some(job) => Err(RunnerError::DanglingUnit { job }),
                None => Ok(()),
            };
        };

        if let SubState::Service(sub) = &unit.sub_state {
            let sub = *sub;
            let settings = match unit.config.as_ref().map(|c| &c.kind_settings) {
                Some(oj_unitconf::KindSettings::Service(s)) => s.clone(),
                _ => ServiceSettings::default(),
            };
            let unit_id = unit.id.clone();
            let transition = sub.advance(&settings, &event);
            let next = transition.next;

            for effect in &transition.effects {
                self.apply_service_effect(graph, unit_idx, &unit_id, &settings, effect, env, controller, fds)?;
            }

            if let Some(unit) = graph.get_mut(unit_idx) {
                unit.sub_state = SubState::Service(next);
                unit.active_state = next.active_state();
            }
            return Ok(());
        }

        let advanced = match &unit.sub_state {
            SubState::Target(s) => Some(oj_core::UnitBehavior::advance(s, &event)),
            SubState::Slice(s) => Some(oj_core::UnitBehavior::advance(s, &event)),
            SubState::Socket(s) => Some(oj_core::UnitBehavior::advance(s, &event)),
            SubState::Mount(s) => Some(oj_core::UnitBehavior::advance(s, &event)),
            SubState::Timer(s) => Some(oj_core::UnitBehavior::advance(s, &event)),
            SubState::Scope(_) | SubState::Service(_) => None,
        };
        if let Some(advanced) = advanced {
            if let Some(unit) = graph.get_mut(unit_idx) {
                unit.active_state = advanced.next.active_state();
                unit.sub_state = advanced.next;
            }
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn apply_service_effect<S: UnitConfigSource>(
        &mut self,
        graph: &mut UnitGraph<S>,
        unit_idx: UnitIdx,
        unit_id: &str,
        settings: &ServiceSettings,
        effect: &ServiceEffect,
        env: &dyn ExecEnvironment,
        controller: &dyn ResourceController,
        fds: &FDSet,
    ) -> Result<(), RunnerError> {
        let job_id = self.jobs.iter().find(|j| j.unit == unit_idx && !j.is_finished()).map(|j| j.id);

        match effect {
            ServiceEffect::RunExecStartPre => {
                self.spawn_first(graph, unit_idx, unit_id, settings, &settings.exec_start_pre, env, controller, fds, job_id, false)?;
            }
            ServiceEffect::RunExecStart => {
                // Everything except `Type=oneshot` treats `ExecStart=` as the
                // long-running main process (its exit is `MainProcessExited`);
                // a oneshot's `ExecStart=` is itself the awaited command
                // (`CommandExited`, per the `(Start, CommandExited{0})`
                // transition to `Exited`).
                let is_main = settings.service_type != oj_unitconf::service::ServiceType::Oneshot;
                self.spawn_first(graph, unit_idx, unit_id, settings, &settings.exec.exec_start, env, controller, fds, job_id, is_main)?;
                if matches!(settings.service_type, oj_unitconf::service::ServiceType::Simple | oj_unitconf::service::ServiceType::Exec) {
                    // These types are ready the instant the process is
                    // spawned; re-enter the state machine immediately
                    // rather than waiting on an external signal.
                    self.drive(graph, unit_idx, oj_core::UnitEvent::ReadySignaled, env, controller, fds)?;
                }
            }
            ServiceEffect::RunExecStartPost => {
                self.spawn_first(graph, unit_idx, unit_id, settings, &settings.exec_start_post, env, controller, fds, job_id, false)?;
            }
            ServiceEffect::RunExecReload => {
                let cmds: Vec<String> = settings.exec_reload.iter().cloned().collect();
                self.spawn_first(graph, unit_idx, unit_id, settings, &cmds, env, controller, fds, job_id, false)?;
            }
            ServiceEffect::RunExecStop => {
                self.spawn_first(graph, unit_idx, unit_id, settings, &settings.exec_stop, env, controller, fds, job_id, false)?;
            }
            ServiceEffect::RunExecStopPost => {
                self.spawn_first(graph, unit_idx, unit_id, settings, &settings.exec_stop_post, env, controller, fds, job_id, false)?;
            }
            ServiceEffect::SendSignal(sig) => {
                if let Some(live) = self.job_with_live_process(unit_idx) {
                    if let Some(rt) = self.runtime.get(&live) {
                        if let Some(handle) = &rt.cgroup {
                            if let Ok(signal) = nix::sys::signal::Signal::try_from(*sig) {
                                let _ = oj_exec::freeze_signal_thaw(controller, handle, signal);
                            }
                        }
                    }
                }
            }
            ServiceEffect::ArmTimeout(d) => self.arm(job_id, DeadlineKind::Timeout, *d),
            ServiceEffect::ArmWatchdog(d) => self.arm(job_id, DeadlineKind::Watchdog, *d),
            ServiceEffect::ArmRestart(d) => self.arm(job_id, DeadlineKind::Restart, *d),
            ServiceEffect::CancelTimers => {
                if let Some(job_id) = job_id {
                    if let Some(rt) = self.runtime.get_mut(&job_id) {
                        rt.deadline = None;
                    }
                }
            }
            ServiceEffect::ReapMainProcess => {
                if let Some(live) = self.job_with_live_process(unit_idx) {
                    if let Some(rt) = self.runtime.get_mut(&live) {
                        rt.main_pid = None;
                    }
                }
            }
            ServiceEffect::ReportFailed => {
                if let Some(unit) = graph.get_mut(unit_idx) {
                    unit.failed_latch = true;
                }
            }
            ServiceEffect::ClearFailedLatch => {
                if let Some(unit) = graph.get_mut(unit_idx) {
                    unit.failed_latch = false;
                }
            }
        }
        Ok(())
    }

    fn arm(&mut self, job_id: Option<JobId>, kind: DeadlineKind, duration: std::time::Duration) {
        let Some(job_id) = job_id else { return };
        let deadline = self.clock.now() + duration;
        self.runtime.entry(job_id).or_default().deadline = Some((deadline, kind));
    }

    /// `ExecStartPre=`/`ExecStartPost=`/`ExecStop=`/`ExecStopPost=`/
    /// `ExecReload=` (and a `Type=oneshot` unit's own `ExecStart=`) are
    /// each a list of command lines that must run in sequence, each
    /// exiting 0 (or being `-`-prefixed) before the next starts (spec.md
    /// §157). This spawns the list's first command and stashes the rest
    /// in `JobRuntime::pending_commands`; `on_child_exited` spawns each
    /// remaining entry in turn as the previous one reaps.
    #[allow(clippy::too_many_arguments)]
    fn spawn_first<S: UnitConfigSource>(
        &mut self,
        graph: &UnitGraph<S>,
        unit_idx: UnitIdx,
        unit_id: &str,
        settings: &ServiceSettings,
        commands: &[String],
        env: &dyn ExecEnvironment,
        controller: &dyn ResourceController,
        fds: &FDSet,
        job_id: Option<JobId>,
        is_main_process: bool,
    ) -> Result<(), RunnerError> {
        let Some(job_id) = job_id else { return Ok(()) };
        let Some(first) = commands.first() else { return Ok(()) };
        if parse_command(first).is_none() {
            return Ok(());
        }
        self.runtime.entry(job_id).or_default().pending_commands = commands[1..].to_vec();
        self.spawn_next(graph, unit_idx, unit_id, settings, first, env, controller, fds, job_id, is_main_process)
    }

    /// Spawn one command from a hook/list phase and record it as the
    /// job's live process. `is_main_process` is only ever true for the
    /// very first command of a non-oneshot `ExecStart=` — every other
    /// call site passes `false`, since everything else in a list is
    /// always awaited as `CommandExited`.
    #[allow(clippy::too_many_arguments)]
    fn spawn_next<S: UnitConfigSource>(
        &mut self,
        graph: &UnitGraph<S>,
        unit_idx: UnitIdx,
        unit_id: &str,
        settings: &ServiceSettings,
        line: &str,
        env: &dyn ExecEnvironment,
        controller: &dyn ResourceController,
        fds: &FDSet,
        job_id: JobId,
        is_main_process: bool,
    ) -> Result<(), RunnerError> {
        let Some(command) = parse_command(line) else { return Ok(()) };
        let _ = graph.get(unit_idx);

        let context = env.context_for(unit_id, settings);
        let parameters = env.parameters_for(unit_id);
        let ignore_failure = command.ignore_failure;
        let rt = self.runtime.entry(job_id).or_default();

        match oj_exec::spawn(&command, &context, &parameters, &rt.exec, controller, fds) {
            Ok(Spawned { pid, cgroup }) => {
                rt.main_pid = Some(pid);
                rt.tracking_main_process = is_main_process;
                rt.current_ignore_failure = ignore_failure;
                rt.cgroup = Some(cgroup);
                Ok(())
            }
            Err(e) => Err(translate_spawn_error(e).into()),
        }
    }
}

/// Looks up a unit's `ServiceSettings` by index, for the mid-list
/// continuation in `on_child_exited` which only has a `UnitIdx`, not the
/// settings `drive` already resolved when it started this phase.
fn service_settings<S: UnitConfigSource>(graph: &UnitGraph<S>, unit_idx: UnitIdx) -> Option<(String, ServiceSettings)> {
    let unit = graph.get(unit_idx)?;
    match unit.config.as_ref().map(|c| &c.kind_settings) {
        Some(oj_unitconf::KindSettings::Service(s)) => Some((unit.id.clone(), s.clone())),
        _ => None,
    }
}

fn translate_spawn_error(e: oj_exec::RuntimeError) -> EngineRuntimeError {
    match e {
        oj_exec::RuntimeError::SpawnFailed { phase, errno, .. } => {
            EngineRuntimeError::SpawnFailed { phase: phase.to_string(), errno }
        }
        oj_exec::RuntimeError::Timeout { substate } => EngineRuntimeError::Timeout { substate },
        oj_exec::RuntimeError::WatchdogExpired => EngineRuntimeError::WatchdogExpired,
        oj_exec::RuntimeError::OomKilled => EngineRuntimeError::OomKilled,
        oj_exec::RuntimeError::CgroupAttachFailed { .. } => EngineRuntimeError::CgroupAttachFailed,
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
