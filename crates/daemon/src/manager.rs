// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! [`ManagerApi`]: the semantic surface spec.md §6 describes as an IPC
//! method list (`StartUnit`, `ListUnits`, `Subscribe`, …). Wire framing
//! (D-Bus/Varlink) is an explicit Non-goal, so this crate never binds a
//! socket for it — `ManagerApi` is a plain in-process trait, and
//! `Manager` is the one implementation, wiring together the unit graph,
//! the event loop, the fd store, the cgroup controller, and the exec
//! environment translation that `oj-engine` deliberately leaves to the
//! daemon layer.

use crate::config_source::DirectoryConfigSource;
use crate::error::DaemonError;
use crate::exec_env::DaemonExecEnvironment;
use oj_core::{ActiveState, Job, JobId, JobMode, JobResult, JobType, LoadState, SystemClock, UnitGraph};
use oj_engine::loop_::EventLoop;
use oj_engine::runner::JobRunner;
use oj_engine::transaction::{build_transaction, install};
use oj_exec::LinuxCgroupController;
use oj_storage::{deserialize_job, deserialize_unit, restore_from_env, serialize_job, serialize_unit, FDSet, ReexecCoordinator};
use std::convert::Infallible;
use std::path::PathBuf;
use tokio::sync::broadcast;

/// Broadcast to every `Subscribe`r (spec.md §6). There is no per-client
/// `Unsubscribe` handle to track: a subscriber drops its
/// `broadcast::Receiver` when it's done, which is the whole of
/// `Unsubscribe`'s effect once there's no wire protocol to tear down.
#[derive(Debug, Clone)]
pub enum ManagerEvent {
    UnitChanged(String),
    JobChanged(JobId),
}

/// A flattened snapshot of one unit for `ListUnits` (spec.md §6).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitSummary {
    pub name: String,
    pub load_state: LoadState,
    pub active_state: ActiveState,
    pub sub_state: String,
    pub job: Option<JobId>,
}

/// A flattened snapshot of one job for `ListJobs` (spec.md §6).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSummary {
    pub id: JobId,
    pub unit: String,
    pub job_type: JobType,
    pub mode: JobMode,
    pub result: Option<JobResult>,
}

/// The semantic IPC surface (spec.md §6), minus the D-Bus/Varlink framing
/// spec.md's Non-goals exclude. Every mutating method returns the
/// anchor `JobId` a real transport would hand back to its caller.
pub trait ManagerApi {
    fn start_unit(&mut self, name: &str, mode: JobMode) -> Result<JobId, DaemonError>;
    fn stop_unit(&mut self, name: &str, mode: JobMode) -> Result<JobId, DaemonError>;
    fn restart_unit(&mut self, name: &str, mode: JobMode) -> Result<JobId, DaemonError>;
    fn reload_unit(&mut self, name: &str, mode: JobMode) -> Result<JobId, DaemonError>;
    fn reload_or_restart_unit(&mut self, name: &str, mode: JobMode) -> Result<JobId, DaemonError>;

    /// `ResetFailed(name | *)`: `None` resets every latched unit.
    fn reset_failed(&mut self, name: Option<&str>) -> Result<(), DaemonError>;

    fn list_units(&self) -> Vec<UnitSummary>;
    fn list_jobs(&self) -> Vec<JobSummary>;

    fn subscribe(&self) -> broadcast::Receiver<ManagerEvent>;

    /// `Reload`: re-read every already-loaded unit's config in place.
    fn reload(&mut self) -> Result<(), DaemonError>;
}

/// Owns the live unit graph, the single long-lived event loop, the fd
/// store, the cgroup bridge, and the exec-environment translation —
/// everything `oj-engine`/`oj-exec` need a collaborator for.
pub struct Manager {
    graph: UnitGraph<DirectoryConfigSource>,
    event_loop: EventLoop<SystemClock>,
    fds: FDSet,
    controller: LinuxCgroupController,
    env: DaemonExecEnvironment,
    reexec: ReexecCoordinator,
    events: broadcast::Sender<ManagerEvent>,
}

impl Manager {
    pub fn new(units_directory: PathBuf, runtime_directory: PathBuf, notify_socket_dir: PathBuf) -> Self {
        let graph = UnitGraph::new(DirectoryConfigSource::new(units_directory));
        let runner = JobRunner::new(Vec::new(), SystemClock);
        let (events, _) = broadcast::channel(256);
        Self {
            graph,
            event_loop: EventLoop::new(runner),
            fds: FDSet::new(),
            controller: LinuxCgroupController::new(runtime_directory.join("cgroup")),
            env: DaemonExecEnvironment::new(runtime_directory, notify_socket_dir),
            reexec: ReexecCoordinator::new(),
            events,
        }
    }

    /// Restore a unit graph's worth of jobs carried across a re-exec
    /// (spec.md §4.9 step (f)); `None` when this is a cold start, not a
    /// resumed one (`OJDOBSD_STATE_FD` was never set).
    ///
    /// Dependency edges are not among the restored fields — `get_or_load`
    /// below rebuilds them from the config source the same way a plain
    /// `Reload` does, so the record format only needs to carry what a
    /// fresh load can't recover: load/active/sub-state, the failed latch,
    /// the ref count, and any job still in flight.
    pub fn restore(&mut self) -> Result<bool, DaemonError> {
        let Some(records) = restore_from_env()? else { return Ok(false) };

        let mut job_records = Vec::new();
        for record in &records {
            match record.kind.as_str() {
                "unit" => {
                    let restored = deserialize_unit(record)?;
                    let idx = self
                        .graph
                        .get_or_load(&restored.id)
                        .map_err(|source| DaemonError::Load { name: restored.id.clone(), source })?;
                    if let Some(unit) = self.graph.get_mut(idx) {
                        unit.load_state = restored.load_state;
                        unit.active_state = restored.active_state;
                        unit.sub_state = restored.sub_state;
                        unit.failed_latch = restored.failed_latch;
                        unit.refs = restored.refs;
                        unit.cgroup_path = restored.cgroup_path;
                    }
                }
                "job" => job_records.push(deserialize_job(record)?),
                _ => {}
            }
        }

        let restored_jobs: Vec<Job> = job_records
            .into_iter()
            .filter_map(|restored| {
                let unit = self.graph.resolve(&restored.unit_name)?;
                Some(Job {
                    id: restored.id,
                    unit,
                    job_type: restored.job_type,
                    mode: restored.mode,
                    waits_for: restored.ordered_after,
                    requested_by: restored.requested_by,
                    result: restored.result,
                    anchor: false,
                })
            })
            .collect();
        for job in &restored_jobs {
            if let Some(unit) = self.graph.get_mut(job.unit) {
                unit.job = Some(job.id);
            }
        }
        self.event_loop.runner_mut().enqueue(restored_jobs);

        Ok(true)
    }

    /// Drives one `tokio::select!` iteration's worth of event-loop work;
    /// `main.rs` calls this between signal/timer branches.
    pub fn run_iteration(&mut self) -> Result<Vec<JobId>, DaemonError> {
        let finished = self.event_loop.run_iteration(&mut self.graph, &self.env, &self.controller, &self.fds)?;
        for id in &finished {
            let _ = self.events.send(ManagerEvent::JobChanged(*id));
        }
        Ok(finished)
    }

    /// The deferred/idle source spec.md §4.1's dispatch order reserves
    /// for garbage collection — `main.rs` drives this itself rather than
    /// `EventLoop::run_iteration`, since the event loop only owns the
    /// child-exit/timer sources (see `oj_engine::loop_`). Returns how many
    /// units were dropped; `UnitGraph::garbage_collect` already discards
    /// the `Unit` itself, so there's nothing left to name by the time it
    /// returns.
    pub fn collect_garbage(&mut self) -> usize {
        self.graph.garbage_collect().len()
    }

    pub fn next_deadline(&self) -> Option<std::time::Instant> {
        self.event_loop.next_deadline()
    }

    pub fn is_idle(&self) -> bool {
        self.event_loop.runner().is_done()
    }

    pub fn quiesce_for_reexec(&mut self) {
        self.reexec.quiesce();
    }

    /// Abandon a quiesce after a failed re-exec attempt (spec.md §7: a
    /// `SerializationError` here is fatal only to the attempt, not to the
    /// running manager) and resume accepting jobs.
    pub fn abort_reexec(&mut self) {
        self.reexec.abort();
    }

    /// Steps (c)-(e) of spec.md §4.9: snapshot every live unit and
    /// in-flight job into a record set, then `execve()` into `path`/`argv`
    /// carrying the snapshot across as an inherited memfd. Must only be
    /// called after [`quiesce_for_reexec`](Self::quiesce_for_reexec); on
    /// `Ok` this call never returns, since the process image is gone.
    pub fn begin_reexec(&self, path: &str, argv: &[String]) -> Result<Infallible, DaemonError> {
        let mut records = Vec::new();
        for idx in self.graph.all_indices() {
            if let Some(unit) = self.graph.get(idx) {
                records.push(serialize_unit(unit)?);
            }
        }
        for job in self.event_loop.runner().jobs() {
            if let Some(unit) = self.graph.get(job.unit) {
                records.push(serialize_job(job, &unit.id)?);
            }
        }
        let state_fd = self.reexec.snapshot(&records)?;
        Ok(self.reexec.exec_self(path, argv, &state_fd)?)
    }

    fn transition(&mut self, name: &str, job_type: JobType, mode: JobMode) -> Result<JobId, DaemonError> {
        let idx = self
            .graph
            .get_or_load(name)
            .map_err(|source| DaemonError::Load { name: name.to_string(), source })?;
        let txn = build_transaction(&self.graph, self.event_loop.runner().jobs(), idx, job_type, mode)?;
        let anchor = txn.anchor();
        let jobs = install(&mut self.graph, txn);
        self.event_loop.runner_mut().enqueue(jobs);
        let _ = self.events.send(ManagerEvent::UnitChanged(name.to_string()));
        Ok(anchor)
    }
}

impl ManagerApi for Manager {
    fn start_unit(&mut self, name: &str, mode: JobMode) -> Result<JobId, DaemonError> {
        self.transition(name, JobType::Start, mode)
    }

    fn stop_unit(&mut self, name: &str, mode: JobMode) -> Result<JobId, DaemonError> {
        self.transition(name, JobType::Stop, mode)
    }

    fn restart_unit(&mut self, name: &str, mode: JobMode) -> Result<JobId, DaemonError> {
        self.transition(name, JobType::Restart, mode)
    }

    fn reload_unit(&mut self, name: &str, mode: JobMode) -> Result<JobId, DaemonError> {
        self.transition(name, JobType::Reload, mode)
    }

    fn reload_or_restart_unit(&mut self, name: &str, mode: JobMode) -> Result<JobId, DaemonError> {
        self.transition(name, JobType::ReloadOrRestart, mode)
    }

    fn reset_failed(&mut self, name: Option<&str>) -> Result<(), DaemonError> {
        match name {
            None => self.graph.reset_failed_all(),
            Some(name) => {
                let idx = self.graph.resolve(name).ok_or_else(|| DaemonError::UnknownUnit(name.to_string()))?;
                self.graph.reset_failed(idx);
            }
        }
        Ok(())
    }

    fn list_units(&self) -> Vec<UnitSummary> {
        let mut out: Vec<UnitSummary> = self
            .graph
            .all_indices()
            .filter_map(|idx| self.graph.get(idx))
            .map(|unit| UnitSummary {
                name: unit.id.clone(),
                load_state: unit.load_state,
                active_state: unit.active_state,
                sub_state: format!("{:?}", unit.sub_state),
                job: unit.job,
            })
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }

    fn list_jobs(&self) -> Vec<JobSummary> {
        let mut out: Vec<JobSummary> = self
            .event_loop
            .runner()
            .jobs()
            .iter()
            .map(|job| JobSummary {
                id: job.id,
                unit: self.graph.get(job.unit).map(|u| u.id.clone()).unwrap_or_default(),
                job_type: job.job_type,
                mode: job.mode,
                result: job.result,
            })
            .collect();
        out.sort_by_key(|j| j.id.as_str().to_string());
        out
    }

    fn subscribe(&self) -> broadcast::Receiver<ManagerEvent> {
        self.events.subscribe()
    }

    fn reload(&mut self) -> Result<(), DaemonError> {
        let idxs: Vec<_> = self.graph.all_indices().collect();
        for idx in idxs {
            let name = self.graph.get(idx).map(|u| u.id.clone()).unwrap_or_default();
            self.graph.reload_unit(idx).map_err(|source| DaemonError::Load { name, source })?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
