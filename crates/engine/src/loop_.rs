// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The event loop (spec.md §4.1): single-threaded, dispatching in the
//! fixed order signals > child-exit > timers > I/O > deferred > idle.
//!
//! Signal reception and socket I/O are owned by `oj-daemon`, which has the
//! only legitimate use for a `tokio` reactor in this workspace; this module
//! owns the two sources that are purely a function of the unit graph and
//! job queue — nonblocking child reaping (`SIGCHLD`'s actual effect, spec
//! §4.1 "each reaped pid is routed to the owning unit") and timer
//! expiry — and exposes [`EventLoop::next_deadline`] so the daemon's
//! `tokio::select!` knows how long it may sleep before the next one fires.

use crate::error::RunnerError;
use crate::runner::{ExecEnvironment, JobRunner};
use oj_core::{Clock, JobId, UnitGraph};
use oj_exec::ResourceController;
use oj_storage::FDSet;
use oj_unitconf::UnitConfigSource;
use std::time::Instant;

/// Wraps a [`JobRunner`] with the dispatch order spec.md §4.1 prescribes.
/// I/O (the Unix socket listener) and deferred/idle (garbage collection)
/// sources live in `oj-daemon`, which drives this loop from one `tokio`
/// task and interleaves them itself; `run_iteration` only ever covers the
/// child-exit and timer sources that belong to the job runner.
pub struct EventLoop<C: Clock> {
    runner: JobRunner<C>,
}

impl<C: Clock> EventLoop<C> {
    pub fn new(runner: JobRunner<C>) -> Self {
        Self { runner }
    }

    pub fn runner(&self) -> &JobRunner<C> {
        &self.runner
    }

    pub fn runner_mut(&mut self) -> &mut JobRunner<C> {
        &mut self.runner
    }

    /// Nonblocking-reap every exited child (spec.md §4.1: `SIGCHLD` "triggers
    /// nonblocking reaping of all ready children"), then run one job-runner
    /// tick (timers + runnable jobs). Returns the ids of jobs that finished.
    pub fn run_iteration<S: UnitConfigSource>(
        &mut self,
        graph: &mut UnitGraph<S>,
        env: &dyn ExecEnvironment,
        controller: &dyn ResourceController,
        fds: &FDSet,
    ) -> Result<Vec<JobId>, RunnerError> {
        self.reap_children(graph, env, controller, fds)?;
        self.runner.tick(graph, env, controller, fds)
    }

    /// Drains every already-exited child with `waitpid(WNOHANG)` and routes
    /// each to the job runner. Never blocks: a loop with no exited children
    /// returns immediately, matching spec.md §4.1's "suspension points only
    /// inside event-loop iterations" — this is not one of them.
    fn reap_children<S: UnitConfigSource>(
        &mut self,
        graph: &mut UnitGraph<S>,
        env: &dyn ExecEnvironment,
        controller: &dyn ResourceController,
        fds: &FDSet,
    ) -> Result<(), RunnerError> {
        use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};

        loop {
            match waitpid(None, Some(WaitPidFlag::WNOHANG)) {
                Ok(WaitStatus::Exited(pid, code)) => {
                    self.runner.on_child_exited(graph, env, controller, fds, pid, code, false)?;
                }
                Ok(WaitStatus::Signaled(pid, signal, _)) => {
                    self.runner.on_child_exited(graph, env, controller, fds, pid, signal as i32, true)?;
                }
                Ok(WaitStatus::StillAlive) | Err(nix::errno::Errno::ECHILD) => break,
                Ok(_) => continue,
                Err(_) => break,
            }
        }
        Ok(())
    }

    /// Earliest deadline across every in-flight job's timers, or `None` if
    /// nothing is armed — the daemon sleeps up to this instant (never past
    /// it: spec.md §4.1 "timers fire at-or-after their deadline, never
    /// before") before the next loop iteration.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.runner.next_deadline()
    }
}

#[cfg(test)]
#[path = "loop_tests.rs"]
mod tests;
