// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Jobs: the unit of work the transaction engine schedules (spec.md §4).
//! A job wraps exactly one `(unit, JobType)` pair; `oj-engine` is
//! responsible for building coherent transactions of them and running
//! them against the unit graph this crate defines.

use crate::unit::UnitIdx;
use serde::{Deserialize, Serialize};

crate::define_id! {
    pub struct JobId;
}

/// The operation a job performs on its unit (spec.md §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobType {
    Start,
    Stop,
    Restart,
    /// Stop then start, but collapse to a single `Start` if the unit is
    /// already inactive (spec.md §4.1 edge case).
    TryRestart,
    Reload,
    /// Reload if possible, otherwise restart (spec.md §4.1 edge case).
    ReloadOrRestart,
    Verify,
}

impl JobType {
    /// Whether two job types queued for the same unit can be merged into
    /// one (spec.md §4.2 job merging rules), and which one survives.
    pub fn merge_with(self, other: JobType) -> Option<JobType> {
        use JobType::*;
        if self == other {
            return Some(self);
        }
        match (self, other) {
            (Start, Verify) | (Verify, Start) => Some(Start),
            (Stop, Verify) | (Verify, Stop) => Some(Stop),
            (Restart, Start) | (Start, Restart) => Some(Restart),
            (Restart, Stop) | (Stop, Restart) => Some(Restart),
            (Reload, Start) | (Start, Reload) => Some(Start),
            (ReloadOrRestart, Reload) | (Reload, ReloadOrRestart) => Some(ReloadOrRestart),
            (TryRestart, Start) | (Start, TryRestart) => Some(Start),
            _ => None,
        }
    }

    /// True for job types that can never be merged with a conflicting
    /// opposite-direction job without one of them being cancelled
    /// (`Start` vs `Stop` are never mergeable).
    pub fn conflicts_with(self, other: JobType) -> bool {
        use JobType::*;
        matches!(
            (self, other),
            (Start, Stop) | (Stop, Start) | (Restart, Stop) | (Stop, Restart)
        )
    }
}

crate::simple_display! {
    JobType {
        Start => "start",
        Stop => "stop",
        Restart => "restart",
        TryRestart => "try-restart",
        Reload => "reload",
        ReloadOrRestart => "reload-or-restart",
        Verify => "verify",
    }
}

/// How a transaction reacts to a conflicting job already in the queue
/// (spec.md §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobMode {
    /// Fail the whole transaction if it would conflict with a queued job.
    Fail,
    /// Replace conflicting queued jobs outright.
    Replace,
    /// Like `Replace`, but also cancels jobs that would be *implicitly*
    /// stopped as an irrelevant side effect (isolate semantics).
    ReplaceIrreversibly,
    /// Fail if the unit is currently merged into another running job
    /// rather than queuing a dependent one.
    Isolate,
    /// Queue without dependency expansion: exactly the named unit, no
    /// transitive `Requires`/`Wants` expansion.
    IgnoreDependencies,
    /// Cancel every other queued job before installing this transaction
    /// (spec.md §3 `JobMode`).
    Flush,
}

/// Outcome recorded against a finished job (spec.md §4.4/§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobResult {
    Done,
    Canceled,
    Timeout,
    Failed,
    /// Dropped because a dependency failed first (spec.md §4.2 transaction
    /// failure propagation).
    Dependency,
    Skipped,
    /// Lost its unit entirely, e.g. the unit was garbage collected out
    /// from under a still-running job (should not happen if `refs` is
    /// maintained correctly; recorded defensively).
    Invalid,
}

crate::simple_display! {
    JobResult {
        Done => "done",
        Canceled => "canceled",
        Timeout => "timeout",
        Failed => "failed",
        Dependency => "dependency",
        Skipped => "skipped",
        Invalid => "invalid",
    }
}

/// A single queued or running unit of work.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    pub unit: UnitIdx,
    pub job_type: JobType,
    pub mode: JobMode,
    /// Jobs in the same transaction that must complete (successfully,
    /// unless their edge tolerates failure) before this one runs.
    pub waits_for: Vec<JobId>,
    /// Jobs that requested this one and should be told the result.
    pub requested_by: Vec<JobId>,
    pub result: Option<JobResult>,
    /// Whether this job is the one the client directly requested, as
    /// opposed to one pulled in by dependency expansion (spec.md §3
    /// `Job`). Drives cycle-relaxation tie-breaks: an anchor job is never
    /// the one dropped to break a cycle.
    pub anchor: bool,
}

impl Job {
    pub fn new(unit: UnitIdx, job_type: JobType, mode: JobMode) -> Self {
        Self {
            id: JobId::generate(),
            unit,
            job_type,
            mode,
            waits_for: Vec::new(),
            requested_by: Vec::new(),
            result: None,
            anchor: false,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.result.is_some()
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
