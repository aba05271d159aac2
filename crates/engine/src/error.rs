// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy for transaction building and job execution (spec.md §7).

use oj_core::JobId;
use thiserror::Error;

/// Why a transaction could not be built or committed (spec.md §4.5).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransactionError {
    #[error("job conflicts with an existing job on {unit:?}")]
    Conflict { unit: String },

    #[error("dependency cycle through {path:?}")]
    CycleFound { path: Vec<String> },

    #[error("could not resolve dependency {name:?}")]
    UnresolvedDependency { name: String },

    #[error("requisite unit {unit:?} is not active")]
    RequisiteInactive { unit: String },

    #[error("unit {unit:?} is masked")]
    MaskedUnit { unit: String },

    #[error("condition failed for unit {unit:?}")]
    ConditionFailed { unit: String },

    #[error("transaction refused: {reason}")]
    Refused { reason: String },
}

/// Failure during job execution once a transaction has been committed
/// (spec.md §7 RuntimeError).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("spawn failed in phase {phase:?}: errno {errno}")]
    SpawnFailed { phase: String, errno: i32 },

    #[error("timed out in sub-state {substate:?}")]
    Timeout { substate: String },

    #[error("watchdog expired")]
    WatchdogExpired,

    #[error("killed by the OOM reaper")]
    OomKilled,

    #[error("failed to attach to the unit's resource group")]
    CgroupAttachFailed,
}

/// Errors surfaced by the job runner itself, as opposed to the unit's own
/// runtime failure (above).
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("job {job:?} references a unit that no longer exists")]
    DanglingUnit { job: JobId },

    #[error(transparent)]
    Transaction(#[from] TransactionError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
