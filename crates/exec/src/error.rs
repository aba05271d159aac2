// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy for the exec pipeline and resource-controller bridge
//! (spec.md §4.7, §4.8, §7).

use thiserror::Error;

/// The spawn phase a [`RuntimeError::SpawnFailed`] occurred in, carried
/// back from the setup child over the exec-result pipe (spec.md §4.7:
/// "the pipe carries a typed error (phase, errno, optional string)").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnPhase {
    Cgroup,
    OomScore,
    SchedPolicy,
    Credentials,
    Namespaces,
    MountView,
    Capabilities,
    Seccomp,
    FdRenumber,
    Execve,
}

oj_core::simple_display! {
    SpawnPhase {
        Cgroup => "cgroup",
        OomScore => "oom-score",
        SchedPolicy => "sched-policy",
        Credentials => "credentials",
        Namespaces => "namespaces",
        MountView => "mount-view",
        Capabilities => "capabilities",
        Seccomp => "seccomp",
        FdRenumber => "fd-renumber",
        Execve => "execve",
    }
}

/// Failures in the spawn pipeline and the unit's running invocation
/// (spec.md §7 `RuntimeError`).
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("spawn failed in phase {phase} (errno {errno}){}", extra.as_ref().map(|s| format!(": {s}")).unwrap_or_default())]
    SpawnFailed { phase: SpawnPhase, errno: i32, extra: Option<String> },

    #[error("operation timed out in sub-state {substate:?}")]
    Timeout { substate: String },

    #[error("watchdog expired without a notify refresh")]
    WatchdogExpired,

    #[error("process was killed by the OOM killer")]
    OomKilled,

    #[error("cgroup attach failed for pid {pid}: {reason}")]
    CgroupAttachFailed { pid: i32, reason: String },
}

#[derive(Debug, Error)]
pub enum CgroupError {
    #[error("cgroup path {path:?} could not be created: {reason}")]
    Create { path: String, reason: String },

    #[error("attach of pid {pid} to {path:?} failed: {reason}")]
    Attach { path: String, pid: i32, reason: String },

    #[error("cgroup {path:?} not found")]
    NotFound { path: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
