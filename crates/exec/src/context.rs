// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The declarative execution environment for a service-like unit
//! (spec.md §3 `ExecContext`/`ExecRuntime`, §4.7).
//!
//! `ExecContext` is immutable per unit load — it's the translation of a
//! unit's `[Service]`/`[Socket]` settings into the shape the spawn
//! pipeline consumes. `ExecRuntime` is the mutable, per-invocation
//! counterpart: state that must survive across a unit's successive
//! restarts (a shared network namespace fd, allocated scratch dirs) but
//! not across the unit's own lifetime.

use oj_storage::FDSet;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Namespace isolation flags, one bit per kind (spec.md §4.7 step 2:
/// "mount, user, pid, net, uts, ipc, cgroup").
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NamespaceFlags {
    pub mount: bool,
    pub user: bool,
    pub pid: bool,
    pub net: bool,
    pub uts: bool,
    pub ipc: bool,
    pub cgroup: bool,
}

/// One command in a unit's `ExecStartPre=`/`ExecStart=`/`ExecStartPost=`/
/// `ExecStop=`/`ExecStopPost=` list.
#[derive(Debug, Clone)]
pub struct ExecCommand {
    pub path: PathBuf,
    pub argv: Vec<String>,
    /// `-` prefix on the unit-file command line: a nonzero exit is not a
    /// failure.
    pub ignore_failure: bool,
}

impl ExecCommand {
    pub fn new(path: impl Into<PathBuf>, argv: Vec<String>) -> Self {
        Self { path: path.into(), argv, ignore_failure: false }
    }
}

/// A path entry in the mount view assembly (spec.md §4.7 step 2: "bind
/// mounts and tmpfses in a precisely ordered sequence"). Application
/// order is significant; see [`ExecContext::mount_view`]'s doc comment.
#[derive(Debug, Clone)]
pub enum MountEntry {
    ReadOnlyPath(PathBuf),
    InaccessiblePath(PathBuf),
    BindMount { source: PathBuf, target: PathBuf, read_only: bool },
    Tmpfs { target: PathBuf, size_bytes: Option<u64> },
}

/// The full declarative environment for a unit's invocations (spec.md §3
/// `ExecContext`). Built once at unit load; a config reload replaces it
/// wholesale rather than mutating fields in place.
#[derive(Debug, Clone)]
pub struct ExecContext {
    pub user: Option<String>,
    pub group: Option<String>,
    pub supplementary_groups: Vec<String>,
    pub working_directory: PathBuf,
    /// `Environment=` accumulates across repeated keys (already merged by
    /// the loader collaborator per spec.md §6); last-one-wins keys are
    /// resolved before this struct exists.
    pub environment: BTreeMap<String, String>,
    pub namespaces: NamespaceFlags,
    /// Ordered mount-view operations. Invariant (spec.md §4.7): outermost
    /// roots first, inaccessible-path shadowing last, so a later
    /// recursive read-only remount cannot be undone by an earlier one.
    pub mount_view: Vec<MountEntry>,
    pub capability_bounding_set: Vec<String>,
    pub ambient_capabilities: Vec<String>,
    pub no_new_privileges: bool,
    pub rlimits: BTreeMap<String, (u64, u64)>,
    pub oom_score_adjust: Option<i32>,
    /// `CPUWeight=`/`IOWeight=` (spec.md §4.7 step 2 "IO/CPU weights"):
    /// applied to the unit's own cgroup (`cpu.weight`/`io.weight`) when
    /// it's created, not to the process itself — a cgroup v2 controller
    /// knob, not a `prctl`/syscall one.
    pub cpu_weight: Option<u64>,
    pub io_weight: Option<u64>,
    pub scheduling_policy: Option<String>,
    pub scheduling_priority: Option<i32>,
    /// Device nodes this unit may access (spec.md §4.7 "device allow-list").
    pub device_allow: Vec<String>,
    pub seccomp_profile: Option<String>,
    pub selinux_label: Option<String>,
    pub tty: Option<PathBuf>,
    pub stdin: StdioTarget,
    pub stdout: StdioTarget,
    pub stderr: StdioTarget,
    /// Paths to credential files bind-mounted read-only into the unit's
    /// private `/run/credentials/<unit>` (systemd's `LoadCredential=`
    /// analogue).
    pub credentials: BTreeMap<String, PathBuf>,
    pub watchdog_usec: Option<u64>,
    pub timeout_start_usec: Option<u64>,
    pub timeout_stop_usec: Option<u64>,
}

impl Default for ExecContext {
    fn default() -> Self {
        Self {
            user: None,
            group: None,
            supplementary_groups: Vec::new(),
            working_directory: PathBuf::from("/"),
            environment: BTreeMap::new(),
            namespaces: NamespaceFlags::default(),
            mount_view: Vec::new(),
            capability_bounding_set: Vec::new(),
            ambient_capabilities: Vec::new(),
            no_new_privileges: true,
            rlimits: BTreeMap::new(),
            oom_score_adjust: None,
            cpu_weight: None,
            io_weight: None,
            scheduling_policy: None,
            scheduling_priority: None,
            device_allow: Vec::new(),
            seccomp_profile: None,
            selinux_label: None,
            tty: None,
            stdin: StdioTarget::Null,
            stdout: StdioTarget::Inherit,
            stderr: StdioTarget::Inherit,
            credentials: BTreeMap::new(),
            watchdog_usec: None,
            timeout_start_usec: None,
            timeout_stop_usec: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StdioTarget {
    #[default]
    Inherit,
    Null,
    Tty,
    /// An fd already held open in the accompanying [`FDSet`], by index.
    Fd(usize),
    Journal,
}

/// Per-invocation parameters that vary between calls sharing the same
/// `ExecContext` (spec.md §4.7's `ExecParameters`): which command in the
/// unit's list is being run right now, and the cgroup it's joining.
#[derive(Debug, Clone)]
pub struct ExecParameters {
    pub cgroup_path: String,
    /// `NOTIFY_SOCKET` path handed to `Type=notify` services (spec.md §6).
    pub notify_socket: Option<PathBuf>,
    pub runtime_directory: PathBuf,
}

/// Mutable, per-invocation state that must outlive a single `execve()`
/// call but not the unit's own lifetime (spec.md §3 `ExecRuntime`).
/// Created on first start, torn down when the unit returns to `inactive`
/// and its last reference drops.
#[derive(Default)]
pub struct ExecRuntime {
    /// Scratch directories allocated for this invocation's private
    /// `/tmp`, `/var/tmp`, credential mounts.
    pub temp_dirs: Vec<PathBuf>,
    /// Network/IPC namespace fds pinned so successive invocations of the
    /// same unit can share them (spec.md §4.7 step 2).
    pub shared_namespaces: FDSet,
    pub credential_mounts: Vec<PathBuf>,
}

impl ExecRuntime {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
