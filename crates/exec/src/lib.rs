// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The spawn pipeline and resource-controller bridge (spec.md §4.7, §4.8).
//!
//! Everything here is a collaborator the engine calls into, not a
//! scheduler: this crate forks processes and tracks cgroups, but has no
//! opinion about which unit should start next or in what order. Those
//! decisions live in `oj-engine`.

pub mod cgroup;
pub mod context;
pub mod error;
pub mod pipeline;

pub use cgroup::{freeze_signal_thaw, CgroupHandle, LinuxCgroupController, ResourceController};
pub use context::{
    ExecCommand, ExecContext, ExecParameters, ExecRuntime, MountEntry, NamespaceFlags, StdioTarget,
};
pub use error::{CgroupError, RuntimeError, SpawnPhase};
pub use pipeline::{spawn, Spawned};

#[cfg(any(test, feature = "test-support"))]
pub use cgroup::test_support;
