// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-unit-kind state machines (spec.md §4.4).
//!
//! Each kind has its own sub-state enum and its own transition function;
//! [`SubState`] is the sum type a `Unit` actually stores (REDESIGN FLAGS
//! in spec.md §9: a tagged union per kind instead of an inheritance-shaped
//! vtable). The job runner (`oj-engine::runner`) drives these via
//! [`UnitBehavior::on_job`]; nothing in this module spawns processes or
//! touches the kernel — that's `oj-exec`'s job, reached through the
//! [`JobContext`] the runner hands in.

pub mod mount;
pub mod service;
pub mod simple;
pub mod socket;
pub mod timer;

pub use mount::MountSubState;
pub use service::ServiceSubState;
pub use simple::{ScopeSubState, SliceSubState, TargetSubState};
pub use socket::SocketSubState;
pub use timer::TimerSubState;

use crate::unit::ActiveState;
use serde::{Deserialize, Serialize};

/// The kind-specific refinement of a unit's coarse `active_state`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubState {
    Service(ServiceSubState),
    Socket(SocketSubState),
    Mount(MountSubState),
    Target(TargetSubState),
    Timer(TimerSubState),
    Slice(SliceSubState),
    Scope(ScopeSubState),
}

impl Default for SubState {
    fn default() -> Self {
        SubState::Target(TargetSubState::Dead)
    }
}

impl SubState {
    /// The sub-state a freshly-loaded (never activated) unit of this kind
    /// starts in.
    pub fn initial_for(kind: crate::unit::UnitKind) -> Self {
        use crate::unit::UnitKind;
        match kind {
            UnitKind::Service => SubState::Service(ServiceSubState::Dead),
            UnitKind::Socket => SubState::Socket(SocketSubState::Dead),
            UnitKind::Mount | UnitKind::Swap => SubState::Mount(MountSubState::Dead),
            UnitKind::Target | UnitKind::Device | UnitKind::Path | UnitKind::Automount => {
                SubState::Target(TargetSubState::Dead)
            }
            UnitKind::Timer => SubState::Timer(TimerSubState::Dead),
            UnitKind::Slice => SubState::Slice(SliceSubState::Dead),
            UnitKind::Scope => SubState::Scope(ScopeSubState::Dead),
        }
    }

    /// Coarse `active_state` this sub-state maps to. The unit graph keeps
    /// `active_state` in lock-step with this on every transition.
    pub fn active_state(&self) -> ActiveState {
        match self {
            SubState::Service(s) => s.active_state(),
            SubState::Socket(s) => s.active_state(),
            SubState::Mount(s) => s.active_state(),
            SubState::Target(s) => s.active_state(),
            SubState::Timer(s) => s.active_state(),
            SubState::Slice(s) => s.active_state(),
            SubState::Scope(s) => s.active_state(),
        }
    }
}

/// An event delivered to a unit's state machine. Sourced from the job
/// runner (job start/stop/reload requests), the exec pipeline (child
/// exited, ready notification), the resource controller bridge (cgroup
/// emptied), or a timer (watchdog/restart/timeout expiry).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitEvent {
    StartRequested,
    StopRequested,
    ReloadRequested,
    /// A command in the current phase exited with this code (0 = success).
    CommandExited { code: i32 },
    /// The main process signaled readiness (`Type=notify` READY=1, or the
    /// forking parent's successful exit, or bus name acquisition).
    ReadySignaled,
    /// The main process exited unexpectedly while active.
    MainProcessExited { code: i32, signaled: bool },
    WatchdogExpired,
    TimeoutExpired,
    /// The resource controller bridge reports the cgroup fully drained.
    CgroupEmptied,
    /// Spontaneous external state change (e.g. mountinfo event, timer fire).
    ExternalStateObserved,
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
