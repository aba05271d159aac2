// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sub-state machines for unit kinds with no exec pipeline of their own:
//! targets (and the path/device/automount kinds that borrow the same
//! two-state shape), slices, and scopes. These never run a command —
//! `active_state` is driven entirely by dependency propagation or, for
//! scopes, by the lifetime of an externally-created cgroup.

use super::UnitEvent;
use crate::behavior::{Advanced, UnitBehavior};
use crate::job::JobType;
use crate::unit::ActiveState;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetSubState {
    Dead,
    Active,
}

impl TargetSubState {
    pub fn active_state(self) -> ActiveState {
        match self {
            TargetSubState::Dead => ActiveState::Inactive,
            TargetSubState::Active => ActiveState::Active,
        }
    }

    /// A target (and path/device/automount, which reuse this shape) has
    /// no exec pipeline of its own: `StartRequested`/`StopRequested` flip
    /// it directly, everything else leaves it untouched.
    pub fn advance(self, event: &UnitEvent) -> Self {
        match event {
            UnitEvent::StartRequested => TargetSubState::Active,
            UnitEvent::StopRequested => TargetSubState::Dead,
            _ => self,
        }
    }
}

impl UnitBehavior for TargetSubState {
    fn advance(&self, event: &UnitEvent) -> Advanced {
        Advanced { next: super::SubState::Target(TargetSubState::advance(*self, event)) }
    }

    fn supports(&self, job_type: JobType) -> bool {
        matches!(job_type, JobType::Start | JobType::Stop | JobType::Restart | JobType::Verify)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SliceSubState {
    Dead,
    Active,
}

impl SliceSubState {
    pub fn active_state(self) -> ActiveState {
        match self {
            SliceSubState::Dead => ActiveState::Inactive,
            SliceSubState::Active => ActiveState::Active,
        }
    }

    /// A slice activates as soon as it has one live member and deactivates
    /// when it has none (spec.md §3: slices have no exec pipeline, they
    /// are pure cgroup-tree scaffolding driven by their `ConsistsOf` set).
    pub fn advance(self, event: &UnitEvent) -> Self {
        match event {
            UnitEvent::StartRequested => SliceSubState::Active,
            UnitEvent::StopRequested => SliceSubState::Dead,
            _ => self,
        }
    }
}

impl UnitBehavior for SliceSubState {
    fn advance(&self, event: &UnitEvent) -> Advanced {
        Advanced { next: super::SubState::Slice(SliceSubState::advance(*self, event)) }
    }

    fn supports(&self, job_type: JobType) -> bool {
        matches!(job_type, JobType::Start | JobType::Stop | JobType::Verify)
    }
}

/// A scope has no start transition of its own (spec.md §3: it's created
/// already-running, wrapping a PID set handed in at creation time), but it
/// does have a running/stop-sigterm/stop-sigkill tail identical in shape
/// to a service's, since the manager still has to reap it cleanly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScopeSubState {
    Running,
    Abandoned,
    StopSigterm,
    StopSigkill,
    Dead,
    Failed,
}

impl ScopeSubState {
    pub fn active_state(self) -> ActiveState {
        match self {
            ScopeSubState::Running | ScopeSubState::Abandoned => ActiveState::Active,
            ScopeSubState::StopSigterm | ScopeSubState::StopSigkill => ActiveState::Deactivating,
            ScopeSubState::Dead => ActiveState::Inactive,
            ScopeSubState::Failed => ActiveState::Failed,
        }
    }
}
