// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Timer unit sub-state (spec.md §4.4). A timer itself never runs a
//! command — it sleeps until its next `TimerSpec` elapses, then asks the
//! engine to start its paired unit. `Elapsed` is transient: the engine
//! immediately re-arms into `Waiting` once the paired unit's job is queued.

use super::UnitEvent;
use crate::behavior::{Advanced, UnitBehavior};
use crate::job::JobType;
use crate::unit::ActiveState;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimerSubState {
    Dead,
    Waiting,
    Running,
    Elapsed,
    Failed,
}

impl TimerSubState {
    pub fn active_state(self) -> ActiveState {
        match self {
            TimerSubState::Dead => ActiveState::Inactive,
            TimerSubState::Waiting | TimerSubState::Running | TimerSubState::Elapsed => {
                ActiveState::Active
            }
            TimerSubState::Failed => ActiveState::Failed,
        }
    }

    /// `TimeoutExpired` here means "the engine's scheduler computed the
    /// next `TimerSpec` elapse and it has arrived", not a start/stop
    /// timeout. `Elapsed` is transient: the runner queues a job against
    /// the paired unit and immediately re-arms back to `Waiting`.
    pub fn advance(self, event: &UnitEvent) -> Self {
        use TimerSubState::*;
        use UnitEvent::*;
        match (self, event) {
            (Dead, StartRequested) => Waiting,
            (Waiting, TimeoutExpired) => Elapsed,
            (Elapsed, ExternalStateObserved) => Waiting,
            (Waiting, StopRequested) | (Elapsed, StopRequested) => Dead,
            (s, _) => s,
        }
    }
}

impl UnitBehavior for TimerSubState {
    fn advance(&self, event: &UnitEvent) -> Advanced {
        Advanced { next: super::SubState::Timer(TimerSubState::advance(*self, event)) }
    }

    fn supports(&self, job_type: JobType) -> bool {
        matches!(job_type, JobType::Start | JobType::Stop | JobType::Verify)
    }
}
