// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Socket unit sub-state (spec.md §4.4). A socket's job is to own listening
//! file descriptors and hand them to its paired service on first
//! connection (`Accept=no`) or per-connection (`Accept=yes`); this module
//! only tracks the lifecycle of those descriptors, not their contents.

use super::UnitEvent;
use crate::behavior::{Advanced, UnitBehavior};
use crate::job::JobType;
use crate::unit::ActiveState;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SocketSubState {
    Dead,
    StartPre,
    StartChown,
    StartPost,
    /// Descriptors bound and (if `Accept=no`) being watched for activity.
    Listening,
    /// `Accept=yes`: at least one paired service instance is running.
    Running,
    StopPre,
    StopPreSigterm,
    StopPreSigkill,
    StopPost,
    FinalSigterm,
    FinalSigkill,
    Failed,
}

impl SocketSubState {
    pub fn active_state(self) -> ActiveState {
        use SocketSubState::*;
        match self {
            Dead => ActiveState::Inactive,
            StartPre | StartChown | StartPost => ActiveState::Activating,
            Listening | Running => ActiveState::Active,
            StopPre | StopPreSigterm | StopPreSigkill | StopPost | FinalSigterm | FinalSigkill => {
                ActiveState::Deactivating
            }
            Failed => ActiveState::Failed,
        }
    }

    /// A reduced form of the service machine (spec.md §4.4): this crate's
    /// `SocketSettings` carries no `ExecStartPre=`/`ExecStartPost=`
    /// equivalents, so the start/stop phases here collapse straight to
    /// `Listening`/`Dead` rather than walking the intermediate command
    /// phases a richer socket config would need.
    pub fn advance(self, event: &UnitEvent) -> Self {
        use SocketSubState::*;
        use UnitEvent::*;
        match (self, event) {
            (Dead, StartRequested) => Listening,
            (Listening, StopRequested) | (Running, StopRequested) => StopPost,
            (StopPost, CommandExited { code: 0 }) | (StopPost, ExternalStateObserved) => Dead,
            // `Accept=yes`: a connection arrived, the paired service
            // instance is running; it finishes and we go back to watching.
            (Listening, ExternalStateObserved) => Running,
            (Running, ExternalStateObserved) => Listening,
            (_, CgroupEmptied) => Dead,
            (s, _) => s,
        }
    }
}

impl UnitBehavior for SocketSubState {
    fn advance(&self, event: &UnitEvent) -> Advanced {
        Advanced { next: super::SubState::Socket(SocketSubState::advance(*self, event)) }
    }

    fn supports(&self, job_type: JobType) -> bool {
        matches!(job_type, JobType::Start | JobType::Stop | JobType::Restart | JobType::Verify)
    }
}
