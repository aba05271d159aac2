// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Mount (and swap) unit sub-state (spec.md §4.4). Mounts are unusual in
//! that their ground truth lives in the kernel (`/proc/self/mountinfo`),
//! not in a process this manager spawns — `ExternalStateObserved` is the
//! normal path to `Mounted`/`Dead` here, `StartRequested` only covers the
//! manager-initiated `mount(8)` invocation path.

use super::UnitEvent;
use crate::behavior::{Advanced, UnitBehavior};
use crate::job::JobType;
use crate::unit::ActiveState;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MountSubState {
    Dead,
    Mounting,
    MountingDone,
    Mounted,
    Remounting,
    Unmounting,
    MountingSigterm,
    MountingSigkill,
    RemountingSigterm,
    RemountingSigkill,
    UnmountingSigterm,
    UnmountingSigkill,
    Failed,
}

impl MountSubState {
    pub fn active_state(self) -> ActiveState {
        use MountSubState::*;
        match self {
            Dead => ActiveState::Inactive,
            Mounting | MountingDone => ActiveState::Activating,
            Mounted => ActiveState::Active,
            Remounting => ActiveState::Reloading,
            Unmounting | MountingSigterm | MountingSigkill | RemountingSigterm
            | RemountingSigkill | UnmountingSigterm | UnmountingSigkill => {
                ActiveState::Deactivating
            }
            Failed => ActiveState::Failed,
        }
    }

    /// `StartRequested`/`StopRequested` cover the manager-initiated
    /// `mount(8)`/`umount(8)` invocation path; `ExternalStateObserved`
    /// (fed by a `/proc/self/mountinfo` poller) is what actually confirms
    /// the kernel-side result, so every phase here waits for one before
    /// calling itself done.
    pub fn advance(self, event: &UnitEvent) -> Self {
        use MountSubState::*;
        use UnitEvent::*;
        match (self, event) {
            (Dead, StartRequested) => Mounting,
            (Mounting, CommandExited { code: 0 }) => MountingDone,
            (Mounting, CommandExited { code: _ }) | (Mounting, TimeoutExpired) => {
                MountingSigterm
            }
            (MountingDone, ExternalStateObserved) => Mounted,
            (Dead, ExternalStateObserved) => Mounted,
            (Mounted, ReloadRequested) => Remounting,
            (Remounting, CommandExited { code: 0 }) => Mounted,
            (Remounting, CommandExited { code: _ }) => RemountingSigterm,
            (Mounted, StopRequested) => Unmounting,
            (Unmounting, CommandExited { .. }) | (Unmounting, ExternalStateObserved) => Dead,
            (MountingSigterm, TimeoutExpired) => MountingSigkill,
            (MountingSigterm, CommandExited { .. }) | (MountingSigkill, CommandExited { .. }) => {
                Failed
            }
            (RemountingSigterm, TimeoutExpired) => RemountingSigkill,
            (RemountingSigterm, CommandExited { .. })
            | (RemountingSigkill, CommandExited { .. }) => Mounted,
            (UnmountingSigterm, TimeoutExpired) => UnmountingSigkill,
            (UnmountingSigterm, CommandExited { .. })
            | (UnmountingSigkill, CommandExited { .. }) => Dead,
            (s, _) => s,
        }
    }
}

impl UnitBehavior for MountSubState {
    fn advance(&self, event: &UnitEvent) -> Advanced {
        Advanced { next: super::SubState::Mount(MountSubState::advance(*self, event)) }
    }

    fn supports(&self, job_type: JobType) -> bool {
        matches!(job_type, JobType::Start | JobType::Stop | JobType::Reload | JobType::Verify)
    }
}
