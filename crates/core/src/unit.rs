// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Unit identity and coarse-grained lifecycle state (spec.md §3).
//!
//! `sub_state` (the kind-specific refinement) lives in [`crate::state`];
//! this module only carries the attributes shared by every unit kind.

use crate::dependency::{DependencyKind, DependencyReason};
use crate::job::JobId;
use crate::state::SubState;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Dense arena index for a loaded unit. Stable for the lifetime of the
/// unit object (a reload replaces `Unit::config` in place; it never
/// reassigns the index). Indices are reused by the garbage collector only
/// after the generation counter is bumped, so a stale `UnitIdx` held
/// across a GC sweep is detected rather than silently aliasing a new unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UnitIdx {
    pub(crate) slot: u32,
    pub(crate) generation: u32,
}

/// Tag identifying a unit's kind. Closed set per spec.md §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitKind {
    Service,
    Socket,
    Mount,
    Swap,
    Target,
    Path,
    Timer,
    Slice,
    Scope,
    Device,
    Automount,
}

impl UnitKind {
    /// The `.kind` suffix used in canonical unit names (`foo.service`, …).
    pub fn suffix(self) -> &'static str {
        match self {
            UnitKind::Service => "service",
            UnitKind::Socket => "socket",
            UnitKind::Mount => "mount",
            UnitKind::Swap => "swap",
            UnitKind::Target => "target",
            UnitKind::Path => "path",
            UnitKind::Timer => "timer",
            UnitKind::Slice => "slice",
            UnitKind::Scope => "scope",
            UnitKind::Device => "device",
            UnitKind::Automount => "automount",
        }
    }

    pub fn from_suffix(suffix: &str) -> Option<Self> {
        Some(match suffix {
            "service" => UnitKind::Service,
            "socket" => UnitKind::Socket,
            "mount" => UnitKind::Mount,
            "swap" => UnitKind::Swap,
            "target" => UnitKind::Target,
            "path" => UnitKind::Path,
            "timer" => UnitKind::Timer,
            "slice" => UnitKind::Slice,
            "scope" => UnitKind::Scope,
            "device" => UnitKind::Device,
            "automount" => UnitKind::Automount,
            _ => return None,
        })
    }

    /// Whether this kind can ever carry a `Requires`/`Wants`/`BindsTo`
    /// edge as the *source* of activation (spec.md §3 invariant: illegal
    /// edge kinds for a unit's kind are rejected at load, e.g. a device
    /// can't `Requires` anything).
    pub fn can_activate_dependencies(self) -> bool {
        !matches!(self, UnitKind::Device)
    }
}

crate::simple_display! {
    UnitKind {
        Service => "service",
        Socket => "socket",
        Mount => "mount",
        Swap => "swap",
        Target => "target",
        Path => "path",
        Timer => "timer",
        Slice => "slice",
        Scope => "scope",
        Device => "device",
        Automount => "automount",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoadState {
    Stub,
    Loaded,
    NotFound,
    BadSetting,
    Error,
    Masked,
    Merged,
}

crate::simple_display! {
    LoadState {
        Stub => "stub",
        Loaded => "loaded",
        NotFound => "not-found",
        BadSetting => "bad-setting",
        Error => "error",
        Masked => "masked",
        Merged => "merged",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActiveState {
    Inactive,
    Activating,
    Active,
    Reloading,
    Deactivating,
    Failed,
    Maintenance,
}

impl ActiveState {
    /// Terminal states per activation cycle (spec.md §4.4 common invariants).
    pub fn is_terminal(self) -> bool {
        matches!(self, ActiveState::Active | ActiveState::Inactive | ActiveState::Failed)
    }

    /// Membership in the owning slice's live set (spec.md §3 invariant).
    pub fn is_live_member(self) -> bool {
        matches!(self, ActiveState::Active | ActiveState::Activating | ActiveState::Reloading)
    }
}

crate::simple_display! {
    ActiveState {
        Inactive => "inactive",
        Activating => "activating",
        Active => "active",
        Reloading => "reloading",
        Deactivating => "deactivating",
        Failed => "failed",
        Maintenance => "maintenance",
    }
}

/// An addressable object supervised by the manager.
///
/// `sub_state` is a tagged union over kind rather than a generic parameter
/// (spec.md §9 REDESIGN FLAGS): the graph stores every unit kind in one
/// arena, so a `Unit<C, S>` generic over its config/sub-state types can't
/// be homogeneously stored without type erasure. A sum type per kind plus
/// a `UnitBehavior` trait (see [`crate::behavior`]) gets the same
/// polymorphism without it.
#[derive(Debug, Clone)]
pub struct Unit {
    pub id: String,
    pub aliases: HashSet<String>,
    pub kind: UnitKind,
    pub load_state: LoadState,
    pub active_state: ActiveState,
    pub sub_state: SubState,
    /// Outgoing edges, keyed by kind. Mirrored automatically by the graph.
    pub dependencies: HashMap<DependencyKind, HashSet<UnitIdx>>,
    pub reverse_dependencies: HashMap<DependencyKind, HashSet<UnitIdx>>,
    /// Reason each forward edge was installed (used by `remove_dependency`).
    pub(crate) dependency_reasons: HashMap<(DependencyKind, UnitIdx), DependencyReason>,
    pub job: Option<JobId>,
    pub config: Option<oj_unitconf::UnitConfig>,
    pub cgroup_path: Option<String>,
    /// Held-open references that prevent garbage collection (e.g. an
    /// in-flight job, a client `Subscribe`, a dependent unit's runtime).
    pub refs: u32,
    /// Latched failure flag independent of `active_state`, cleared only
    /// by `ResetFailed` or a successful start (spec.md §4.4).
    pub failed_latch: bool,
}

impl Unit {
    pub fn new_stub(id: String, kind: UnitKind) -> Self {
        let sub_state = SubState::initial_for(kind);
        let active_state = sub_state.active_state();
        Self {
            id,
            aliases: HashSet::new(),
            kind,
            load_state: LoadState::Stub,
            active_state,
            sub_state,
            dependencies: HashMap::new(),
            reverse_dependencies: HashMap::new(),
            dependency_reasons: HashMap::new(),
            job: None,
            config: None,
            cgroup_path: None,
            refs: 0,
            failed_latch: false,
        }
    }

    pub fn deps(&self, kind: DependencyKind) -> impl Iterator<Item = UnitIdx> + '_ {
        self.dependencies.get(&kind).into_iter().flatten().copied()
    }

    pub fn reverse_deps(&self, kind: DependencyKind) -> impl Iterator<Item = UnitIdx> + '_ {
        self.reverse_dependencies.get(&kind).into_iter().flatten().copied()
    }

    /// Eligible for garbage collection: inactive, no job, no refs, no
    /// dependents still requiring its presence (spec.md §3 Lifecycle).
    pub fn gc_eligible(&self) -> bool {
        self.active_state == ActiveState::Inactive && self.job.is_none() && self.refs == 0
    }
}

#[cfg(test)]
#[path = "unit_tests.rs"]
mod tests;
