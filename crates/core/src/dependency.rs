// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The closed set of dependency edge kinds between units (spec.md §3).
//!
//! Activation (`Requires`/`Wants`/`BindsTo`/...) and ordering (`Before`/
//! `After`) are independent axes: an edge only ever carries one kind, a
//! unit that wants both effects between the same pair of units gets two
//! edges.

use serde::{Deserialize, Serialize};

/// A dependency edge kind. Every kind has exactly one inverse, and the
/// unit graph always stores both directions (spec.md §3 edge symmetry
/// invariant).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DependencyKind {
    Requires,
    RequiredBy,
    Requisite,
    RequisiteOf,
    Wants,
    WantedBy,
    BindsTo,
    BoundBy,
    PartOf,
    ConsistsOf,
    Conflicts,
    ConflictedBy,
    Before,
    After,
    OnFailure,
    OnFailureOf,
    PropagatesReloadTo,
    PropagatesReloadFrom,
    PropagatesStopTo,
    PropagatesStopFrom,
    /// `A` is contained in slice `B`. `B` must be a slice.
    Slice,
}

impl DependencyKind {
    /// The kind stored on the other endpoint of the mirrored edge.
    pub fn inverse(self) -> DependencyKind {
        use DependencyKind::*;
        match self {
            Requires => RequiredBy,
            RequiredBy => Requires,
            Requisite => RequisiteOf,
            RequisiteOf => Requisite,
            Wants => WantedBy,
            WantedBy => Wants,
            BindsTo => BoundBy,
            BoundBy => BindsTo,
            PartOf => ConsistsOf,
            ConsistsOf => PartOf,
            Conflicts => ConflictedBy,
            ConflictedBy => Conflicts,
            Before => After,
            After => Before,
            OnFailure => OnFailureOf,
            OnFailureOf => OnFailure,
            PropagatesReloadTo => PropagatesReloadFrom,
            PropagatesReloadFrom => PropagatesReloadTo,
            PropagatesStopTo => PropagatesStopFrom,
            PropagatesStopFrom => PropagatesStopTo,
            Slice => ConsistsOf,
        }
    }

    /// True for edges that imply activation of the target when the
    /// source starts (as opposed to pure ordering or teardown kinds).
    pub fn implies_start(self) -> bool {
        matches!(self, DependencyKind::Requires | DependencyKind::Wants | DependencyKind::BindsTo)
    }

    /// True for edges whose failure on the target does *not* fail the source.
    pub fn tolerates_target_failure(self) -> bool {
        matches!(self, DependencyKind::Wants)
    }

    /// True for edges considered when computing the transitive closure
    /// of "kept alive" units under `isolate` (spec.md §4.5 step 2,
    /// §9 Open Question pinning).
    pub fn kept_on_isolate(self) -> bool {
        matches!(self, DependencyKind::Wants | DependencyKind::Requires | DependencyKind::BindsTo)
    }
}

/// Reason an edge was installed, used to scope `remove_dependency` during
/// config reload (spec.md §4.3 `add_dependency`/`remove_dependency`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DependencyReason {
    /// Declared directly in the unit's own config file.
    File,
    /// Synthesized by the loader for a unit kind's built-in semantics
    /// (e.g. sockets implicitly `Before` their paired service).
    Implicit,
    /// From a collaborator-supplied default (e.g. `DefaultDependencies=`).
    Default,
    /// Installed at runtime by a job (e.g. `OnFailure=` triggered after
    /// a unit failed), not reloaded from config.
    Runtime,
}

/// A bitmask-like selector over [`DependencyReason`] for bulk removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReasonMask(u8);

impl ReasonMask {
    pub const NONE: ReasonMask = ReasonMask(0);

    pub fn of(reason: DependencyReason) -> Self {
        ReasonMask(1 << reason as u8)
    }

    pub fn with(mut self, reason: DependencyReason) -> Self {
        self.0 |= 1 << reason as u8;
        self
    }

    pub fn contains(&self, reason: DependencyReason) -> bool {
        self.0 & (1 << reason as u8) != 0
    }

    /// Every reason except `Runtime` — used when reloading config: drop
    /// everything that came from the file/implicit/default layer, but
    /// leave runtime-installed edges (e.g. a live `OnFailure` trigger)
    /// alone.
    pub fn all_but_runtime() -> Self {
        ReasonMask::of(DependencyReason::File)
            .with(DependencyReason::Implicit)
            .with(DependencyReason::Default)
    }

    pub fn all() -> Self {
        Self::all_but_runtime().with(DependencyReason::Runtime)
    }
}

#[cfg(test)]
#[path = "dependency_tests.rs"]
mod tests;
