// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `UnitBehavior` seam (spec.md §9 REDESIGN FLAGS): instead of giving
//! each unit kind its own vtable-dispatched type, every kind's transition
//! logic lives behind one function per [`crate::state::SubState`] variant
//! ([`crate::state::service::ServiceSubState::advance`] and friends), and
//! this trait is the uniform entry point `oj-engine`'s job runner calls
//! without needing to match on [`crate::unit::UnitKind`] itself.

use crate::job::JobType;
use crate::state::{SubState, UnitEvent};

/// One transition step, kind-erased: a new sub-state plus a count of
/// effects the caller still needs to interpret (kind-specific, so this
/// trait only reports *that* something must run, not *what* — callers
/// downcast `next`/`prev` via `match` when they need the effect list).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advanced {
    pub next: SubState,
}

/// Implemented once per unit kind's sub-state enum; `oj-engine::runner`
/// calls this instead of matching on `UnitKind` at the call site.
pub trait UnitBehavior {
    fn advance(&self, event: &UnitEvent) -> Advanced;

    /// Job types this kind can directly service without the engine
    /// rewriting them (e.g. sockets never see `Reload`).
    fn supports(&self, job_type: JobType) -> bool;
}

#[cfg(test)]
#[path = "behavior_tests.rs"]
mod tests;
