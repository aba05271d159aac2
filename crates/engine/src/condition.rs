// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cheap, transaction-time condition evaluation (spec.md §4.5 step 5:
//! "conditions that can be cheaply evaluated now; expensive ones defer to
//! runtime"). `ConditionPathExists=` is a `stat(2)` away, which spec.md
//! §4.1 classifies as "known-fast" and therefore safe to call directly on
//! the loop thread rather than delegating to a forked helper.

use async_trait::async_trait;
use oj_unitconf::CommonSettings;

/// One pluggable condition kind. The transaction builder walks a unit's
/// condition list as `&dyn ConditionCheck` so it never has to match on
/// which concrete kind (`ConditionPathExists=`, `ConditionFirstBoot=`, …)
/// it's looking at.
#[async_trait]
pub trait ConditionCheck: Send + Sync {
    /// Cheap enough to call inline while building a transaction — a
    /// `stat(2)`, an in-memory flag read (spec.md §4.5 step 5).
    fn check_now(&self) -> bool;

    /// Heavier checks (a subprocess probe, a network round-trip) defer to
    /// here instead of `check_now`, evaluated once the unit is actually
    /// about to run rather than at transaction-build time. Defaults to
    /// `check_now`'s answer for conditions with no runtime-only variant.
    async fn check_at_runtime(&self) -> bool {
        self.check_now()
    }
}

/// `ConditionPathExists=`: passes if every listed path exists.
pub struct ConditionPathExists(pub Vec<String>);

#[async_trait]
impl ConditionCheck for ConditionPathExists {
    fn check_now(&self) -> bool {
        self.0.iter().all(|path| std::path::Path::new(path).exists())
    }
}

/// Every cheap condition attached to a unit's `[Unit]` section, as a list
/// of [`ConditionCheck`] trait objects (spec.md §4.5 step 5).
pub fn conditions_for(common: &CommonSettings) -> Vec<Box<dyn ConditionCheck>> {
    let mut checks: Vec<Box<dyn ConditionCheck>> = Vec::new();
    if !common.condition_path_exists.is_empty() {
        checks.push(Box::new(ConditionPathExists(common.condition_path_exists.clone())));
    }
    checks
}

/// `true` iff every condition attached to `common` currently passes
/// (spec.md: AND across entries within a kind). Used at transaction-build
/// time, against `check_now()`; a unit kind with a runtime-only condition
/// would call `check_at_runtime()` instead once the unit is actually
/// starting, not here.
pub fn conditions_pass(common: &CommonSettings) -> bool {
    conditions_for(common).iter().all(|c| c.check_now())
}

#[cfg(test)]
#[path = "condition_tests.rs"]
mod tests;
