// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types surfaced by the unit graph (spec.md §7). These describe
//! *why a load or a graph mutation was rejected*, not transport or
//! process-spawn failures — those live in `oj-exec`/`oj-storage`.

use crate::unit::UnitKind;
use thiserror::Error;

/// Failure loading or validating a single unit's configuration into the
/// graph (spec.md §3 `LoadState::BadSetting`/`LoadState::Error` causes).
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("unit {name:?} not found")]
    NotFound { name: String },

    #[error("unit {name:?} is masked")]
    Masked { name: String },

    #[error("unit {name:?} has unknown suffix {suffix:?}")]
    UnknownKind { name: String, suffix: String },

    #[error("unit {name:?} declares dependency {dep_kind:?} on {target:?}, which is illegal for a {kind} unit")]
    IllegalDependency { name: String, kind: UnitKind, dep_kind: crate::dependency::DependencyKind, target: String },

    #[error("unit {name:?} names itself in a dependency list")]
    SelfDependency { name: String },

    #[error("collaborator config source failed loading {name:?}: {source}")]
    Source { name: String, #[source] source: Box<dyn std::error::Error + Send + Sync> },

    #[error("unit {name:?} is a template and cannot be loaded without an instance")]
    UninstantiatedTemplate { name: String },
}

/// Failure performing a graph mutation (spec.md §4.3 `add_dependency`/GC).
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("unit index is stale (unit was garbage collected)")]
    StaleIndex,

    #[error("adding this edge would violate the no-self-loop invariant")]
    SelfLoop,

    #[error(transparent)]
    Load(#[from] LoadError),
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
