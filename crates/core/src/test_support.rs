// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test fixtures for other crates in the workspace. Gated behind
//! `test-support` so it never ships in a release build of `oj-core`.

use crate::graph::UnitGraph;
use crate::unit::{LoadState, Unit, UnitKind};
use oj_unitconf::test_support::FixtureSource;

/// A freshly loaded unit with no dependencies, for tests that only care
/// about its own state machine, not graph wiring.
pub fn loaded_stub(id: &str, kind: UnitKind) -> Unit {
    let mut unit = Unit::new_stub(id.to_string(), kind);
    unit.load_state = LoadState::Loaded;
    unit
}

/// An empty graph backed by an in-memory [`FixtureSource`], ready for a
/// test to populate with `.with(...)` before the first `get_or_load`.
pub fn empty_graph() -> UnitGraph<FixtureSource> {
    UnitGraph::new(FixtureSource::new())
}

pub fn graph_with_fixtures(source: FixtureSource) -> UnitGraph<FixtureSource> {
    UnitGraph::new(source)
}
