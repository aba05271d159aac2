// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::dependency::DependencyKind;
use oj_unitconf::test_support::{minimal_service, minimal_target, FixtureSource};

fn graph_with(units: Vec<oj_unitconf::UnitConfig>) -> UnitGraph<FixtureSource> {
    let mut src = FixtureSource::new();
    for u in units {
        src = src.with(u);
    }
    UnitGraph::new(src)
}

#[test]
fn loading_unknown_unit_yields_not_found_stub() {
    let mut g = graph_with(vec![]);
    let idx = g.get_or_load("missing.service").unwrap();
    assert_eq!(g.get(idx).unwrap().load_state, LoadState::NotFound);
}

#[test]
fn loading_known_unit_yields_loaded_state() {
    let mut g = graph_with(vec![minimal_service("a.service")]);
    let idx = g.get_or_load("a.service").unwrap();
    assert_eq!(g.get(idx).unwrap().load_state, LoadState::Loaded);
}

#[test]
fn add_dependency_installs_mirrored_reverse_edge() {
    let mut g = graph_with(vec![minimal_service("a.service"), minimal_service("b.service")]);
    let a = g.get_or_load("a.service").unwrap();
    let b = g.get_or_load("b.service").unwrap();
    g.add_dependency(a, DependencyKind::Requires, b, DependencyReason::File).unwrap();

    assert!(g.get(a).unwrap().deps(DependencyKind::Requires).any(|x| x == b));
    assert!(g.get(b).unwrap().reverse_deps(DependencyKind::Requires).any(|x| x == a));
    assert!(g.get(b).unwrap().deps(DependencyKind::RequiredBy).any(|x| x == a));
}

#[test]
fn self_loop_is_rejected() {
    let mut g = graph_with(vec![minimal_service("a.service")]);
    let a = g.get_or_load("a.service").unwrap();
    let err = g.add_dependency(a, DependencyKind::Before, a, DependencyReason::File).unwrap_err();
    assert!(matches!(err, GraphError::SelfLoop));
}

#[test]
fn raw_dependency_declarations_resolve_transitively() {
    let mut a = minimal_service("a.service");
    a.raw_dependencies.insert("Requires".to_string(), vec!["b.service".to_string()]);
    let b = minimal_service("b.service");
    let mut g = graph_with(vec![a, b]);

    let a_idx = g.get_or_load("a.service").unwrap();
    let b_idx = g.resolve("b.service").expect("b should have been loaded transitively");
    assert!(g.get(a_idx).unwrap().deps(DependencyKind::Requires).any(|x| x == b_idx));
}

#[test]
fn device_cannot_declare_requires() {
    let mut dev = minimal_target("d.device");
    dev.kind_settings = oj_unitconf::KindSettings::Target;
    dev.raw_dependencies.insert("Requires".to_string(), vec!["a.service".to_string()]);
    let a = minimal_service("a.service");
    let mut g = graph_with(vec![dev, a]);
    let err = g.get_or_load("d.device").unwrap_err();
    assert!(matches!(err, LoadError::IllegalDependency { .. }));
}

#[test]
fn self_dependency_in_raw_deps_is_rejected() {
    let mut a = minimal_service("a.service");
    a.raw_dependencies.insert("After".to_string(), vec!["a.service".to_string()]);
    let mut g = graph_with(vec![a]);
    let err = g.get_or_load("a.service").unwrap_err();
    assert!(matches!(err, LoadError::SelfDependency { .. }));
}

#[test]
fn garbage_collect_removes_inactive_unreferenced_units() {
    let mut g = graph_with(vec![minimal_service("a.service")]);
    let idx = g.get_or_load("a.service").unwrap();
    assert!(g.get(idx).unwrap().gc_eligible());

    let collected = g.garbage_collect();
    assert_eq!(collected, vec![idx]);
    assert!(g.get(idx).is_none());
    assert!(g.resolve("a.service").is_none());
}

#[test]
fn garbage_collect_spares_units_with_refs() {
    let mut g = graph_with(vec![minimal_service("a.service")]);
    let idx = g.get_or_load("a.service").unwrap();
    g.get_mut(idx).unwrap().refs = 1;

    let collected = g.garbage_collect();
    assert!(collected.is_empty());
    assert!(g.get(idx).is_some());
}

#[test]
fn reset_failed_clears_the_latch_and_drops_a_failed_unit_to_inactive() {
    let mut g = graph_with(vec![minimal_service("a.service")]);
    let idx = g.get_or_load("a.service").unwrap();
    {
        let unit = g.get_mut(idx).unwrap();
        unit.failed_latch = true;
        unit.active_state = ActiveState::Failed;
    }

    g.reset_failed(idx);

    let unit = g.get(idx).unwrap();
    assert!(!unit.failed_latch);
    assert_eq!(unit.active_state, ActiveState::Inactive);
}

#[test]
fn reset_failed_leaves_a_unit_with_an_in_flight_job_alone() {
    let mut g = graph_with(vec![minimal_service("a.service")]);
    let idx = g.get_or_load("a.service").unwrap();
    {
        let unit = g.get_mut(idx).unwrap();
        unit.failed_latch = true;
        unit.active_state = ActiveState::Failed;
        unit.job = Some(crate::job::JobId::generate());
    }

    g.reset_failed(idx);

    let unit = g.get(idx).unwrap();
    assert!(!unit.failed_latch);
    assert_eq!(unit.active_state, ActiveState::Failed);
}

#[test]
fn reset_failed_all_sweeps_every_latched_unit() {
    let mut g = graph_with(vec![minimal_service("a.service"), minimal_service("b.service")]);
    let a = g.get_or_load("a.service").unwrap();
    let b = g.get_or_load("b.service").unwrap();
    g.get_mut(a).unwrap().failed_latch = true;
    g.get_mut(b).unwrap().failed_latch = true;

    g.reset_failed_all();

    assert!(!g.get(a).unwrap().failed_latch);
    assert!(!g.get(b).unwrap().failed_latch);
}

#[test]
fn reload_unit_reapplies_unchanged_file_dependencies() {
    let mut a = minimal_service("a.service");
    a.raw_dependencies.insert("Requires".to_string(), vec!["b.service".to_string()]);
    let mut g = graph_with(vec![a, minimal_service("b.service")]);
    let idx = g.get_or_load("a.service").unwrap();
    let b = g.get_or_load("b.service").unwrap();

    g.reload_unit(idx).unwrap();

    assert!(g.get(idx).unwrap().deps(DependencyKind::Requires).any(|x| x == b));
    assert!(g.get(b).unwrap().reverse_deps(DependencyKind::Requires).any(|x| x == idx));
}

#[test]
fn reload_unit_on_a_not_found_stub_is_a_noop() {
    let mut g = graph_with(vec![]);
    let idx = g.get_or_load("missing.service").unwrap();

    g.reload_unit(idx).unwrap();

    assert_eq!(g.get(idx).unwrap().load_state, LoadState::NotFound);
}

#[test]
fn merge_redirects_names_and_inbound_edges_onto_the_canonical_unit() {
    let mut a = minimal_service("a.service");
    a.raw_dependencies.insert("Requires".to_string(), vec!["alias.service".to_string()]);
    let alias = minimal_service("alias.service");
    let canonical = minimal_service("real.service");
    let mut g = graph_with(vec![a, alias, canonical]);
    let a_idx = g.get_or_load("a.service").unwrap();
    let alias_idx = g.get_or_load("alias.service").unwrap();
    let canonical_idx = g.get_or_load("real.service").unwrap();
    assert!(g.get(a_idx).unwrap().deps(DependencyKind::Requires).any(|x| x == alias_idx));

    g.merge(alias_idx, canonical_idx);

    assert_eq!(g.resolve("alias.service"), Some(canonical_idx));
    assert_eq!(g.get(alias_idx).unwrap().load_state, LoadState::Merged);
    assert!(g.get(a_idx).unwrap().deps(DependencyKind::Requires).any(|x| x == canonical_idx));
    assert!(!g.get(a_idx).unwrap().deps(DependencyKind::Requires).any(|x| x == alias_idx));
    assert!(g.get(canonical_idx).unwrap().reverse_deps(DependencyKind::Requires).any(|x| x == a_idx));
}

#[test]
fn merge_is_a_noop_for_the_same_unit() {
    let mut g = graph_with(vec![minimal_service("a.service")]);
    let a = g.get_or_load("a.service").unwrap();

    g.merge(a, a);

    assert_eq!(g.get(a).unwrap().load_state, LoadState::Loaded);
}
