// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::unit::UnitKind;

#[test]
fn initial_sub_state_matches_active_state_inactive() {
    for kind in [
        UnitKind::Service,
        UnitKind::Socket,
        UnitKind::Mount,
        UnitKind::Swap,
        UnitKind::Target,
        UnitKind::Path,
        UnitKind::Timer,
        UnitKind::Slice,
        UnitKind::Scope,
        UnitKind::Device,
        UnitKind::Automount,
    ] {
        let sub = SubState::initial_for(kind);
        assert_eq!(sub.active_state(), ActiveState::Inactive, "kind {kind:?} should start inactive");
    }
}

#[test]
fn default_sub_state_is_dead_target() {
    assert_eq!(SubState::default(), SubState::Target(TargetSubState::Dead));
}
