// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::fs::File;
use std::os::fd::{AsFd, IntoRawFd};

fn owned_fd() -> OwnedFd {
    let f = File::open("/dev/null").expect("/dev/null should always be openable in CI sandboxes");
    OwnedFd::from(f.into_raw_fd())
}

#[test]
fn put_dedupes_by_raw_identity() {
    let mut set = FDSet::new();
    let a = set.put(owned_fd());
    let b = set.put(owned_fd());
    assert_ne!(a, b, "distinct raw fds are distinct slots");
}

#[test]
fn take_leaves_a_tombstone_other_indices_survive() {
    let mut set = FDSet::new();
    let first = set.put(owned_fd());
    let second = set.put(owned_fd());

    let taken = set.take(first);
    assert!(taken.is_some());
    assert!(set.get(first).is_none());
    assert!(set.get(second).is_some());
    assert_eq!(set.len(), 2, "tombstoned slots still count toward len()");
}

#[test]
fn resolve_ref_reports_missing_fd() {
    let set = FDSet::new();
    let err = set.resolve_ref(3).unwrap_err();
    assert!(matches!(err, SerializationError::MissingFd { index: 3 }));
}

#[test]
fn put_dup_indexed_never_returns_a_value_below_the_floor() {
    let mut set = FDSet::new();
    set.put(owned_fd());
    let fd = owned_fd();
    let raw = set.put_dup_indexed(fd.as_fd()).unwrap();
    assert!(raw as usize >= 1);
}
