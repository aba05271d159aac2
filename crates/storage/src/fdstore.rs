// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The FDSet: the one explicit shared-ownership container for file
//! descriptors that must survive a re-exec (spec.md §3, §4.2, §5).
//!
//! Every other component treats fd ownership as move-only (a raw fd
//! handed to a child is no longer this process's to close); the FDSet is
//! the deliberate exception, since `put_dup`/`put_dup_indexed` need to
//! keep a descriptor alive here *and* hand a usable copy to a caller.
//! Slots are never shifted once assigned, so a `@<index>` reference
//! written into one record stays valid even if an earlier slot is later
//! [`take`](FDSet::take)n.

use crate::error::SerializationError;
use nix::unistd::dup;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, OwnedFd, RawFd};

/// Ordered, owned collection of file descriptors, addressable either by
/// their current numeric value or by `@<index>` (spec.md §4.2).
#[derive(Default)]
pub struct FDSet {
    fds: Vec<Option<OwnedFd>>,
}

impl FDSet {
    pub fn new() -> Self {
        Self { fds: Vec::new() }
    }

    /// Total slot count, including any already-[`take`](Self::take)n.
    pub fn len(&self) -> usize {
        self.fds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fds.is_empty()
    }

    /// Store an owned fd, deduping by its current raw numeric identity:
    /// if this exact raw fd is already a member, the existing index is
    /// returned and `fd` is dropped (closing the now-redundant duplicate).
    pub fn put(&mut self, fd: OwnedFd) -> usize {
        let raw = fd.as_raw_fd();
        if let Some(idx) = self.fds.iter().position(|f| f.as_ref().is_some_and(|f| f.as_raw_fd() == raw)) {
            return idx;
        }
        self.fds.push(Some(fd));
        self.fds.len() - 1
    }

    /// Duplicate `fd` and store the duplicate, returning the new fd's
    /// current raw value. The caller's original `fd` is left untouched.
    pub fn put_dup(&mut self, fd: BorrowedFd<'_>) -> Result<RawFd, SerializationError> {
        let dup_fd = dup(fd).map_err(|errno| SerializationError::BadEncoding {
            key: "fd".to_string(),
            encoding: "dup",
            reason: errno.to_string(),
        })?;
        let raw = dup_fd.as_raw_fd();
        self.fds.push(Some(dup_fd));
        Ok(raw)
    }

    /// Like [`put_dup`](Self::put_dup), but guarantees the new fd's
    /// numeric value is `>= self.len()` at the moment of the call, so a
    /// later bulk renumbering pass (`dup2` to `SD_LISTEN_FDS_START +
    /// index`) can proceed without transient collisions between the
    /// low-numbered target slots and descriptors not yet moved there
    /// (spec.md §4.2).
    pub fn put_dup_indexed(&mut self, fd: BorrowedFd<'_>) -> Result<RawFd, SerializationError> {
        let floor = self.fds.len() as RawFd;
        loop {
            let raw = self.put_dup(fd)?;
            if raw >= floor {
                return Ok(raw);
            }
            // Extremely unlikely (would require another thread/process
            // racing fd allocation underneath us); retry rather than
            // silently violating the ordering guarantee.
        }
    }

    /// Borrow the fd at `index`, if present and not already taken.
    pub fn get(&self, index: usize) -> Option<BorrowedFd<'_>> {
        self.fds.get(index)?.as_ref().map(|f| f.as_fd())
    }

    /// Remove and return ownership of the fd at `index`. The slot is left
    /// behind as a tombstone so every other index keeps referring to the
    /// same fd it always has.
    pub fn take(&mut self, index: usize) -> Option<OwnedFd> {
        self.fds.get_mut(index)?.take()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, BorrowedFd<'_>)> {
        self.fds.iter().enumerate().filter_map(|(i, f)| Some((i, f.as_ref()?.as_fd())))
    }

    /// Resolve an `@<index>` reference as written in a serialization
    /// record (spec.md §4.2/§6).
    pub fn resolve_ref(&self, index: usize) -> Result<BorrowedFd<'_>, SerializationError> {
        self.get(index).ok_or(SerializationError::MissingFd { index })
    }
}

#[cfg(test)]
#[path = "fdstore_tests.rs"]
mod tests;
