// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transaction building and job execution on top of [`oj_core`]'s unit
//! graph (spec.md §4.5 "the crux", §4.6 job runner).
//!
//! This crate owns no process handles of its own — it drives [`oj_exec`]
//! and the `UnitBehavior`/per-kind `advance` functions in `oj_core::state`
//! to turn a committed [`transaction::Transaction`] into running jobs, and
//! reports outcomes back through [`error::RunnerError`].

pub mod condition;
pub mod error;
pub mod loop_;
pub mod runner;
pub mod transaction;
