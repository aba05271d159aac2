// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Manager-state serialization and the re-exec coordinator (spec.md §4.2,
//! §4.9, §6, §8).
//!
//! This crate knows nothing about the unit graph's invariants or the
//! engine's scheduling rules; it owns the wire format (key=value records,
//! fd references, hex/base64 encoding) and the mechanics of surviving an
//! `execve()`. `oj-engine` decides what to snapshot and when.

pub mod error;
pub mod fdstore;
pub mod record;
pub mod reexec;
pub mod snapshot;

pub use error::SerializationError;
pub use fdstore::FDSet;
pub use record::{parse_records, write_record, write_records, Record, MAX_LINE_BYTES};
pub use reexec::{restore_from_env, ReexecCoordinator, STATE_FD_VAR};
pub use snapshot::{
    deserialize_job, deserialize_unit, parse_job_type, serialize_job, serialize_unit, RestoredJob,
    RestoredUnit,
};
