// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy for the FD store and serialization layer (spec.md §4.2, §7).

use thiserror::Error;

/// Failure (de)serializing manager state across re-exec (spec.md §4.2).
#[derive(Debug, Error)]
pub enum SerializationError {
    #[error("serialized key {key:?} would exceed the {limit} byte line cap")]
    Overflow { key: String, limit: usize },

    #[error("malformed {encoding} encoding for key {key:?}: {reason}")]
    BadEncoding { key: String, encoding: &'static str, reason: String },

    #[error("fd reference @{index} has no member in the FDSet")]
    MissingFd { index: usize },

    /// An unrecognized top-level record type was encountered. Only fatal
    /// when `strict` is set; otherwise the caller logs and skips it
    /// (spec.md §4.2: "tolerant of unknown keys... strict about malformed
    /// encodings").
    #[error("unknown record type {kind:?}")]
    UnknownRecord { kind: String, strict: bool },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
