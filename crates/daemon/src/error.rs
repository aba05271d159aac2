// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon-level error taxonomy: wraps every sibling crate's own error
//! type plus the handful of failures that only exist at this layer
//! (lock acquisition, config parsing, unit-file JSON decoding).

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("could not determine the runtime directory")]
    NoRuntimeDirectory,

    #[error("failed to acquire the daemon lock at {path}: is another instance already running?")]
    LockFailed { path: PathBuf, #[source] source: std::io::Error },

    #[error("config at {path} is not valid TOML: {source}")]
    BadConfig { path: PathBuf, #[source] source: toml::de::Error },

    #[error("unit config {path} is not valid JSON: {source}")]
    BadUnitConfig { path: PathBuf, #[source] source: serde_json::Error },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("unit {name:?} could not be loaded: {source}")]
    Load { name: String, #[source] source: oj_core::LoadError },

    #[error(transparent)]
    Graph(#[from] oj_core::GraphError),

    #[error(transparent)]
    Transaction(#[from] oj_engine::error::TransactionError),

    #[error(transparent)]
    Runner(#[from] oj_engine::error::RunnerError),

    #[error(transparent)]
    Serialization(#[from] oj_storage::SerializationError),

    #[error("unknown unit {0:?}")]
    UnknownUnit(String),
}
