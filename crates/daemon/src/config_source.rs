// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A concrete, non-test [`UnitConfigSource`]: reads pre-validated
//! [`UnitConfig`] records as `serde_json` from a flat directory.
//!
//! Parsing the sectioned-key-value unit file syntax is explicitly out of
//! scope for this manager (spec.md §1 Non-goals, §6 "as consumed from
//! collaborator"); this source stands in for that collaborator with the
//! simplest possible on-disk contract — one `<name>.json` file per unit —
//! since `UnitConfig` already derives `Serialize`/`Deserialize` and this
//! crate is where a concrete, loadable implementation belongs.

use oj_unitconf::{UnitConfig, UnitConfigSource};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigSourceError {
    #[error("reading {path}: {source}")]
    Io { path: PathBuf, #[source] source: std::io::Error },

    #[error("{path} is not a valid unit config: {source}")]
    Decode { path: PathBuf, #[source] source: serde_json::Error },
}

/// Reads `<dir>/<name>.json` for each unit name looked up.
pub struct DirectoryConfigSource {
    dir: PathBuf,
}

impl DirectoryConfigSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl UnitConfigSource for DirectoryConfigSource {
    type Error = ConfigSourceError;

    fn load(&self, name: &str) -> Result<Option<UnitConfig>, Self::Error> {
        let path = self.dir.join(format!("{name}.json"));
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(ConfigSourceError::Io { path, source }),
        };
        let config = serde_json::from_str(&text)
            .map_err(|source| ConfigSourceError::Decode { path: path.clone(), source })?;
        Ok(Some(config))
    }
}

#[cfg(test)]
#[path = "config_source_tests.rs"]
mod tests;
