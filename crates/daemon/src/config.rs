// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `ManagerConfig` (SPEC_FULL.md §1 "Config surface"): the small,
//! `serde`+`toml` settings surface the daemon reads at startup, the way
//! the teacher's daemon resolves `RUNTIME_DIRECTORY`/env overrides in
//! `env.rs` and keeps everything else in a plain `Config` struct.

use crate::error::DaemonError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

fn default_units_directory() -> PathBuf {
    PathBuf::from("/etc/oddjobsd/units")
}

fn default_reexec_binary() -> PathBuf {
    std::env::current_exe().unwrap_or_else(|_| PathBuf::from("/usr/lib/oddjobsd/oddjobsd"))
}

const fn default_default_timeout_secs() -> u64 {
    90
}

/// Daemon-wide settings, read once at startup. Individual units override
/// `timeout_start_sec`/`timeout_stop_sec` in their own `[Service]`
/// settings; this is only the fallback used while building a unit's
/// default settings in the (out-of-scope) loader collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Where already-validated `UnitConfig` JSON records are read from.
    pub units_directory: PathBuf,
    /// Binary path re-exec'd into on `Reexecute` (spec.md §4.9 step (e)).
    pub reexec_binary: PathBuf,
    #[serde(with = "duration_secs")]
    pub default_timeout: Duration,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            units_directory: default_units_directory(),
            reexec_binary: default_reexec_binary(),
            default_timeout: Duration::from_secs(default_default_timeout_secs()),
        }
    }
}

impl ManagerConfig {
    /// Load from `path`, falling back to defaults entirely if the file
    /// doesn't exist (a fresh install has no config file yet).
    pub fn load(path: &Path) -> Result<Self, DaemonError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };
        toml::from_str(&text).map_err(|source| DaemonError::BadConfig { path: path.to_path_buf(), source })
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
