// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Already-validated unit configuration records.
//!
//! Parsing unit files (and drop-ins) from disk is explicitly out of scope
//! for the manager core (see the top-level spec): that job belongs to a
//! collaborator. This crate defines only the *contract* that collaborator
//! must satisfy — the shape of a fully parsed, fully validated
//! [`UnitConfig`] — plus enough structure (`[Unit]`/`[Install]` common
//! settings, one settings struct per unit kind) for `oj-core` to build a
//! unit graph and `oj-exec` to assemble an execution environment from it.
//!
//! Nothing here reads a file or a byte stream. A real deployment plugs in
//! its own loader behind [`UnitConfigSource`]; tests construct `UnitConfig`
//! values directly or via [`UnitConfigBuilder`].

pub mod exec_settings;
pub mod install;
pub mod service;
pub mod socket;
pub mod timer;

pub use exec_settings::ExecSettings;
pub use install::InstallSettings;
pub use service::{RestartPolicy, ServiceSettings, ServiceType};
pub use socket::SocketSettings;
pub use timer::{TimerSettings, TimerSpec};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `Environment=` accumulates across repeated keys; everything else in
/// `[Unit]` is last-one-wins. The loader collaborator is responsible for
/// applying that merge policy before producing this record — by the time
/// `UnitConfig` exists, every field already holds its final value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommonSettings {
    pub description: Option<String>,
    pub documentation: Vec<String>,
    /// Units this one is conditionally inapplicable without; cheap
    /// conditions (e.g. `ConditionPathExists=`) are evaluated by the
    /// engine at transaction-build time, see `oj-engine::condition`.
    pub condition_path_exists: Vec<String>,
    pub ignore_on_isolate: bool,
    pub default_dependencies: bool,
    pub refuse_manual_start: bool,
}

impl Default for CommonSettings {
    fn default() -> Self {
        Self {
            description: None,
            documentation: Vec::new(),
            condition_path_exists: Vec::new(),
            ignore_on_isolate: false,
            default_dependencies: true,
            refuse_manual_start: false,
        }
    }
}

/// Kind-specific settings. One variant per unit kind; `Target`/`Slice`
/// carry no extra settings beyond [`CommonSettings`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum KindSettings {
    Service(ServiceSettings),
    Socket(SocketSettings),
    Timer(TimerSettings),
    Target,
    Slice,
    Mount { what: String, where_: String, fs_type: String, options: Vec<String> },
    Path { path_exists: Option<String>, path_exists_glob: Option<String> },
}

/// A fully parsed, fully validated unit record — the loader collaborator's
/// output contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitConfig {
    /// Canonical name, `<stem>.<kind>`.
    pub name: String,
    pub common: CommonSettings,
    pub install: InstallSettings,
    pub kind_settings: KindSettings,
    /// Raw dependency declarations as strings (unit names), keyed by the
    /// `[Unit]` setting name (`Requires=`, `After=`, ...). `oj-core`'s
    /// loader resolves these into graph edges; this crate only carries
    /// the validated, already-split list.
    pub raw_dependencies: BTreeMap<String, Vec<String>>,
}

impl UnitConfig {
    pub fn is_template(&self) -> bool {
        match self.name.split_once('@') {
            Some((_, rest)) => rest.starts_with('.') || rest.is_empty(),
            None => false,
        }
    }
}

/// Contract for the out-of-scope collaborator that turns unit files (and
/// drop-ins) on disk into validated [`UnitConfig`] records. `oj-core`'s
/// loader calls this; it never reads a filesystem path itself.
pub trait UnitConfigSource: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Look up and fully validate the config for `name` (already
    /// normalized/template-expanded by the caller).
    fn load(&self, name: &str) -> Result<Option<UnitConfig>, Self::Error>;
}

#[cfg(any(test, feature = "test-support"))]
pub mod test_support {
    use super::*;
    use std::collections::HashMap;

    /// An in-memory [`UnitConfigSource`] for tests: a fixed map of
    /// name → config, no filesystem involved.
    #[derive(Debug, Default, Clone)]
    pub struct FixtureSource {
        units: HashMap<String, UnitConfig>,
    }

    impl FixtureSource {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with(mut self, config: UnitConfig) -> Self {
            self.units.insert(config.name.clone(), config);
            self
        }
    }

    #[derive(Debug, thiserror::Error)]
    #[error("fixture source has no error variant")]
    pub enum FixtureError {}

    impl UnitConfigSource for FixtureSource {
        type Error = FixtureError;

        fn load(&self, name: &str) -> Result<Option<UnitConfig>, Self::Error> {
            Ok(self.units.get(name).cloned())
        }
    }

    pub fn minimal_service(name: &str) -> UnitConfig {
        UnitConfig {
            name: name.to_string(),
            common: CommonSettings::default(),
            install: InstallSettings::default(),
            kind_settings: KindSettings::Service(ServiceSettings::default()),
            raw_dependencies: BTreeMap::new(),
        }
    }

    pub fn minimal_target(name: &str) -> UnitConfig {
        UnitConfig {
            name: name.to_string(),
            common: CommonSettings::default(),
            install: InstallSettings::default(),
            kind_settings: KindSettings::Target,
            raw_dependencies: BTreeMap::new(),
        }
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
