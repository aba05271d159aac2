// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Declarative execution settings, as written in a unit's `[Service]`-like
//! section. `oj-exec::ExecContext` is built from these at unit load time
//! (spec.md §3: "ExecContext (immutable per unit load)"); this struct is
//! the as-parsed form before user/group name resolution.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecSettings {
    pub exec_start: Vec<String>,
    pub user: Option<String>,
    pub group: Option<String>,
    pub supplementary_groups: Vec<String>,
    pub working_directory: Option<PathBuf>,
    pub environment: BTreeMap<String, String>,
    pub namespaces: NamespaceFlags,
    pub read_only_paths: Vec<PathBuf>,
    pub inaccessible_paths: Vec<PathBuf>,
    pub mount_images: Vec<MountImage>,
    pub capability_bounding_set: Vec<String>,
    pub ambient_capabilities: Vec<String>,
    pub rlimits: BTreeMap<String, RLimit>,
    pub oom_score_adjust: Option<i32>,
    pub cpu_weight: Option<u64>,
    pub io_weight: Option<u64>,
    pub scheduling_policy: Option<String>,
    pub device_allow: Vec<String>,
    pub seccomp_profile: Option<String>,
    pub selinux_label: Option<String>,
    pub tty: Option<PathBuf>,
    pub standard_input: StdioTarget,
    pub standard_output: StdioTarget,
    pub standard_error: StdioTarget,
    /// Names of `LoadCredential=`/`SetCredential=` entries; actual
    /// credential material is resolved by the exec pipeline at spawn time.
    pub credentials: Vec<String>,
}

impl Default for ExecSettings {
    fn default() -> Self {
        Self {
            exec_start: Vec::new(),
            user: None,
            group: None,
            supplementary_groups: Vec::new(),
            working_directory: None,
            environment: BTreeMap::new(),
            namespaces: NamespaceFlags::default(),
            read_only_paths: Vec::new(),
            inaccessible_paths: Vec::new(),
            mount_images: Vec::new(),
            capability_bounding_set: Vec::new(),
            ambient_capabilities: Vec::new(),
            rlimits: BTreeMap::new(),
            oom_score_adjust: None,
            cpu_weight: None,
            io_weight: None,
            scheduling_policy: None,
            device_allow: Vec::new(),
            seccomp_profile: None,
            selinux_label: None,
            tty: None,
            standard_input: StdioTarget::Null,
            standard_output: StdioTarget::Inherit,
            standard_error: StdioTarget::Inherit,
            credentials: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NamespaceFlags {
    pub mount: bool,
    pub user: bool,
    pub pid: bool,
    pub net: bool,
    pub uts: bool,
    pub ipc: bool,
    pub cgroup: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountImage {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub verity_root_hash: Option<String>,
    pub read_only: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RLimit {
    pub soft: u64,
    pub hard: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StdioTarget {
    Null,
    Inherit,
    Tty,
    Journal,
    Socket,
}
