// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The daemon's [`ExecEnvironment`] implementation: the translation from
//! a unit's already-validated `[Service]` settings into `oj-exec`'s
//! `ExecContext`/`ExecParameters`, which `oj-engine::runner` deliberately
//! leaves to the daemon (it knows about runtime directories and
//! `NOTIFY_SOCKET` paths; `oj-engine` doesn't).

use oj_engine::runner::ExecEnvironment;
use oj_exec::{ExecContext, ExecParameters, MountEntry, NamespaceFlags as RuntimeNamespaceFlags, StdioTarget};
use oj_unitconf::exec_settings::{NamespaceFlags as ConfNamespaceFlags, StdioTarget as ConfStdioTarget};
use oj_unitconf::service::ServiceSettings;
use std::collections::BTreeMap;
use std::path::PathBuf;

fn translate_namespaces(ns: ConfNamespaceFlags) -> RuntimeNamespaceFlags {
    RuntimeNamespaceFlags {
        mount: ns.mount,
        user: ns.user,
        pid: ns.pid,
        net: ns.net,
        uts: ns.uts,
        ipc: ns.ipc,
        cgroup: ns.cgroup,
    }
}

fn translate_stdio(target: ConfStdioTarget) -> StdioTarget {
    match target {
        ConfStdioTarget::Null => StdioTarget::Null,
        ConfStdioTarget::Inherit => StdioTarget::Inherit,
        ConfStdioTarget::Tty => StdioTarget::Tty,
        ConfStdioTarget::Journal => StdioTarget::Journal,
        // TODO: resolve the actual FDSet index once socket-unit
        // activation wires its listening fd into this unit's ExecContext.
        ConfStdioTarget::Socket => StdioTarget::Fd(0),
    }
}

/// Translates `ServiceSettings` into an `ExecContext`/`ExecParameters`
/// pair and supplies the paths (`RuntimeDirectory=`, `NOTIFY_SOCKET`)
/// that only the daemon has an opinion about.
pub struct DaemonExecEnvironment {
    runtime_directory: PathBuf,
    notify_socket_dir: PathBuf,
}

impl DaemonExecEnvironment {
    pub fn new(runtime_directory: PathBuf, notify_socket_dir: PathBuf) -> Self {
        Self { runtime_directory, notify_socket_dir }
    }
}

impl ExecEnvironment for DaemonExecEnvironment {
    fn context_for(&self, unit_id: &str, settings: &ServiceSettings) -> ExecContext {
        let exec = &settings.exec;

        let mut mount_view = Vec::new();
        for path in &exec.read_only_paths {
            mount_view.push(MountEntry::ReadOnlyPath(path.clone()));
        }
        for image in &exec.mount_images {
            mount_view.push(MountEntry::BindMount {
                source: image.source.clone(),
                target: image.destination.clone(),
                read_only: image.read_only,
            });
        }
        for path in &exec.inaccessible_paths {
            mount_view.push(MountEntry::InaccessiblePath(path.clone()));
        }

        let rlimits = exec.rlimits.iter().map(|(k, v)| (k.clone(), (v.soft, v.hard))).collect();
        let credentials: BTreeMap<String, PathBuf> = exec
            .credentials
            .iter()
            .map(|name| (name.clone(), self.runtime_directory.join("credentials").join(unit_id).join(name)))
            .collect();

        ExecContext {
            user: exec.user.clone(),
            group: exec.group.clone(),
            supplementary_groups: exec.supplementary_groups.clone(),
            working_directory: exec.working_directory.clone().unwrap_or_else(|| PathBuf::from("/")),
            environment: exec.environment.clone(),
            namespaces: translate_namespaces(exec.namespaces),
            mount_view,
            capability_bounding_set: exec.capability_bounding_set.clone(),
            ambient_capabilities: exec.ambient_capabilities.clone(),
            no_new_privileges: true,
            rlimits,
            oom_score_adjust: exec.oom_score_adjust,
            cpu_weight: exec.cpu_weight,
            io_weight: exec.io_weight,
            scheduling_policy: exec.scheduling_policy.clone(),
            scheduling_priority: None,
            device_allow: exec.device_allow.clone(),
            seccomp_profile: exec.seccomp_profile.clone(),
            selinux_label: exec.selinux_label.clone(),
            tty: exec.tty.clone(),
            stdin: translate_stdio(exec.standard_input),
            stdout: translate_stdio(exec.standard_output),
            stderr: translate_stdio(exec.standard_error),
            credentials,
            watchdog_usec: settings.watchdog_sec.map(|d| d.as_micros() as u64),
            timeout_start_usec: Some(settings.timeout_start_sec.as_micros() as u64),
            timeout_stop_usec: Some(settings.timeout_stop_sec.as_micros() as u64),
        }
    }

    fn parameters_for(&self, unit_id: &str) -> ExecParameters {
        ExecParameters {
            cgroup_path: format!("oddjobsd.slice/{unit_id}.service"),
            notify_socket: Some(self.notify_socket_dir.join(unit_id)),
            runtime_directory: self.runtime_directory.join(unit_id),
        }
    }
}

#[cfg(test)]
#[path = "exec_env_tests.rs"]
mod tests;
