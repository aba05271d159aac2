// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::exec_settings::ExecSettings;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// `Type=` — determines when the service state machine considers the
/// unit "ready" (spec.md §4.4 edge-case policies).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceType {
    Simple,
    Exec,
    Forking,
    Oneshot,
    Notify,
    Dbus,
}

impl Default for ServiceType {
    fn default() -> Self {
        ServiceType::Simple
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RestartPolicy {
    No,
    OnSuccess,
    OnFailure,
    OnAbnormal,
    OnWatchdog,
    OnAbort,
    Always,
}

impl Default for RestartPolicy {
    fn default() -> Self {
        RestartPolicy::No
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceSettings {
    pub service_type: ServiceType,
    pub exec: ExecSettings,
    pub exec_start_pre: Vec<String>,
    pub exec_start_post: Vec<String>,
    pub exec_reload: Option<String>,
    pub exec_stop: Vec<String>,
    pub exec_stop_post: Vec<String>,
    pub remain_after_exit: bool,
    pub restart: RestartPolicy,
    pub restart_sec: Duration,
    pub timeout_start_sec: Duration,
    pub timeout_stop_sec: Duration,
    pub watchdog_sec: Option<Duration>,
    pub kill_signal: i32,
    pub final_kill_signal: i32,
    /// `BusName=` for `Type=dbus`.
    pub bus_name: Option<String>,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            service_type: ServiceType::default(),
            exec: ExecSettings::default(),
            exec_start_pre: Vec::new(),
            exec_start_post: Vec::new(),
            exec_reload: None,
            exec_stop: Vec::new(),
            exec_stop_post: Vec::new(),
            remain_after_exit: false,
            restart: RestartPolicy::default(),
            restart_sec: Duration::from_millis(100),
            timeout_start_sec: Duration::from_secs(90),
            timeout_stop_sec: Duration::from_secs(90),
            watchdog_sec: None,
            kill_signal: 15, // SIGTERM
            final_kill_signal: 9, // SIGKILL
            bus_name: None,
        }
    }
}
