// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access (spec.md §6 "Environment
//! variables consumed"), mirroring the teacher's `daemon::env` module:
//! one small function per variable, never read ad hoc elsewhere.

use std::path::PathBuf;

/// `RUNTIME_DIRECTORY` override, falling back to `XDG_RUNTIME_DIR/oddjobsd`
/// and finally `/run/oddjobsd` so a non-systemd-launched daemon still has
/// somewhere to put its socket-equivalent state and lock file.
pub fn runtime_directory() -> PathBuf {
    if let Ok(dir) = std::env::var("RUNTIME_DIRECTORY") {
        return PathBuf::from(dir);
    }
    if let Ok(xdg) = std::env::var("XDG_RUNTIME_DIR") {
        return PathBuf::from(xdg).join("oddjobsd");
    }
    PathBuf::from("/run/oddjobsd")
}

/// `LISTEN_FDS`: the number of file descriptors passed via the
/// socket-activation protocol, starting at `SD_LISTEN_FDS_START` (3).
pub fn listen_fds() -> u32 {
    std::env::var("LISTEN_FDS").ok().and_then(|s| s.parse().ok()).unwrap_or(0)
}

/// `LISTEN_PID`: only fds addressed to this exact process are ours —
/// guards against inheriting a parent's environment across an `execve()`
/// that didn't intend to pass them on.
pub fn listen_pid_matches() -> bool {
    std::env::var("LISTEN_PID")
        .ok()
        .and_then(|s| s.parse::<u32>().ok())
        .is_some_and(|pid| pid == std::process::id())
}

/// `LISTEN_FDNAMES`: colon-separated names, one per passed fd, for
/// `FileDescriptorName=`-style lookups.
pub fn listen_fdnames() -> Vec<String> {
    std::env::var("LISTEN_FDNAMES")
        .ok()
        .map(|s| s.split(':').map(str::to_string).collect())
        .unwrap_or_default()
}

/// `NOTIFY_SOCKET` base directory passed to `Type=notify` children; the
/// daemon creates one socket per invocation under this directory rather
/// than sharing a single path across units.
pub fn notify_socket_dir(runtime_directory: &std::path::Path) -> PathBuf {
    std::env::var("NOTIFY_SOCKET")
        .map(PathBuf::from)
        .unwrap_or_else(|_| runtime_directory.join("notify"))
}

/// Path to the `ManagerConfig` TOML file, defaulting to
/// `<runtime_directory>/oddjobsd.toml`.
pub fn config_path(runtime_directory: &std::path::Path) -> PathBuf {
    std::env::var("OJDOBSD_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| runtime_directory.join("oddjobsd.toml"))
}
