// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Startup sequence (spec.md §5/§6): acquire the daemon lock before any
//! other side effect, load config, build the `Manager`, then restore a
//! re-exec's carried-over state if `OJDOBSD_STATE_FD` is set. There is no
//! WAL/breadcrumb reconciliation layer here the way the teacher has one —
//! recovery after an unplanned crash (as opposed to a cooperative
//! `Reexecute`) starts from an empty unit graph and lets each unit
//! re-activate the normal way once something asks for it again.

use crate::config::ManagerConfig;
use crate::env;
use crate::error::DaemonError;
use crate::manager::Manager;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

pub struct Startup {
    pub manager: Manager,
    pub config: ManagerConfig,
    pub runtime_directory: PathBuf,
    /// Held for the daemon's entire lifetime: dropping it releases the
    /// exclusive lock taken in [`acquire_lock`].
    pub lock_file: File,
}

/// Steps (a)-(d) of spec.md §5's boot sequence: make directories, take
/// the lock first so two daemons racing for the same runtime directory
/// never both think they own it, load config, build the `Manager`, then
/// fold in a re-exec's carried-over state if present.
pub fn startup() -> Result<Startup, DaemonError> {
    let runtime_directory = env::runtime_directory();
    std::fs::create_dir_all(&runtime_directory)?;

    let lock_path = runtime_directory.join("oddjobsd.lock");
    let lock_file = acquire_lock(&lock_path)?;

    let config_path = env::config_path(&runtime_directory);
    let config = ManagerConfig::load(&config_path)?;

    let notify_dir = env::notify_socket_dir(&runtime_directory);
    std::fs::create_dir_all(&notify_dir)?;

    let mut manager = Manager::new(config.units_directory.clone(), runtime_directory.clone(), notify_dir);
    if manager.restore()? {
        info!("restored manager state from a prior re-exec");
    } else {
        info!("starting with an empty unit graph (cold start)");
    }

    Ok(Startup { manager, config, runtime_directory, lock_file })
}

/// Opens (without truncating — truncating before the lock is held would
/// wipe a running daemon's PID out from under it) and exclusively locks
/// the daemon's lock file, only then writing this process's PID into it.
fn acquire_lock(path: &Path) -> Result<File, DaemonError> {
    let lock_file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .map_err(|source| DaemonError::LockFailed { path: path.to_path_buf(), source })?;
    lock_file
        .try_lock_exclusive()
        .map_err(|source| DaemonError::LockFailed { path: path.to_path_buf(), source })?;

    let mut lock_file = lock_file;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;
    Ok(lock_file)
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
