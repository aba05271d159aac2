// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The re-exec coordinator (spec.md §4.9): quiesce new job installation,
//! snapshot every unit/job/timer/fdstore-entry into a memfd, `execve()`
//! the manager's own binary, and have the new instance pick the memfd
//! back up by a well-known environment variable.
//!
//! This module only owns the mechanical half of that sequence (the
//! memfd, the env var, the `execve` call itself); deciding *what*
//! quiescent point is safe to snapshot at belongs to `oj-engine`, which
//! knows about running jobs and in-flight state-machine transitions this
//! crate doesn't.

use crate::error::SerializationError;
use crate::record::{parse_records, write_records, Record};
use nix::sys::memfd::{memfd_create, MFdFlags};
use nix::unistd;
use std::ffi::CString;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};

/// Environment variable the new instance reads to find its inherited
/// state memfd (spec.md §6: `<MANAGER>_STATE_FD`).
pub const STATE_FD_VAR: &str = "OJDOBSD_STATE_FD";

/// Coordinates the quiesce → snapshot → exec → restore sequence. Holds no
/// state of its own beyond whether a quiesce is in effect, since the
/// memfd and argv are transient, one-shot values.
#[derive(Default)]
pub struct ReexecCoordinator {
    quiesced: bool,
}

impl ReexecCoordinator {
    pub fn new() -> Self {
        Self { quiesced: false }
    }

    /// Step (a): pause new job installation. The engine must stop
    /// accepting `StartUnit`/`StopUnit`/... calls once this returns true;
    /// in-flight jobs are left to reach a stable sub-state on their own.
    pub fn quiesce(&mut self) {
        self.quiesced = true;
    }

    pub fn is_quiesced(&self) -> bool {
        self.quiesced
    }

    pub fn abort(&mut self) {
        self.quiesced = false;
    }

    /// Step (c)+(d): open a memfd and write every record into it. The
    /// returned fd has `FD_CLOEXEC` cleared so it survives the `execve`
    /// in [`exec_self`](Self::exec_self).
    pub fn snapshot(&self, records: &[Record]) -> Result<OwnedFd, SerializationError> {
        if !self.quiesced {
            return Err(SerializationError::Io(std::io::Error::other(
                "snapshot attempted before quiesce() — re-exec would race in-flight job installation",
            )));
        }
        let text = write_records(records)?;
        let name = CString::new("oddjobsd-state").unwrap_or_default();
        let fd = memfd_create(&name, MFdFlags::empty()).map_err(|errno| {
            SerializationError::Io(std::io::Error::from_raw_os_error(errno as i32))
        })?;
        let mut file = File::from(fd);
        file.write_all(text.as_bytes())?;
        file.seek(SeekFrom::Start(0))?;

        let owned: OwnedFd = file.into();
        clear_cloexec(&owned)?;
        Ok(owned)
    }

    /// Step (e): `execve()` the given binary, passing [`STATE_FD_VAR`] in
    /// the child's environment naming `state_fd`'s numeric value. On
    /// success this call never returns; on failure the existing process
    /// is still alive and the caller should [`abort`](Self::abort) the
    /// quiesce and resume normal operation (spec.md §7: a `SerializationError`
    /// during re-exec is fatal only to the *attempt*).
    pub fn exec_self(
        &self,
        path: &str,
        argv: &[String],
        state_fd: &OwnedFd,
    ) -> Result<std::convert::Infallible, SerializationError> {
        let path_c = CString::new(path)
            .map_err(|e| SerializationError::Io(std::io::Error::other(e)))?;
        let argv_c: Vec<CString> = argv
            .iter()
            .map(|a| CString::new(a.as_str()).map_err(|e| SerializationError::Io(std::io::Error::other(e))))
            .collect::<Result<_, _>>()?;

        let fd_env = format!("{STATE_FD_VAR}={}", state_fd.as_raw_fd());
        let mut envp: Vec<CString> = std::env::vars()
            .filter(|(k, _)| k != STATE_FD_VAR)
            .map(|(k, v)| CString::new(format!("{k}={v}")).unwrap_or_default())
            .collect();
        envp.push(CString::new(fd_env).map_err(|e| SerializationError::Io(std::io::Error::other(e)))?);

        let never = unistd::execve(&path_c, &argv_c, &envp)
            .map_err(|errno| SerializationError::Io(std::io::Error::from_raw_os_error(errno as i32)))?;
        Ok(never)
    }
}

/// Step (f): the freshly-`execve`'d instance reads [`STATE_FD_VAR`] and
/// reconstructs its record set. Returns `Ok(None)` when the variable is
/// absent (a cold start, not a re-exec).
pub fn restore_from_env() -> Result<Option<Vec<Record>>, SerializationError> {
    let Ok(raw) = std::env::var(STATE_FD_VAR) else { return Ok(None) };
    let fd: RawFd = raw
        .parse()
        .map_err(|_| SerializationError::BadEncoding {
            key: STATE_FD_VAR.to_string(),
            encoding: "fd number",
            reason: format!("{raw:?} is not a valid fd number"),
        })?;
    // SAFETY: `fd` was handed to us by our own prior incarnation via
    // `exec_self`, which guarantees it is open, owned, and not aliased
    // elsewhere in this process.
    #[allow(unsafe_code)]
    let owned = unsafe { OwnedFd::from_raw_fd(fd) };
    let mut file = File::from(owned);
    file.seek(SeekFrom::Start(0))?;
    let mut text = String::new();
    file.read_to_string(&mut text)?;
    parse_records(&text).map(Some)
}

fn clear_cloexec(fd: &OwnedFd) -> Result<(), SerializationError> {
    use nix::fcntl::{fcntl, FcntlArg, FdFlag};
    let flags = fcntl(fd, FcntlArg::F_GETFD)
        .map_err(|errno| SerializationError::Io(std::io::Error::from_raw_os_error(errno as i32)))?;
    let mut flags = FdFlag::from_bits_truncate(flags);
    flags.remove(FdFlag::FD_CLOEXEC);
    fcntl(fd, FcntlArg::F_SETFD(flags))
        .map_err(|errno| SerializationError::Io(std::io::Error::from_raw_os_error(errno as i32)))?;
    Ok(())
}

#[cfg(test)]
#[path = "reexec_tests.rs"]
mod tests;
