// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `oddjobsd`: single-threaded cooperative event loop (spec.md §5),
//! driven here from one `tokio` current-thread task that interleaves
//! `Manager::run_iteration` with signal reception — the only legitimate
//! use for a `tokio` reactor in this workspace (`oj-engine`'s own loop
//! owns nothing beyond child-exit and timers).
//!
//! Exit codes (spec.md §6): `0` on a clean `SIGTERM`/`SIGINT` shutdown,
//! `1` on a startup or config failure. The reboot/poweroff/kexec/halt
//! exit codes spec.md §6 reserves are not implemented — this manager has
//! no notion of driving the surrounding system's power state.

use oj_daemon::error::DaemonError;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

#[tokio::main(flavor = "current_thread")]
async fn main() -> std::process::ExitCode {
    match run().await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("oddjobsd: {e}");
            std::process::ExitCode::from(1)
        }
    }
}

async fn run() -> Result<(), DaemonError> {
    let oj_daemon::lifecycle::Startup { mut manager, config, runtime_directory, lock_file } =
        oj_daemon::lifecycle::startup()?;
    let _log_guard = setup_logging(&runtime_directory.join("oddjobsd.log"))?;

    info!(default_timeout = ?config.default_timeout, units_directory = ?config.units_directory, "oddjobsd starting");

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sighup = signal(SignalKind::hangup())?;
    let mut sigusr2 = signal(SignalKind::user_defined2())?;

    info!("oddjobsd ready");
    println!("READY");

    loop {
        let sleep = match manager.next_deadline() {
            Some(deadline) => tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)),
            None => tokio::time::sleep(std::time::Duration::from_secs(1)),
        };

        tokio::select! {
            _ = sigterm.recv() => {
                info!("received SIGTERM, shutting down");
                break;
            }
            _ = sigint.recv() => {
                info!("received SIGINT, shutting down");
                break;
            }
            _ = sighup.recv() => {
                info!("received SIGHUP, reloading unit configs");
                if let Err(e) = manager.reload() {
                    error!("reload failed: {e}");
                }
            }
            _ = sigusr2.recv() => {
                if manager.is_idle() {
                    info!("received SIGUSR2, quiescing for re-exec");
                    manager.quiesce_for_reexec();
                    let exe = std::env::current_exe()?;
                    let argv: Vec<String> = std::env::args().collect();
                    match manager.begin_reexec(&exe.to_string_lossy(), &argv) {
                        Ok(never) => match never {},
                        Err(e) => {
                            error!("re-exec failed, resuming normal operation: {e}");
                            manager.abort_reexec();
                        }
                    }
                } else {
                    error!("ignoring SIGUSR2: jobs still in flight");
                }
            }
            _ = sleep => {
                if let Err(e) = manager.run_iteration() {
                    error!("event loop iteration failed: {e}");
                }
                let collected = manager.collect_garbage();
                if collected > 0 {
                    info!(collected, "garbage-collected inactive units");
                }
            }
        }
    }

    drop(lock_file);
    Ok(())
}

fn setup_logging(log_path: &std::path::Path) -> Result<tracing_appender::non_blocking::WorkerGuard, DaemonError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file_appender = tracing_appender::rolling::never(
        log_path.parent().unwrap_or_else(|| std::path::Path::new(".")),
        log_path.file_name().unwrap_or_else(|| std::ffi::OsStr::new("oddjobsd.log")),
    );
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}
