// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Applet Process (C4): spawning a child runtime and tracking its exit.
//!
//! The child is treated as an opaque HTTP endpoint (spec.md §4.4): the
//! supervisor's only contract with it is the environment variables it is
//! launched with and the `/__health` probe. [`ProcessHandle`] is the
//! cloneable, lock-free handle to a spawned child shared between the
//! [`crate::manager::Manager`] fast path and the [`crate::monitor`] task
//! that owns its `wait()`.

use crate::{env, health, socket_path::SocketPathResolver};
use applet_engine_core::AppletId;
use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio::sync::watch;
use tracing::{debug, error};

use crate::error::SupervisorError;

/// A lock-free, cloneable view onto a spawned child. Liveness is tracked
/// through a `watch` channel written by the reaper task spawned in
/// [`start_process`], so cloning a handle and checking
/// [`ProcessHandle::is_running`] never requires touching the Manager lock.
#[derive(Clone)]
pub struct ProcessHandle {
    pid: u32,
    exit_rx: watch::Receiver<Option<std::process::ExitStatus>>,
}

impl ProcessHandle {
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// True iff the reaper task has not yet observed an exit.
    pub fn is_running(&self) -> bool {
        self.exit_rx.borrow().is_none()
    }

    /// Blocks until the reaper task records an exit status, or returns
    /// `None` if the reaper task was dropped without ever sending one
    /// (a bug elsewhere in this crate, not a normal outcome).
    pub async fn wait_for_exit(&mut self) -> Option<std::process::ExitStatus> {
        loop {
            if let Some(status) = *self.exit_rx.borrow() {
                return Some(status);
            }
            if self.exit_rx.changed().await.is_err() {
                return None;
            }
        }
    }
}

/// One spawned child, tracked per spec.md §3's `AppletProcess` record.
pub struct AppletProcess {
    pub applet_id: AppletId,
    pub entry_point: String,
    pub applet_socket: PathBuf,
    pub handle: ProcessHandle,
    pub started_at: Instant,
}

/// Public-facing snapshot returned from `Manager` operations. Deliberately
/// smaller than `AppletProcess` — callers get identity and liveness, not
/// the socket path or raw handle.
#[derive(Debug, Clone)]
pub struct AppletProcessInfo {
    pub applet_id: AppletId,
    pub pid: u32,
    pub started_at: Instant,
}

impl AppletProcess {
    pub fn info(&self) -> AppletProcessInfo {
        AppletProcessInfo {
            applet_id: self.applet_id.clone(),
            pid: self.handle.pid(),
            started_at: self.started_at,
        }
    }
}

/// Launch `entry_point` for `applet_id`, wait for it to pass `/__health`,
/// and return the tracked process. On health-check failure the child is
/// forcibly terminated before the error is returned (spec.md §4.4 step 6).
pub async fn start_process(
    base_dir: &Path,
    applet_id: &AppletId,
    entry_point: &str,
    engine_socket: &Path,
) -> Result<AppletProcess, SupervisorError> {
    crate::socket_path::ensure_base_dir(base_dir).map_err(|source| SupervisorError::CreateRuntimeDir {
        path: base_dir.display().to_string(),
        source,
    })?;

    let resolver = SocketPathResolver::new(base_dir);
    let applet_socket = resolver
        .resolve(&applet_id.socket_file_name())
        .map_err(|source| SupervisorError::CreateRuntimeDir { path: base_dir.display().to_string(), source })?;
    crate::socket_path::remove_stale_socket(&applet_socket).map_err(|source| SupervisorError::RemoveStaleSocket {
        path: applet_socket.display().to_string(),
        source,
    })?;

    let bun_bin = env::bun_bin();
    let mut command = Command::new(&bun_bin);
    command
        .arg(entry_point)
        .env("IOTA_APPLET_ID", applet_id.as_str())
        .env("IOTA_ENGINE_SOCKET", engine_socket)
        .env("IOTA_APPLET_SOCKET", &applet_socket)
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .kill_on_drop(false);

    let mut handle = spawn_tracked(command, applet_id).map_err(|e| SupervisorError::Spawn {
        applet_id: applet_id.to_string(),
        message: e.to_string(),
    })?;

    if let Err(elapsed) = health::wait_for_health(&applet_socket, env::health_timeout(), env::health_poll_delay()).await
    {
        let _ = terminate(applet_id, &mut handle, env::shutdown_grace()).await;
        return Err(SupervisorError::HealthTimeout {
            applet_id: applet_id.to_string(),
            timeout_secs: elapsed.as_secs_f64(),
        });
    }

    Ok(AppletProcess {
        applet_id: applet_id.clone(),
        entry_point: entry_point.to_string(),
        applet_socket,
        handle,
        started_at: Instant::now(),
    })
}

/// Spawn `command`, returning a [`ProcessHandle`] backed by a reaper task
/// that owns the child and records its exit status. Split out of
/// [`start_process`] so tests can exercise [`ProcessHandle`]/[`terminate`]
/// against an arbitrary command without a real applet runtime.
fn spawn_tracked(mut command: Command, applet_id: &AppletId) -> std::io::Result<ProcessHandle> {
    let mut child = command.spawn()?;
    let pid = child
        .id()
        .ok_or_else(|| std::io::Error::other("child had no pid (already reaped before observation)"))?;

    let (exit_tx, exit_rx) = watch::channel(None);
    let reaper_applet_id = applet_id.clone();
    tokio::spawn(async move {
        let status = child.wait().await;
        match &status {
            Ok(s) => debug!(applet_id = %reaper_applet_id, status = %s, "applet process exited"),
            Err(e) => error!(applet_id = %reaper_applet_id, error = %e, "failed to wait on applet process"),
        }
        // Receiver drop races are harmless: nobody is left to observe the exit.
        let _ = exit_tx.send(status.ok());
    });

    Ok(ProcessHandle { pid, exit_rx })
}

/// Send `signal` to `pid`, treating "no such process" as success (it is
/// already gone by the time we got around to signalling it).
fn send_signal(pid: u32, signal: Signal) -> nix::Result<()> {
    match kill(Pid::from_raw(pid as i32), signal) {
        Ok(()) => Ok(()),
        Err(Errno::ESRCH) => Ok(()),
        Err(e) => Err(e),
    }
}

/// Process termination helper (spec.md §4.7): polite signal, bounded wait,
/// then force-kill. "Already exited" is success at every step.
pub async fn terminate(applet_id: &AppletId, handle: &mut ProcessHandle, timeout: Duration) -> Result<(), SupervisorError> {
    if !handle.is_running() {
        return Ok(());
    }

    request_termination(handle);

    if tokio::time::timeout(timeout, handle.wait_for_exit()).await.is_ok() {
        return Ok(());
    }

    force_kill(applet_id, handle).await
}

/// Send the polite signal only, without waiting. Used when shutting down
/// several processes at once: every live process gets SIGTERM up front so
/// they all share one grace window instead of each waiting out its own
/// (spec.md §4.7 steps 2-4).
pub fn request_termination(handle: &ProcessHandle) {
    let _ = send_signal(handle.pid(), Signal::SIGTERM);
}

/// If `handle` is still alive, SIGKILL it and reap the exit. Used after a
/// shared grace window has already elapsed for every process being shut
/// down together.
pub async fn force_kill_if_still_running(applet_id: &AppletId, handle: &mut ProcessHandle) -> Result<(), SupervisorError> {
    if !handle.is_running() {
        return Ok(());
    }
    force_kill(applet_id, handle).await
}

async fn force_kill(applet_id: &AppletId, handle: &mut ProcessHandle) -> Result<(), SupervisorError> {
    send_signal(handle.pid(), Signal::SIGKILL).map_err(|e| SupervisorError::Terminate {
        applet_id: applet_id.to_string(),
        message: e.to_string(),
    })?;
    let _ = handle.wait_for_exit().await;
    Ok(())
}

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;
