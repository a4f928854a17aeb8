// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lifecycle Supervisor (C6): one task per applet id that awaits process
//! exit, computes backoff, and respawns.
//!
//! The state machine is spec.md §4.6's: each outer loop iteration owns one
//! process's lifetime (wait for its exit), and a nested retry loop owns the
//! backoff-then-respawn cycle, so a failed respawn attempt grows the
//! backoff without re-entering the outer wait (there is nothing to wait on
//! yet — the respawn hasn't produced a new process).

use crate::manager::{Inner, SlotClaim};
use crate::{env, process};
use applet_engine_core::AppletId;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{debug, error, info};

/// `min(2^min(n,5) s, 30s)`; `n = 0` yields 1s (spec.md §4.6/§8 property 6).
pub fn compute_backoff(attempt: u32) -> Duration {
    let exp = attempt.min(5);
    let secs = 1u64 << exp;
    Duration::from_secs(secs.min(30))
}

/// Spawn the monitor task for `applet_id`. Exits once the id has no
/// [`crate::manager::Slot::Running`] entry left (removed by `Shutdown` or
/// never replaced after a terminal failure) or the Manager starts
/// shutting down.
pub(crate) fn spawn_monitor(inner: Arc<Inner>, applet_id: AppletId) {
    tokio::spawn(async move {
        loop {
            let (mut handle, entry_point) = match inner.running_snapshot(&applet_id) {
                Some(snapshot) => snapshot,
                None => return,
            };

            let status = handle.wait_for_exit().await;

            if inner.is_shutting_down() {
                return;
            }

            match status {
                Some(s) if s.success() => info!(applet_id = %applet_id, "applet exited cleanly"),
                Some(s) => error!(applet_id = %applet_id, status = %s, "applet exited with a non-zero status"),
                None => error!(applet_id = %applet_id, "applet exit status could not be determined"),
            }

            // Install the Spawning sentinel ourselves before backing off, so
            // a concurrent `ensure_started`/`dispatch_*` call sees the dead
            // process's slot as "a respawn is already in flight" rather than
            // "nothing here" and parks on it instead of spawning a second
            // child (spec.md §3 invariants 1 and 4). If the slot has already
            // moved on without us — another caller claimed it first, or
            // already finished replacing it — step down: that caller's
            // eventual success spawns its own monitor.
            let notify = match inner.claim_for_respawn(&applet_id) {
                SlotClaim::Claimed(notify) => notify,
                SlotClaim::AwaitSpawn(_) | SlotClaim::Running(_) => return,
            };

            if !respawn_until_success_or_shutdown(&inner, &applet_id, &entry_point, &notify).await {
                notify.notify_waiters();
                return;
            }
        }
    });
}

/// Runs the backoff-then-respawn retry loop. Returns `true` once a respawn
/// succeeds (so the outer loop can go back to waiting on the new process),
/// `false` if shutdown was observed first (so the outer loop should stop).
/// The caller is responsible for waking `notify`'s waiters once this
/// returns `false`; on success this resolves `notify` itself before
/// returning `true`.
async fn respawn_until_success_or_shutdown(
    inner: &Arc<Inner>,
    applet_id: &AppletId,
    entry_point: &str,
    notify: &Arc<Notify>,
) -> bool {
    loop {
        let attempt = inner.take_attempt_and_bump(applet_id);
        let backoff = compute_backoff(attempt);
        debug!(applet_id = %applet_id, attempt, backoff_secs = backoff.as_secs(), "backing off before respawn");

        tokio::select! {
            _ = tokio::time::sleep(backoff) => {}
            () = inner.shutdown_notified() => return false,
        }
        if inner.is_shutting_down() {
            return false;
        }

        let Some(engine_socket) = inner.engine_socket_path() else {
            error!(applet_id = %applet_id, "engine socket not initialized, cannot respawn yet");
            continue;
        };

        match tokio::time::timeout(
            env::respawn_timeout(),
            process::start_process(inner.base_dir(), applet_id, entry_point, &engine_socket),
        )
        .await
        {
            Ok(Ok(new_process)) => {
                inner.replace_running(applet_id.clone(), new_process);
                notify.notify_waiters();
                // Shutdown may have started while the respawn (including its
                // health wait) was in flight; mirror spawn_and_register's
                // same check so a respawned child never outlives Shutdown's
                // return (spec.md §4.7).
                if inner.is_shutting_down() {
                    inner.force_kill_running(applet_id).await;
                    return false;
                }
                info!(applet_id = %applet_id, "applet respawned successfully");
                return true;
            }
            Ok(Err(e)) => {
                error!(applet_id = %applet_id, error = %e, "respawn attempt failed, backoff will grow");
            }
            Err(_) => {
                error!(applet_id = %applet_id, "respawn attempt timed out, backoff will grow");
            }
        }

        if inner.is_shutting_down() {
            return false;
        }
    }
}

#[cfg(test)]
#[path = "monitor_tests.rs"]
mod tests;
