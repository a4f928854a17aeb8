// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the supervisor crate.

use applet_engine_core::AppletId;
use std::path::PathBuf;
use std::time::Duration;

/// C1 Enablement Gate: may `applet_id` be spawned?
///
/// Reads `IOTA_APPLET_ENGINE_<ID>` (uppercased, `-` → `_`) and returns true
/// iff the trimmed value equals `bun`, case-insensitively. An empty applet
/// id is always disabled.
pub fn applet_enabled(applet_id: &AppletId) -> bool {
    if applet_id.is_empty() {
        return false;
    }
    std::env::var(applet_id.enablement_env_key())
        .map(|v| v.trim().eq_ignore_ascii_case("bun"))
        .unwrap_or(false)
}

/// Override for the child runtime executable. Empty (after trimming) is
/// treated the same as unset.
pub fn bun_bin_override() -> Option<String> {
    std::env::var("IOTA_APPLET_ENGINE_BUN_BIN")
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Resolve the runtime executable: the override if set, else the literal
/// `bun` (resolved via `PATH` by the process spawn).
pub fn bun_bin() -> String {
    bun_bin_override().unwrap_or_else(|| "bun".to_string())
}

/// Default socket base directory: `IOTA_APPLET_ENGINE_BASE_DIR` override,
/// else `$TMPDIR/iota-applet-engine` (or `/tmp/iota-applet-engine` if
/// `TMPDIR` is unset). Callers may still supply an explicit directory to
/// [`crate::manager::Manager::new`]; this is only the default.
pub fn base_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("IOTA_APPLET_ENGINE_BASE_DIR") {
        return PathBuf::from(dir);
    }
    let tmp = std::env::var("TMPDIR").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(tmp).join("iota-applet-engine")
}

/// Health-check timeout budget for a freshly-spawned applet. Default 8s.
pub fn health_timeout() -> Duration {
    std::env::var("IOTA_APPLET_ENGINE_HEALTH_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(8))
}

/// Delay between health-check poll attempts. Default 150ms.
pub fn health_poll_delay() -> Duration {
    std::env::var("IOTA_APPLET_ENGINE_HEALTH_POLL_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_millis(150))
}

/// Grace interval between polite termination and force-kill on shutdown.
/// Default 3s.
pub fn shutdown_grace() -> Duration {
    std::env::var("IOTA_APPLET_ENGINE_SHUTDOWN_GRACE_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(3))
}

/// Timeout budget for a monitor-driven respawn attempt. Default 30s.
pub fn respawn_timeout() -> Duration {
    std::env::var("IOTA_APPLET_ENGINE_RESPAWN_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(30))
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
