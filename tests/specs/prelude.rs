// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared harness for the `specs` integration tests.

use applet_engine_core::AppletId;
use applet_engine_supervisor::Manager;
use std::time::Duration;

/// Absolute path to the `fake-applet` binary cargo built for this test run.
pub fn fake_applet_bin() -> String {
    env!("CARGO_BIN_EXE_fake-applet").to_string()
}

/// Point `IOTA_APPLET_ENGINE_BUN_BIN` at `fake-applet` so
/// `process::start_process` launches the fixture instead of a real `bun`.
pub fn use_fake_applet_as_bun() {
    std::env::set_var("IOTA_APPLET_ENGINE_BUN_BIN", fake_applet_bin());
}

pub fn enable(id: &AppletId) {
    std::env::set_var(id.enablement_env_key(), "bun");
}

pub fn disable(id: &AppletId) {
    std::env::remove_var(id.enablement_env_key());
}

/// A `Manager` wired to a fresh temp directory, with `fake-applet` standing
/// in for `bun`. Kept alive for the test's duration so the temp dir isn't
/// dropped under a still-running applet.
pub struct Harness {
    pub manager: Manager,
    _dir: tempfile::TempDir,
}

impl Harness {
    pub fn new() -> Self {
        use_fake_applet_as_bun();
        let dir = tempfile::tempdir().expect("create temp base dir");
        let manager = Manager::new(dir.path());
        Self { manager, _dir: dir }
    }
}

/// Poll an async condition every 50ms until it resolves `Ok`, or panic
/// after `timeout`. Used for assertions that need a live RPC round trip
/// (e.g. waiting for a respawned applet to answer again).
pub async fn retry_until_ok<T, E, F, Fut>(timeout: Duration, mut f: F) -> T
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        match f().await {
            Ok(v) => return v,
            Err(e) if tokio::time::Instant::now() < deadline => {
                let _ = e;
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            Err(e) => panic!("condition did not succeed within {timeout:?}: {e}"),
        }
    }
}
