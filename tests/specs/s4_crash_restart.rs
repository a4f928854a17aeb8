// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::prelude::*;
use applet_engine_core::AppletId;
use serial_test::serial;
use std::time::Duration;

#[tokio::test]
#[serial(fake_applet_env)]
async fn crashed_applet_is_automatically_respawned() {
    std::env::remove_var("FAKE_APPLET_ECHO_HEADERS");
    let harness = Harness::new();
    let id = AppletId::new("s4-crash-restart");
    enable(&id);

    // The respawned process must not crash again, so the crash flag is
    // cleared right after the first child inherits it — only the initial
    // spawn sees it set.
    std::env::set_var("FAKE_APPLET_CRASH_AFTER_MS", "150");
    let first = harness.manager.ensure_started(&id, Some("index.ts")).await.unwrap().unwrap();
    std::env::remove_var("FAKE_APPLET_CRASH_AFTER_MS");

    // compute_backoff(0) == 1s (spec.md §8 property 6), so the respawn
    // lands well within this budget once the crash is observed.
    let result = retry_until_ok(Duration::from_secs(8), || {
        harness.manager.call_public_method(&id, "ping", serde_json::json!({}), &Default::default())
    })
    .await;
    assert_eq!(result["ok"], true);

    let after_restart = harness.manager.ensure_started(&id, Some("index.ts")).await.unwrap().unwrap();
    assert_ne!(after_restart.pid, first.pid, "the respawned process must have a new pid");

    harness.manager.shutdown().await.unwrap();
    disable(&id);
}
