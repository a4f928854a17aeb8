// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::prelude::*;
use applet_engine_core::AppletId;
use serial_test::serial;
use std::time::Duration;

#[tokio::test]
#[serial(fake_applet_env)]
async fn enabled_applet_starts_and_answers_all_three_dispatch_routes() {
    std::env::remove_var("FAKE_APPLET_CRASH_AFTER_MS");
    std::env::remove_var("FAKE_APPLET_ECHO_HEADERS");
    let harness = Harness::new();
    let id = AppletId::new("s1-happy-path");
    enable(&id);

    let info = harness
        .manager
        .ensure_started(&id, Some("index.ts"))
        .await
        .expect("ensure_started should succeed")
        .expect("enabled applet must start");
    assert_eq!(info.applet_id, id);
    assert!(info.pid > 0);

    let engine_socket = harness.manager.engine_socket_path().expect("engine socket must be initialized");
    assert!(engine_socket.to_string_lossy().ends_with("engine.sock"));

    // EnsureStarted is idempotent: a second call returns the same process.
    let again = harness.manager.ensure_started(&id, Some("index.ts")).await.unwrap().unwrap();
    assert_eq!(again.pid, info.pid);

    harness
        .manager
        .dispatch_job(&id, "tenant-1", "job-1", "doThing", serde_json::json!({ "n": 1 }))
        .await
        .expect("dispatch_job should reach the running applet");

    harness
        .manager
        .dispatch_websocket_event(&id, "tenant-1", "conn-1", "message", b"hi")
        .await
        .expect("dispatch_websocket_event should reach the running applet");

    let result = harness
        .manager
        .call_public_method(&id, "ping", serde_json::json!({}), &Default::default())
        .await
        .expect("call_public_method should reach the running applet");
    assert_eq!(result["ok"], true);

    harness.manager.shutdown().await.unwrap();
    disable(&id);
    tokio::time::sleep(Duration::from_millis(50)).await;
}
