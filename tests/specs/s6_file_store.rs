// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::prelude::*;
use applet_engine_core::AppletId;
use applet_engine_supervisor::file_store::InMemoryFileStore;
use applet_engine_supervisor::http_client;
use serde_json::Value;
use serial_test::serial;
use std::sync::Arc;

#[tokio::test]
#[serial(fake_applet_env)]
async fn file_store_bridge_round_trips_through_the_engine_socket() {
    std::env::remove_var("FAKE_APPLET_CRASH_AFTER_MS");
    std::env::remove_var("FAKE_APPLET_ECHO_HEADERS");
    let harness = Harness::new();
    let id = AppletId::new("s6-file-store");
    enable(&id);
    harness.manager.register_file_store(id.clone(), Some(Arc::new(InMemoryFileStore::new())));

    // Starting the applet is what brings the engine socket server up
    // (spec.md §4.3: lazily initialized on first EnsureStarted).
    harness.manager.ensure_started(&id, Some("index.ts")).await.unwrap();
    let engine_socket = harness.manager.engine_socket_path().expect("engine socket must be initialized by now");

    let headers = [("X-Iota-Applet-Id", id.as_str()), ("X-Iota-File-Name", "greeting.txt")];
    let resp = http_client::post(&engine_socket, "/files/store", &headers, b"hello from a child applet")
        .await
        .expect("store should succeed");
    let stored: Value = serde_json::from_slice(&resp.body).unwrap();
    let file_id = stored["id"].as_str().unwrap().to_string();

    let resp = http_client::get(&engine_socket, &format!("/files/get?id={file_id}&applet={}", id.as_str()), &[])
        .await
        .expect("get should succeed");
    let fetched: Value = serde_json::from_slice(&resp.body).unwrap();
    assert_eq!(fetched, stored);

    let resp = http_client::delete(&engine_socket, &format!("/files/delete?id={file_id}&applet={}", id.as_str()), &[])
        .await
        .expect("delete should succeed");
    let deleted: Value = serde_json::from_slice(&resp.body).unwrap();
    assert_eq!(deleted["ok"], true);

    harness.manager.shutdown().await.unwrap();
    disable(&id);
}
