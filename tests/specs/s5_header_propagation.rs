// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::prelude::*;
use applet_engine_core::AppletId;
use applet_engine_supervisor::PublicRpcHeaders;
use serial_test::serial;
use std::time::Duration;

#[tokio::test]
#[serial(fake_applet_env)]
async fn call_public_method_propagates_all_five_headers() {
    std::env::remove_var("FAKE_APPLET_CRASH_AFTER_MS");
    std::env::set_var("FAKE_APPLET_ECHO_HEADERS", "1");
    let harness = Harness::new();
    let id = AppletId::new("s5-header-propagation");
    enable(&id);

    harness.manager.ensure_started(&id, Some("index.ts")).await.unwrap();

    let headers = PublicRpcHeaders {
        tenant_id: Some("tenant-9".to_string()),
        user_id: Some("user-9".to_string()),
        request_id: Some("req-9".to_string()),
        cookie: Some("session=abc".to_string()),
        authorization: Some("Bearer xyz".to_string()),
    };
    let result = tokio::time::timeout(
        Duration::from_secs(5),
        harness.manager.call_public_method(&id, "ping", serde_json::json!({}), &headers),
    )
    .await
    .expect("call_public_method timed out")
    .expect("call_public_method should succeed");

    let echoed = &result["headers"];
    assert_eq!(echoed["x-iota-tenant-id"], "tenant-9");
    assert_eq!(echoed["x-iota-user-id"], "user-9");
    assert_eq!(echoed["x-iota-request-id"], "req-9");
    assert_eq!(echoed["cookie"], "session=abc");
    assert_eq!(echoed["authorization"], "Bearer xyz");

    harness.manager.shutdown().await.unwrap();
    disable(&id);
    std::env::remove_var("FAKE_APPLET_ECHO_HEADERS");
}
