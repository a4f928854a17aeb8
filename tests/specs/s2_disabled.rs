// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::prelude::*;
use applet_engine_core::AppletId;
use serial_test::serial;

#[tokio::test]
#[serial(fake_applet_env)]
async fn disabled_applet_never_spawns_a_process() {
    let harness = Harness::new();
    let id = AppletId::new("s2-disabled");
    disable(&id);

    let result = harness.manager.ensure_started(&id, Some("index.ts")).await.unwrap();
    assert!(result.is_none(), "a disabled applet must not report a running process");
    assert!(
        harness.manager.engine_socket_path().is_none(),
        "a disabled applet must not even bring up the engine socket"
    );

    let err = harness
        .manager
        .dispatch_job(&id, "tenant-1", "job-1", "doThing", serde_json::json!({}))
        .await
        .unwrap_err();
    assert!(matches!(err, applet_engine_supervisor::SupervisorError::Disabled { .. }));

    harness.manager.shutdown().await.unwrap();
}
