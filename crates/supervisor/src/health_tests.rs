// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::http_server::{serve, Handler, Request, Response};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::net::UnixListener;
use tokio::sync::oneshot;

struct FlakyHealth {
    fail_first_n: u32,
    attempts: AtomicU32,
}

#[async_trait]
impl Handler for FlakyHealth {
    async fn handle(&self, request: Request) -> Response {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if request.path != "/__health" {
            return Response::status(404);
        }
        if attempt < self.fail_first_n {
            Response::status(503)
        } else {
            Response::status(200)
        }
    }
}

#[tokio::test]
async fn succeeds_once_health_turns_2xx() {
    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join("a.sock");
    let listener = UnixListener::bind(&socket).unwrap();
    let handler = Arc::new(FlakyHealth { fail_first_n: 2, attempts: AtomicU32::new(0) });
    let (_tx, rx) = oneshot::channel();
    tokio::spawn(serve(listener, handler, rx));

    let result = wait_for_health(&socket, Duration::from_secs(2), Duration::from_millis(10)).await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn times_out_when_socket_never_appears() {
    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join("never.sock");
    let result = wait_for_health(&socket, Duration::from_millis(100), Duration::from_millis(20)).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn times_out_when_health_stays_unhealthy() {
    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join("a.sock");
    let listener = UnixListener::bind(&socket).unwrap();
    let handler = Arc::new(FlakyHealth { fail_first_n: u32::MAX, attempts: AtomicU32::new(0) });
    let (_tx, rx) = oneshot::channel();
    tokio::spawn(serve(listener, handler, rx));

    let result = wait_for_health(&socket, Duration::from_millis(100), Duration::from_millis(20)).await;
    assert!(result.is_err());
}
