// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::http_client;
use tokio::sync::oneshot;

struct EchoHandler;

#[async_trait]
impl Handler for EchoHandler {
    async fn handle(&self, request: Request) -> Response {
        match (request.method.as_str(), request.path.as_str()) {
            ("GET", "/__health") => Response::status(200),
            ("GET", "/echo") => {
                let name = request.query_param("name").unwrap_or("").to_string();
                Response::text(200, name)
            }
            ("POST", "/upper") => {
                let body = String::from_utf8_lossy(&request.body).to_uppercase();
                Response::text(200, body)
            }
            _ => Response::status(404),
        }
    }
}

async fn spawn_echo_server() -> (std::path::PathBuf, tempfile::TempDir, oneshot::Sender<()>) {
    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join("engine.sock");
    let listener = UnixListener::bind(&socket).unwrap();
    let (tx, rx) = oneshot::channel();
    tokio::spawn(serve(listener, Arc::new(EchoHandler), rx));
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    (socket, dir, tx)
}

#[tokio::test]
async fn health_check_returns_200() {
    let (socket, _dir, _tx) = spawn_echo_server().await;
    let resp = http_client::get(&socket, "/__health", &[]).await.unwrap();
    assert_eq!(resp.status, 200);
}

#[tokio::test]
async fn query_params_are_parsed_and_urldecoded() {
    let (socket, _dir, _tx) = spawn_echo_server().await;
    let resp = http_client::get(&socket, "/echo?name=hello%20world", &[]).await.unwrap();
    assert_eq!(String::from_utf8(resp.body).unwrap(), "hello world");
}

#[tokio::test]
async fn post_body_reaches_handler() {
    let (socket, _dir, _tx) = spawn_echo_server().await;
    let resp = http_client::post(&socket, "/upper", &[], b"hi there").await.unwrap();
    assert_eq!(String::from_utf8(resp.body).unwrap(), "HI THERE");
}

#[tokio::test]
async fn unknown_route_is_404() {
    let (socket, _dir, _tx) = spawn_echo_server().await;
    let err = http_client::get(&socket, "/nope", &[]).await.unwrap_err();
    assert!(matches!(err, http_client::HttpError::Status { status: 404, .. }));
}

#[tokio::test]
async fn shutdown_signal_stops_the_accept_loop() {
    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join("engine.sock");
    let listener = UnixListener::bind(&socket).unwrap();
    let (tx, rx) = oneshot::channel();
    let task = tokio::spawn(serve(listener, Arc::new(EchoHandler), rx));
    tx.send(()).unwrap();
    tokio::time::timeout(std::time::Duration::from_secs(1), task)
        .await
        .expect("accept loop should stop promptly after shutdown signal")
        .unwrap();
}
