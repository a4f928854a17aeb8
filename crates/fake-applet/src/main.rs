// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stand-in applet runtime for integration tests, playing the role a real
//! `bun`-launched process plays against the supervisor: it binds
//! `IOTA_APPLET_SOCKET`, answers `/__health` immediately, and echoes back
//! enough of what it receives on `/__public_rpc`, `/__job`, and `/__ws`
//! for a test to assert on. Not part of the supervisor's public API.

use anyhow::{anyhow, Context};
use applet_engine_supervisor::http_server::{serve, Handler, Request, Response};
use async_trait::async_trait;
use clap::Parser;
use serde_json::json;
use std::sync::Arc;
use tokio::net::UnixListener;
use tracing::info;

#[derive(Parser, Debug)]
struct Args {
    /// Entry point path `start_process` invokes every `bun`-launched applet
    /// with. This fixture has no script to run, so the value is accepted
    /// and ignored rather than rejected as an unknown positional.
    entry_point: Option<String>,

    /// Exit (simulating a crash) this many milliseconds after startup.
    #[arg(long)]
    crash_after_ms: Option<u64>,

    /// Include the request's headers in JSON responses, for the header
    /// propagation scenario (S5).
    #[arg(long, default_value_t = false)]
    echo_headers: bool,
}

struct FakeApplet {
    echo_headers: bool,
}

#[async_trait]
impl Handler for FakeApplet {
    async fn handle(&self, request: Request) -> Response {
        match (request.method.as_str(), request.path.as_str()) {
            ("GET", "/__health") => Response::status(200),
            ("POST", "/__public_rpc") => Response::json(200, &self.envelope(&request)),
            ("POST", "/__job") => Response::json(200, &self.envelope(&request)),
            ("POST", "/__ws") => Response::json(200, &self.envelope(&request)),
            _ => Response::status(404),
        }
    }
}

impl FakeApplet {
    fn envelope(&self, request: &Request) -> serde_json::Value {
        let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap_or(serde_json::Value::Null);
        let mut result = json!({ "ok": true, "received": body });
        if self.echo_headers {
            result["headers"] = json!(request.headers);
        }
        json!({ "result": result })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let args = Args::parse();
    let socket_path = std::env::var("IOTA_APPLET_SOCKET")
        .map_err(|_| anyhow!("IOTA_APPLET_SOCKET must be set"))?;
    let applet_id = std::env::var("IOTA_APPLET_ID").unwrap_or_default();
    info!(applet_id, socket_path, "fake-applet starting");

    // `start_process` invokes the runtime binary with a single entry-point
    // argument (spec.md §4.4), so there is nowhere to thread CLI flags
    // through when this fixture stands in for `bun`. Fall back to
    // environment variables, which `Command` inherits from the supervisor's
    // own process, for that case; the flags remain usable when this binary
    // is run by hand.
    let crash_after_ms = args.crash_after_ms.or_else(|| {
        std::env::var("FAKE_APPLET_CRASH_AFTER_MS").ok().and_then(|v| v.parse().ok())
    });
    let echo_headers = args.echo_headers || std::env::var("FAKE_APPLET_ECHO_HEADERS").is_ok();

    let _ = std::fs::remove_file(&socket_path);
    let listener = UnixListener::bind(&socket_path)
        .with_context(|| format!("failed to bind applet socket at {socket_path}"))?;

    let handler: Arc<dyn Handler> = Arc::new(FakeApplet { echo_headers });
    let (_shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

    if let Some(crash_after_ms) = crash_after_ms {
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(crash_after_ms)).await;
            std::process::exit(1);
        });
    }

    serve(listener, handler, shutdown_rx).await;
    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::registry().with(filter).with(fmt::layer()).try_init();
}
