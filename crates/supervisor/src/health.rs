// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Health Waiter (C5).
//!
//! Polls a freshly-spawned applet's `/__health` endpoint until it answers
//! 2xx or the deadline elapses. Transport failures (socket not bound yet)
//! and non-2xx HTTP responses are treated identically: sleep the poll delay
//! and retry.

use crate::http_client;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::debug;

/// Waits for `socket_path` to answer 2xx on `/__health` within `timeout`.
///
/// Returns `Ok(())` on success, `Err(elapsed)` carrying the elapsed time on
/// timeout so callers can build a descriptive error message.
pub async fn wait_for_health(socket_path: &Path, timeout: Duration, poll_delay: Duration) -> Result<(), Duration> {
    let start = Instant::now();
    loop {
        if start.elapsed() >= timeout {
            return Err(start.elapsed());
        }

        match http_client::get(socket_path, "/__health", &[]).await {
            Ok(resp) if (200..300).contains(&resp.status) => return Ok(()),
            Ok(resp) => {
                debug!(status = resp.status, "health check returned non-2xx, retrying");
            }
            Err(e) => {
                debug!(error = %e, "health check transport error, retrying");
            }
        }

        tokio::time::sleep(poll_delay).await;
    }
}

#[cfg(test)]
#[path = "health_tests.rs"]
mod tests;
