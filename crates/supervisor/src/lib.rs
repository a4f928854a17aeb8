// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! applet-engine-supervisor: spawns, health-checks, and restarts per-applet
//! `bun` processes, and bridges their callbacks back to the host over a
//! process-wide Unix socket.

pub mod engine_server;
pub mod env;
pub mod error;
pub mod file_store;
pub mod gate;
pub mod health;
pub mod http_client;
pub mod http_server;
pub mod manager;
pub mod monitor;
pub mod process;
pub mod socket_path;

pub use error::{FileStoreError, SupervisorError};
pub use manager::{Manager, PublicRpcHeaders};
pub use process::AppletProcessInfo;
