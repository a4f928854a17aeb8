// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Enablement Gate (C1).
//!
//! A thin, named entry point onto [`crate::env::applet_enabled`] so callers
//! reason about "is this applet allowed to run" as its own component,
//! separate from the general environment-variable accessors in
//! [`crate::env`].

use crate::env;
use applet_engine_core::AppletId;

/// Returns true iff `applet_id` is permitted to be spawned, per the
/// `IOTA_APPLET_ENGINE_<ID>` environment gate.
pub fn enabled(applet_id: &AppletId) -> bool {
    env::applet_enabled(applet_id)
}
