// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stable, caller-supplied applet identifiers.
//!
//! Applet ids are never generated by this crate — they are handed in by the
//! host (e.g. `"bichat"`) and used both as map keys and as the basis of an
//! environment variable name and a socket file name. [`AppletId`] wraps a
//! `SmolStr` rather than allocating a `String` per lookup, since ids are
//! short and looked up frequently under the manager lock.

use smol_str::SmolStr;
use std::borrow::Borrow;
use std::fmt;

/// A stable applet identifier, e.g. `"bichat"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AppletId(SmolStr);

impl AppletId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(SmolStr::new(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The environment variable key that gates this applet, e.g.
    /// `IOTA_APPLET_ENGINE_BICHAT` for id `"bichat"`.
    pub fn enablement_env_key(&self) -> String {
        let upper = self.0.to_uppercase().replace('-', "_");
        format!("IOTA_APPLET_ENGINE_{upper}")
    }

    /// File name for this applet's listening socket, e.g. `"bichat.sock"`.
    pub fn socket_file_name(&self) -> String {
        format!("{}.sock", self.0)
    }
}

impl fmt::Display for AppletId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AppletId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for AppletId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl AsRef<str> for AppletId {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl Borrow<str> for AppletId {
    fn borrow(&self) -> &str {
        self.0.as_str()
    }
}

#[cfg(test)]
#[path = "applet_id_tests.rs"]
mod tests;
