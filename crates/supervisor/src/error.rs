// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the applet runtime supervisor.

use thiserror::Error;

/// Errors returned by [`crate::manager::Manager`] operations.
///
/// Variant grouping follows the error-kind taxonomy of the transport this
/// crate implements: configuration problems, filesystem problems, child
/// process problems, transport problems, and shutdown-in-progress.
#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("entry point missing for applet {applet_id}")]
    MissingEntryPoint { applet_id: String },

    #[error("applet {applet_id} is disabled")]
    Disabled { applet_id: String },

    #[error("failed to create runtime directory {path}: {source}")]
    CreateRuntimeDir {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to bind engine socket at {path}: {source}")]
    BindEngineSocket {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to remove stale socket at {path}: {source}")]
    RemoveStaleSocket {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to spawn applet {applet_id}: {message}")]
    Spawn { applet_id: String, message: String },

    #[error("applet {applet_id} did not become healthy within {timeout_secs:.1}s")]
    HealthTimeout { applet_id: String, timeout_secs: f64 },

    #[error("failed to terminate applet {applet_id}: {message}")]
    Terminate { applet_id: String, message: String },

    #[error(transparent)]
    Transport(#[from] crate::http_client::HttpError),

    #[error("applet {applet_id} is not running")]
    NotRunning { applet_id: String },

    #[error("supervisor is shutting down")]
    ShuttingDown,
}

/// Errors surfaced by the file-store bridge (C8), translated to HTTP status
/// codes by the handler that catches them.
#[derive(Debug, Error)]
pub enum FileStoreError {
    #[error("missing applet id")]
    MissingAppletId,

    #[error("no file store registered for applet {applet_id}")]
    NotConfigured { applet_id: String },

    #[error("missing file name")]
    MissingFileName,

    #[error("missing file id")]
    MissingFileId,

    #[error("store error: {0}")]
    Store(String),
}

impl FileStoreError {
    /// HTTP status the bridge handlers (C8) translate this error to
    /// (spec.md §7: "400 for client-shape problems ... 500 for store errors").
    pub fn status_code(&self) -> u16 {
        match self {
            Self::MissingAppletId | Self::NotConfigured { .. } | Self::MissingFileName | Self::MissingFileId => 400,
            Self::Store(_) => 500,
        }
    }
}
