// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine Socket Server (C3): the process-wide HTTP surface children POST
//! back to.
//!
//! Routing only — the handlers delegate to host-registered capabilities
//! reached through [`EngineCallbacks`], which [`crate::manager::Manager`]
//! implements. Kept separate from `manager.rs` so the wire-level request
//! parsing/status-code mapping is testable without a running `Manager`.

use crate::error::FileStoreError;
use crate::file_store::FileStore;
use crate::http_server::{Handler, Request, Response};
use applet_engine_core::AppletId;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

/// Server-only RPC relay invoked by `POST /rpc`. The supervisor does not
/// interpret the method/params shape (spec.md §1 Non-goals): it forwards
/// the request to whatever dispatcher the host registers.
#[async_trait]
pub trait RpcRelay: Send + Sync {
    async fn call(&self, applet_id: &AppletId, tenant_id: Option<&str>, body: Value) -> Result<Value, String>;
}

/// What [`EngineHandler`] needs from the `Manager` to route a request. A
/// narrow seam rather than a direct `Manager` dependency, so the handler
/// can be unit-tested against a stub.
pub trait EngineCallbacks: Send + Sync {
    fn file_store(&self, applet_id: &str) -> Option<Arc<dyn FileStore>>;
    fn rpc_relay(&self) -> Option<Arc<dyn RpcRelay>>;
}

const HEADER_APPLET_ID: &str = "x-iota-applet-id";
const HEADER_TENANT_ID: &str = "x-iota-tenant-id";
const HEADER_FILE_NAME: &str = "x-iota-file-name";
const HEADER_CONTENT_TYPE: &str = "x-iota-content-type";

pub struct EngineHandler {
    callbacks: Arc<dyn EngineCallbacks>,
}

impl EngineHandler {
    pub fn new(callbacks: Arc<dyn EngineCallbacks>) -> Self {
        Self { callbacks }
    }
}

#[async_trait]
impl Handler for EngineHandler {
    async fn handle(&self, request: Request) -> Response {
        match request.path.as_str() {
            "/rpc" if request.method == "POST" => handle_rpc(&*self.callbacks, &request).await,
            "/rpc" => Response::status(405),
            "/files/store" if request.method == "POST" => match do_store(&*self.callbacks, &request).await {
                Ok(record) => Response::json(200, &record),
                Err(e) => Response::json(e.status_code(), &json!({ "error": e.to_string() })),
            },
            "/files/store" => Response::status(405),
            "/files/get" if request.method == "GET" => match do_get(&*self.callbacks, &request).await {
                Ok(record) => Response::json(200, &record),
                Err(e) => Response::json(e.status_code(), &json!({ "error": e.to_string() })),
            },
            "/files/get" => Response::status(405),
            "/files/delete" if request.method == "DELETE" => match do_delete(&*self.callbacks, &request).await {
                Ok(ok) => Response::json(200, &json!({ "ok": ok })),
                Err(e) => Response::json(e.status_code(), &json!({ "error": e.to_string() })),
            },
            "/files/delete" => Response::status(405),
            _ => Response::status(404),
        }
    }
}

async fn handle_rpc(callbacks: &dyn EngineCallbacks, request: &Request) -> Response {
    let Some(applet_id) = request.header(HEADER_APPLET_ID).filter(|v| !v.is_empty()) else {
        return Response::json(400, &json!({ "error": "missing applet id" }));
    };
    let tenant_id = request.header(HEADER_TENANT_ID);

    let body: Value = match serde_json::from_slice(&request.body) {
        Ok(v) => v,
        Err(e) => return Response::json(400, &json!({ "error": format!("malformed json body: {e}") })),
    };

    let Some(relay) = callbacks.rpc_relay() else {
        return Response::json(501, &json!({ "error": "no rpc relay registered" }));
    };

    let applet_id = AppletId::new(applet_id);
    match relay.call(&applet_id, tenant_id, body).await {
        Ok(result) => Response::json(200, &result),
        Err(message) => Response::json(500, &json!({ "error": message })),
    }
}

async fn do_store(callbacks: &dyn EngineCallbacks, request: &Request) -> Result<Value, FileStoreError> {
    let applet_id = request
        .header(HEADER_APPLET_ID)
        .filter(|v| !v.is_empty())
        .ok_or(FileStoreError::MissingAppletId)?;
    let tenant_id = request.header(HEADER_TENANT_ID).unwrap_or("default");
    let name = request
        .header(HEADER_FILE_NAME)
        .or_else(|| request.query_param("name"))
        .filter(|v| !v.is_empty())
        .ok_or(FileStoreError::MissingFileName)?;
    let content_type = request
        .header(HEADER_CONTENT_TYPE)
        .or_else(|| request.header("content-type"))
        .unwrap_or("application/octet-stream");

    let store = callbacks
        .file_store(applet_id)
        .ok_or_else(|| FileStoreError::NotConfigured { applet_id: applet_id.to_string() })?;

    store
        .store(tenant_id, name, content_type, &request.body)
        .await
}

async fn do_get(callbacks: &dyn EngineCallbacks, request: &Request) -> Result<Value, FileStoreError> {
    let id = request.query_param("id").filter(|v| !v.is_empty()).ok_or(FileStoreError::MissingFileId)?;
    let applet_id = request
        .query_param("applet")
        .filter(|v| !v.is_empty())
        .ok_or(FileStoreError::MissingAppletId)?;

    let store = callbacks
        .file_store(applet_id)
        .ok_or_else(|| FileStoreError::NotConfigured { applet_id: applet_id.to_string() })?;

    Ok(store.get(id).await?.unwrap_or(Value::Null))
}

async fn do_delete(callbacks: &dyn EngineCallbacks, request: &Request) -> Result<bool, FileStoreError> {
    let id = request.query_param("id").filter(|v| !v.is_empty()).ok_or(FileStoreError::MissingFileId)?;
    let applet_id = request
        .query_param("applet")
        .filter(|v| !v.is_empty())
        .ok_or(FileStoreError::MissingAppletId)?;

    let store = callbacks
        .file_store(applet_id)
        .ok_or_else(|| FileStoreError::NotConfigured { applet_id: applet_id.to_string() })?;

    store.delete(id).await
}

#[cfg(test)]
#[path = "engine_server_tests.rs"]
mod tests;
