// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File-Store Bridge (C8) capability contract.
//!
//! The HTTP handlers that translate child requests into calls on a
//! registered [`FileStore`] live in [`crate::engine_server`]; this module
//! only defines the trait the host implements, plus an in-memory fixture
//! used by this crate's own tests and the `fake-applet` integration
//! harness in place of a real host-backed store.

use crate::error::FileStoreError;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

/// A host-implemented capability for storing/retrieving/deleting opaque
/// file records on behalf of a child applet (spec.md §4.8).
#[async_trait]
pub trait FileStore: Send + Sync {
    async fn store(&self, tenant_id: &str, name: &str, content_type: &str, data: &[u8]) -> Result<Value, FileStoreError>;
    async fn get(&self, id: &str) -> Result<Option<Value>, FileStoreError>;
    async fn delete(&self, id: &str) -> Result<bool, FileStoreError>;
}

/// In-memory [`FileStore`]. Not used in production — the host supplies its
/// own implementation via [`crate::manager::Manager::register_file_store`] —
/// but a convenient fixture for exercising the bridge end to end.
#[derive(Default)]
pub struct InMemoryFileStore {
    records: parking_lot::Mutex<HashMap<String, Value>>,
}

impl InMemoryFileStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FileStore for InMemoryFileStore {
    async fn store(&self, tenant_id: &str, name: &str, content_type: &str, data: &[u8]) -> Result<Value, FileStoreError> {
        let id = nanoid::nanoid!(12);
        let record = serde_json::json!({
            "id": id,
            "name": name,
            "contentType": content_type,
            "tenantId": tenant_id,
            "size": data.len(),
        });
        self.records.lock().insert(id, record.clone());
        Ok(record)
    }

    async fn get(&self, id: &str) -> Result<Option<Value>, FileStoreError> {
        Ok(self.records.lock().get(id).cloned())
    }

    async fn delete(&self, id: &str) -> Result<bool, FileStoreError> {
        Ok(self.records.lock().remove(id).is_some())
    }
}

#[cfg(test)]
#[path = "file_store_tests.rs"]
mod tests;
