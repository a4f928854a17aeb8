// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Manager (C7): the supervisor's public API and the single mutex guarding
//! every other component's shared state (spec.md §3/§5).

use crate::engine_server::{EngineCallbacks, EngineHandler, RpcRelay};
use crate::error::SupervisorError;
use crate::file_store::FileStore;
use crate::gate;
use crate::http_client;
use crate::http_server;
use crate::monitor;
use crate::process::{self, AppletProcess, AppletProcessInfo, ProcessHandle};
use applet_engine_core::AppletId;
use base64::Engine as _;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::UnixListener;
use tokio::sync::{oneshot, Notify};
use tracing::{error, warn};

const HEADER_TENANT_ID: &str = "X-Iota-Tenant-Id";
const HEADER_USER_ID: &str = "X-Iota-User-Id";
const HEADER_REQUEST_ID: &str = "X-Iota-Request-Id";
const HEADER_COOKIE: &str = "Cookie";
const HEADER_AUTHORIZATION: &str = "Authorization";

/// The five headers `CallPublicMethod` propagates verbatim (spec.md §4.7/§6).
#[derive(Debug, Clone, Default)]
pub struct PublicRpcHeaders {
    pub tenant_id: Option<String>,
    pub user_id: Option<String>,
    pub request_id: Option<String>,
    pub cookie: Option<String>,
    pub authorization: Option<String>,
}

/// One applet id's slot in the process table. `Spawning` is the sentinel
/// spec.md §5/§9 mandates to close the double-spawn race: a caller that
/// observes it waits on the `Notify` instead of racing its own spawn.
pub(crate) enum Slot {
    Spawning(Arc<Notify>),
    Running(AppletProcess),
}

/// Result of trying to claim a slot for a spawn or respawn. `Claimed` means
/// the caller now owns installing the replacement process (and must resolve
/// the returned sentinel, success or failure, when it's done); everyone
/// else who observes the same id in the meantime gets `AwaitSpawn` instead
/// of racing a second spawn.
pub(crate) enum SlotClaim {
    Running(AppletProcessInfo),
    AwaitSpawn(Arc<Notify>),
    Claimed(Arc<Notify>),
}

/// Claim `id`'s slot for a spawn: a live `Running` entry is returned as-is,
/// an in-flight `Spawning` sentinel is joined, and anything else (absent,
/// or a `Running` entry whose handle has already exited) is replaced with a
/// fresh sentinel for the caller to resolve. Shared between `ensure_started`
/// (first spawn) and the lifecycle monitor (respawn after a crash) so the
/// two can never both believe they own the same respawn (spec.md §3
/// invariants 1 and 4).
fn claim_for_spawn(state: &mut State, id: &AppletId) -> SlotClaim {
    match state.processes.get(id) {
        Some(Slot::Running(p)) if p.handle.is_running() => SlotClaim::Running(p.info()),
        Some(Slot::Spawning(notify)) => SlotClaim::AwaitSpawn(notify.clone()),
        _ => {
            let notify = Arc::new(Notify::new());
            state.processes.insert(id.clone(), Slot::Spawning(notify.clone()));
            SlotClaim::Claimed(notify)
        }
    }
}

struct EngineServerHandle {
    socket: PathBuf,
    shutdown_tx: oneshot::Sender<()>,
}

struct State {
    engine: Option<EngineServerHandle>,
    processes: HashMap<AppletId, Slot>,
    restart_attempts: HashMap<AppletId, u32>,
    entrypoints: HashMap<AppletId, String>,
    file_stores: HashMap<AppletId, Arc<dyn FileStore>>,
    rpc_relay: Option<Arc<dyn RpcRelay>>,
    shutting_down: bool,
}

/// Shared Manager internals. Kept separate from [`Manager`] so
/// [`crate::monitor`] can hold an `Arc<Inner>` without holding a whole
/// `Manager` (which is just a thin cloneable wrapper around this).
pub(crate) struct Inner {
    base_dir: PathBuf,
    state: Mutex<State>,
    shutdown_notify: Notify,
}

impl Inner {
    pub(crate) fn base_dir(&self) -> &std::path::Path {
        &self.base_dir
    }

    pub(crate) fn is_shutting_down(&self) -> bool {
        self.state.lock().shutting_down
    }

    pub(crate) async fn shutdown_notified(&self) {
        self.shutdown_notify.notified().await;
    }

    pub(crate) fn engine_socket_path(&self) -> Option<PathBuf> {
        self.state.lock().engine.as_ref().map(|e| e.socket.clone())
    }

    /// Snapshot the handle and entry point of the currently running process
    /// for `id`, for the monitor's "wait for this process's exit" step.
    pub(crate) fn running_snapshot(&self, id: &AppletId) -> Option<(ProcessHandle, String)> {
        match self.state.lock().processes.get(id) {
            Some(Slot::Running(p)) => Some((p.handle.clone(), p.entry_point.clone())),
            _ => None,
        }
    }

    /// Returns the pre-increment attempt count for `id` and bumps the
    /// counter for next time (spec.md §4.6 step 4; see monitor.rs's doc
    /// comment for why the *pre*-increment value is what backoff uses).
    pub(crate) fn take_attempt_and_bump(&self, id: &AppletId) -> u32 {
        let mut state = self.state.lock();
        let counter = state.restart_attempts.entry(id.clone()).or_insert(0);
        let attempt = *counter;
        *counter += 1;
        attempt
    }

    /// Install a freshly-respawned process and reset its attempt counter
    /// (spec.md §4.6 step 8, §3 invariant 3).
    pub(crate) fn replace_running(&self, id: AppletId, process: AppletProcess) {
        let mut state = self.state.lock();
        state.processes.insert(id.clone(), Slot::Running(process));
        state.restart_attempts.insert(id, 0);
    }

    /// The monitor's attempt to claim its own dead process's slot for a
    /// respawn. See [`SlotClaim`]: if a concurrent `ensure_started` call
    /// already claimed it (or already finished replacing it), this returns
    /// something other than `Claimed` and the monitor must step down —
    /// whoever did claim it will start a fresh monitor once it succeeds.
    pub(crate) fn claim_for_respawn(&self, id: &AppletId) -> SlotClaim {
        let mut state = self.state.lock();
        claim_for_spawn(&mut state, id)
    }

    /// Remove and kill `id`'s `Running` process if one is present, leaving
    /// anything else (absent, or mid-spawn) untouched. Used both when a
    /// spawn finishes after `Shutdown` has already begun and when a
    /// respawn's health check outlasts it.
    pub(crate) async fn force_kill_running(&self, id: &AppletId) {
        let proc = {
            let mut state = self.state.lock();
            match state.processes.remove(id) {
                Some(Slot::Running(p)) => Some(p),
                other => {
                    if let Some(o) = other {
                        state.processes.insert(id.clone(), o);
                    }
                    None
                }
            }
        };
        if let Some(mut proc) = proc {
            if let Err(e) = process::terminate(id, &mut proc.handle, std::time::Duration::from_millis(500)).await {
                warn!(applet_id = %id, error = %e, "failed to kill applet that outlived shutdown");
            }
        }
    }
}

impl EngineCallbacks for Inner {
    fn file_store(&self, applet_id: &str) -> Option<Arc<dyn FileStore>> {
        self.state.lock().file_stores.get(applet_id).cloned()
    }

    fn rpc_relay(&self) -> Option<Arc<dyn RpcRelay>> {
        self.state.lock().rpc_relay.clone()
    }
}

/// The supervisor's public entry point (spec.md §4.7). Cheaply cloneable —
/// every clone shares the same underlying state.
#[derive(Clone)]
pub struct Manager {
    inner: Arc<Inner>,
}

impl Manager {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            inner: Arc::new(Inner {
                base_dir: base_dir.into(),
                state: Mutex::new(State {
                    engine: None,
                    processes: HashMap::new(),
                    restart_attempts: HashMap::new(),
                    entrypoints: HashMap::new(),
                    file_stores: HashMap::new(),
                    rpc_relay: None,
                    shutting_down: false,
                }),
                shutdown_notify: Notify::new(),
            }),
        }
    }

    /// Register a default entry point for `id`, used when `EnsureStarted`
    /// is called with an empty entry point.
    pub fn register_applet(&self, id: AppletId, entry_point: impl Into<String>) {
        self.inner.state.lock().entrypoints.insert(id, entry_point.into());
    }

    /// Register (or, passing `None`, no-op — spec.md §4.7 "nil store is a
    /// silent no-op") a file store for `id`.
    pub fn register_file_store(&self, id: AppletId, store: Option<Arc<dyn FileStore>>) {
        if let Some(store) = store {
            self.inner.state.lock().file_stores.insert(id, store);
        }
    }

    /// Register the host's RPC dispatcher for the engine socket's
    /// `POST /rpc` route.
    pub fn register_rpc_relay(&self, relay: Arc<dyn RpcRelay>) {
        self.inner.state.lock().rpc_relay = Some(relay);
    }

    /// Lazily-assigned engine socket path; empty until the first
    /// `EnsureStarted` call initializes C3.
    pub fn engine_socket_path(&self) -> Option<PathBuf> {
        self.inner.engine_socket_path()
    }

    /// C7 `EnsureStarted`. See spec.md §4.7 for the full guarantee list.
    pub async fn ensure_started(
        &self,
        id: &AppletId,
        entry_point: Option<&str>,
    ) -> Result<Option<AppletProcessInfo>, SupervisorError> {
        if !gate::enabled(id) {
            return Ok(None);
        }

        loop {
            enum Action {
                ReturnRunning(AppletProcessInfo),
                AwaitSpawn(Arc<Notify>),
                Spawn(String),
            }

            let action = {
                let mut state = self.inner.state.lock();
                if state.shutting_down {
                    return Err(SupervisorError::ShuttingDown);
                }

                let resolved_entry = entry_point
                    .filter(|e| !e.is_empty())
                    .map(str::to_string)
                    .or_else(|| state.entrypoints.get(id).cloned());
                let resolved_entry = match resolved_entry {
                    Some(e) if !e.is_empty() => e,
                    _ => return Err(SupervisorError::MissingEntryPoint { applet_id: id.to_string() }),
                };

                match claim_for_spawn(&mut state, id) {
                    SlotClaim::Running(info) => Action::ReturnRunning(info),
                    SlotClaim::AwaitSpawn(notify) => Action::AwaitSpawn(notify),
                    // A dead `Running` handle (crash observed, monitor not
                    // yet woken) lands here too: `claim_for_spawn` treats it
                    // the same as "no process" and hands us the sentinel, so
                    // the monitor's own respawn attempt sees `AwaitSpawn`
                    // instead of racing a second child onto this id.
                    SlotClaim::Claimed(_notify) => Action::Spawn(resolved_entry),
                }
            };

            match action {
                Action::ReturnRunning(info) => return Ok(Some(info)),
                Action::AwaitSpawn(notify) => {
                    notify.notified().await;
                    continue;
                }
                Action::Spawn(resolved_entry) => {
                    return self.spawn_and_register(id, &resolved_entry).await;
                }
            }
        }
    }

    async fn spawn_and_register(
        &self,
        id: &AppletId,
        entry_point: &str,
    ) -> Result<Option<AppletProcessInfo>, SupervisorError> {
        let engine_socket = match self.ensure_engine_server() {
            Ok(socket) => socket,
            Err(e) => {
                self.resolve_spawning_sentinel(id);
                return Err(e);
            }
        };

        let result = process::start_process(&self.inner.base_dir, id, entry_point, &engine_socket).await;

        match result {
            Ok(new_process) => {
                let info = new_process.info();
                {
                    let mut state = self.inner.state.lock();
                    if let Some(Slot::Spawning(notify)) = state.processes.insert(id.clone(), Slot::Running(new_process)) {
                        notify.notify_waiters();
                    }
                    state.restart_attempts.insert(id.clone(), 0);
                }

                if self.inner.is_shutting_down() {
                    // Open question resolved in SPEC_FULL.md §4: a child spawned
                    // after shutdown began is force-killed rather than leaked.
                    self.inner.force_kill_running(id).await;
                } else {
                    monitor::spawn_monitor(self.inner.clone(), id.clone());
                }
                Ok(Some(info))
            }
            Err(e) => {
                self.resolve_spawning_sentinel(id);
                Err(e)
            }
        }
    }

    /// Remove a failed spawn's sentinel and wake anyone parked on it so
    /// they retry (and get the same error, or another attempt if a
    /// concurrent caller races in first).
    fn resolve_spawning_sentinel(&self, id: &AppletId) {
        let mut state = self.inner.state.lock();
        if let Some(Slot::Spawning(notify)) = state.processes.remove(id) {
            drop(state);
            notify.notify_waiters();
        }
    }

    fn applet_socket_for(&self, id: &AppletId) -> Option<PathBuf> {
        match self.inner.state.lock().processes.get(id) {
            Some(Slot::Running(p)) => Some(p.applet_socket.clone()),
            _ => None,
        }
    }

    /// C7 `DispatchJob`.
    pub async fn dispatch_job(
        &self,
        id: &AppletId,
        tenant_id: &str,
        job_id: &str,
        method: &str,
        params: Value,
    ) -> Result<(), SupervisorError> {
        let info = self.ensure_started(id, None).await?;
        if info.is_none() {
            return Err(SupervisorError::Disabled { applet_id: id.to_string() });
        }
        let socket = self
            .applet_socket_for(id)
            .ok_or_else(|| SupervisorError::NotRunning { applet_id: id.to_string() })?;

        let body = serde_json::json!({
            "jobId": job_id,
            "method": method,
            "params": params,
            "applet": id.as_str(),
            "tenantId": tenant_id,
        });
        let body_bytes = serde_json::to_vec(&body).unwrap_or_default();
        let request_id = format!("job-{job_id}");
        let headers = [
            (HEADER_TENANT_ID, tenant_id),
            (HEADER_REQUEST_ID, request_id.as_str()),
            ("Content-Type", "application/json"),
        ];

        http_client::post(&socket, "/__job", &headers, &body_bytes).await?;
        Ok(())
    }

    /// C7 `DispatchWebsocketEvent`.
    pub async fn dispatch_websocket_event(
        &self,
        id: &AppletId,
        tenant_id: &str,
        connection_id: &str,
        event: &str,
        data: &[u8],
    ) -> Result<(), SupervisorError> {
        let info = self.ensure_started(id, None).await?;
        if info.is_none() {
            return Err(SupervisorError::Disabled { applet_id: id.to_string() });
        }
        let socket = self
            .applet_socket_for(id)
            .ok_or_else(|| SupervisorError::NotRunning { applet_id: id.to_string() })?;

        let mut body = serde_json::json!({
            "appletId": id.as_str(),
            "tenantId": tenant_id,
            "connectionId": connection_id,
            "event": event,
        });
        if !data.is_empty() {
            body["dataBase64"] = Value::String(base64::engine::general_purpose::STANDARD.encode(data));
        }
        let body_bytes = serde_json::to_vec(&body).unwrap_or_default();
        let request_id = format!("ws-{connection_id}");
        let headers = [
            (HEADER_TENANT_ID, tenant_id),
            (HEADER_REQUEST_ID, request_id.as_str()),
            ("Content-Type", "application/json"),
        ];

        http_client::post(&socket, "/__ws", &headers, &body_bytes).await?;
        Ok(())
    }

    /// C7 `CallPublicMethod`. Always calls `EnsureStarted` first (Open
    /// Question resolved in SPEC_FULL.md §4 in favor of the unconditional
    /// reading of spec.md).
    pub async fn call_public_method(
        &self,
        id: &AppletId,
        method: &str,
        raw_params: Value,
        headers: &PublicRpcHeaders,
    ) -> Result<Value, SupervisorError> {
        let info = self.ensure_started(id, None).await?;
        if info.is_none() {
            return Err(SupervisorError::Disabled { applet_id: id.to_string() });
        }
        let socket = self
            .applet_socket_for(id)
            .ok_or_else(|| SupervisorError::NotRunning { applet_id: id.to_string() })?;

        let body = serde_json::json!({ "method": method, "params": raw_params });
        let body_bytes = serde_json::to_vec(&body).unwrap_or_default();

        let mut req_headers: Vec<(&str, &str)> = vec![("Content-Type", "application/json")];
        if let Some(v) = &headers.tenant_id {
            req_headers.push((HEADER_TENANT_ID, v));
        }
        if let Some(v) = &headers.user_id {
            req_headers.push((HEADER_USER_ID, v));
        }
        if let Some(v) = &headers.request_id {
            req_headers.push((HEADER_REQUEST_ID, v));
        }
        if let Some(v) = &headers.cookie {
            req_headers.push((HEADER_COOKIE, v));
        }
        if let Some(v) = &headers.authorization {
            req_headers.push((HEADER_AUTHORIZATION, v));
        }

        let resp = http_client::post(&socket, "/__public_rpc", &req_headers, &body_bytes).await?;
        let value: Value = serde_json::from_slice(&resp.body).map_err(|e| {
            SupervisorError::Transport(crate::http_client::HttpError::Malformed {
                socket: socket.display().to_string(),
                reason: e.to_string(),
            })
        })?;
        Ok(value.get("result").cloned().unwrap_or(Value::Null))
    }

    /// C3 setup (spec.md §4.3), performed entirely under the Manager lock
    /// since it is fast (no health wait, unlike a child spawn).
    fn ensure_engine_server(&self) -> Result<PathBuf, SupervisorError> {
        let mut state = self.inner.state.lock();
        if let Some(engine) = &state.engine {
            return Ok(engine.socket.clone());
        }

        crate::socket_path::ensure_base_dir(&self.inner.base_dir).map_err(|source| {
            SupervisorError::CreateRuntimeDir { path: self.inner.base_dir.display().to_string(), source }
        })?;
        let resolver = crate::socket_path::SocketPathResolver::new(&self.inner.base_dir);
        let socket = resolver.resolve("engine.sock").map_err(|source| SupervisorError::CreateRuntimeDir {
            path: self.inner.base_dir.display().to_string(),
            source,
        })?;
        crate::socket_path::remove_stale_socket(&socket)
            .map_err(|source| SupervisorError::RemoveStaleSocket { path: socket.display().to_string(), source })?;

        let listener = UnixListener::bind(&socket)
            .map_err(|source| SupervisorError::BindEngineSocket { path: socket.display().to_string(), source })?;

        let handler: Arc<dyn http_server::Handler> = Arc::new(EngineHandler::new(self.inner.clone()));
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        tokio::spawn(http_server::serve(listener, handler, shutdown_rx));

        state.engine = Some(EngineServerHandle { socket: socket.clone(), shutdown_tx });
        Ok(socket)
    }

    /// C7 `Shutdown`. Monotonic: the second and later calls are a no-op.
    pub async fn shutdown(&self) -> Result<(), SupervisorError> {
        let (running, engine) = {
            let mut state = self.inner.state.lock();
            if state.shutting_down {
                return Ok(());
            }
            state.shutting_down = true;

            let running: Vec<AppletProcess> = state
                .processes
                .drain()
                .filter_map(|(_, slot)| match slot {
                    Slot::Running(p) => Some(p),
                    // A spawn in flight has callers parked on this sentinel
                    // via `Action::AwaitSpawn`; wake them now so they observe
                    // `shutting_down` on retry instead of hanging forever.
                    Slot::Spawning(notify) => {
                        notify.notify_waiters();
                        None
                    }
                })
                .collect();
            let engine = state.engine.take();
            (running, engine)
        };
        self.inner.shutdown_notify.notify_waiters();

        // spec.md §4.7 steps 2-4: SIGTERM goes out to every live applet up
        // front, then each gets one shared grace window to exit on its own
        // before being force-killed — not a full polite-wait-kill cycle per
        // applet run one after another (that would cost up to N * grace).
        let grace = crate::env::shutdown_grace();
        for proc in &running {
            process::request_termination(&proc.handle);
        }

        let mut join_set = tokio::task::JoinSet::new();
        for mut proc in running {
            join_set.spawn(async move {
                if tokio::time::timeout(grace, proc.handle.wait_for_exit()).await.is_err() {
                    if let Err(e) = process::force_kill_if_still_running(&proc.applet_id, &mut proc.handle).await {
                        error!(applet_id = %proc.applet_id, error = %e, "error force-killing applet during shutdown");
                    }
                }
            });
        }
        while join_set.join_next().await.is_some() {}

        if let Some(engine) = engine {
            let _ = engine.shutdown_tx.send(());
        }

        Ok(())
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
