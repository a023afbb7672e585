//! Per-bundle build state and the settle-and-broadcast protocol.

use crate::protocol::{ErrorPayload, Outbound};
use async_trait::async_trait;
use parking_lot::Mutex;
use relume_graph::{BundlePayload, ReloadNotifier};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

type ClientSender = mpsc::UnboundedSender<String>;

/// Hub-owned mutable state. Nothing outside this module touches it directly;
/// every mutation happens under one lock acquisition, so the settle check is
/// always computed against the state the triggering notification produced.
#[derive(Debug, Default)]
struct HubState {
    /// bundle id → currently building
    bundling: HashMap<String, bool>,
    /// bundle id → last payload since the previous broadcast
    pending: BTreeMap<String, Value>,
    clients: HashMap<usize, ClientSender>,
    next_client_id: usize,
}

impl HubState {
    /// No tracked bundle is mid-build.
    fn settled(&self) -> bool {
        !self.bundling.values().any(|building| *building)
    }

    fn broadcast(&mut self, message: &Outbound) {
        let frame = match serde_json::to_string(message) {
            Ok(frame) => frame,
            Err(err) => {
                warn!(%err, "failed to encode outbound frame");
                return;
            }
        };
        let mut dead = Vec::new();
        for (id, tx) in &self.clients {
            if tx.send(frame.clone()).is_err() {
                dead.push(*id);
            }
        }
        for id in dead {
            self.clients.remove(&id);
            debug!(client = id, "pruned disconnected client");
        }
    }
}

/// Shared handle to the notification hub.
///
/// Lives for the process lifetime of the hub; cheap to clone. Bundle state is
/// only tracked while at least one browser client is registered — with nobody
/// listening, every notification is a no-op.
#[derive(Clone, Debug, Default)]
pub struct Hub {
    inner: Arc<Mutex<HubState>>,
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `bundle_id` as building.
    pub fn notify_bundling(&self, bundle_id: &str) {
        let mut state = self.inner.lock();
        if state.clients.is_empty() {
            return;
        }
        debug!(bundle_id, "bundle started building");
        state.bundling.insert(bundle_id.to_string(), true);
    }

    /// Record `bundle_id`'s finished payload; broadcast the union of pending
    /// payloads if that made the hub settled, defer otherwise.
    pub fn notify_reload(&self, bundle_id: &str, payload: Value) {
        let mut state = self.inner.lock();
        if state.clients.is_empty() {
            return;
        }
        state.pending.insert(bundle_id.to_string(), payload);
        state.bundling.insert(bundle_id.to_string(), false);
        debug!(bundle_id, "bundle finished");

        if state.settled() {
            state.bundling.clear();
            let data = std::mem::take(&mut state.pending);
            info!(bundles = data.len(), "notifying clients of bundle changes");
            state.broadcast(&Outbound::Change { data });
        } else {
            // another bundle is still building; a broadcast now would hand
            // clients a cross-bundle-inconsistent update
            debug!(bundle_id, "waiting on other bundles");
        }
    }

    /// Broadcast a build error immediately. Bundle state is untouched: the
    /// failed pass's id stays wherever it was.
    pub fn notify_bundle_error(&self, error: &str) {
        let mut state = self.inner.lock();
        if state.clients.is_empty() {
            return;
        }
        info!("notifying clients of a bundle error");
        state.broadcast(&Outbound::BundleError {
            data: ErrorPayload {
                error: error.to_string(),
            },
        });
    }

    /// Register a browser client; frames broadcast after this point arrive on
    /// the returned receiver.
    pub fn register_client(&self) -> (usize, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.inner.lock();
        let id = state.next_client_id;
        state.next_client_id += 1;
        state.clients.insert(id, tx);
        info!(client = id, "browser client connected");
        (id, rx)
    }

    pub fn unregister_client(&self, id: usize) {
        if self.inner.lock().clients.remove(&id).is_some() {
            info!(client = id, "browser client disconnected");
        }
    }

    pub fn client_count(&self) -> usize {
        self.inner.lock().clients.len()
    }
}

#[async_trait]
impl ReloadNotifier for Hub {
    async fn notify_bundling(&self, bundle_id: &str) {
        Hub::notify_bundling(self, bundle_id);
    }

    async fn notify_reload(&self, bundle_id: &str, payload: BundlePayload) {
        match serde_json::to_value(&payload) {
            Ok(value) => Hub::notify_reload(self, bundle_id, value),
            Err(err) => warn!(%err, bundle_id, "failed to encode reload payload"),
        }
    }

    async fn notify_bundle_error(&self, error: &str) {
        Hub::notify_bundle_error(self, error);
    }
}
