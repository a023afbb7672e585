//! Notification seam between the assembler and the hub.

use crate::payload::BundlePayload;
use async_trait::async_trait;

/// Where a pass's notifications go: the co-located hub directly, or a remote
/// reporter when the build runs in a different process than the hub.
#[async_trait]
pub trait ReloadNotifier: Send + Sync {
    /// A pass for `bundle_id` started building.
    async fn notify_bundling(&self, bundle_id: &str);

    /// A pass for `bundle_id` finished; `payload` is its assembled graph.
    async fn notify_reload(&self, bundle_id: &str, payload: BundlePayload);

    /// The host pipeline surfaced a build error.
    async fn notify_bundle_error(&self, error: &str);
}

/// Notifier that drops everything; for recorder-only embeddings and tests.
#[derive(Debug, Default)]
pub struct NullNotifier;

#[async_trait]
impl ReloadNotifier for NullNotifier {
    async fn notify_bundling(&self, _bundle_id: &str) {}

    async fn notify_reload(&self, _bundle_id: &str, _payload: BundlePayload) {}

    async fn notify_bundle_error(&self, _error: &str) {}
}
