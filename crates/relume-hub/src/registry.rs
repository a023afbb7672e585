//! Running-hub registry for the hosting dev-server process.

use crate::error::Result;
use crate::remote::RemoteNotifier;
use crate::server::{HubServer, RunningHub};
use crate::state::Hub;
use relume_config::ReloadOptions;
use relume_graph::{NullNotifier, ReloadNotifier};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Registry of running hubs keyed by `(port, host)`.
///
/// Several bundle pipelines configured against the same address share one
/// hub. The hosting process owns the registry and passes it by reference to
/// each pipeline it sets up; hubs live until `shutdown`.
#[derive(Default)]
pub struct HubRegistry {
    hubs: HashMap<(u16, Option<String>), RunningHub>,
}

impl HubRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The hub serving `options`' address, starting one if none runs yet.
    pub async fn ensure(&mut self, options: &ReloadOptions) -> Result<Hub> {
        let key = (options.port, options.host.clone());
        if let Some(running) = self.hubs.get(&key) {
            debug!(port = key.0, "reusing running hub");
            return Ok(running.hub());
        }
        let running = HubServer::new(options)?.start().await?;
        let hub = running.hub();
        self.hubs.insert(key, running);
        Ok(hub)
    }

    pub fn get(&self, port: u16, host: Option<&str>) -> Option<Hub> {
        self.hubs
            .get(&(port, host.map(str::to_string)))
            .map(RunningHub::hub)
    }

    pub fn len(&self) -> usize {
        self.hubs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hubs.is_empty()
    }

    /// Stop every hub this registry started.
    pub fn shutdown(&mut self) {
        for (_, running) in self.hubs.drain() {
            running.shutdown();
        }
    }
}

/// Pick the notifier a pipeline reports through: the hub hosted in this
/// process, a remote reporter when the hub lives elsewhere and this build
/// feeds an external entry bundle, or nothing at all.
pub async fn notifier_for(
    options: &ReloadOptions,
    registry: &mut HubRegistry,
) -> Result<Arc<dyn ReloadNotifier>> {
    if options.server {
        Ok(Arc::new(registry.ensure(options).await?))
    } else if !options.external_entries.is_empty() {
        Ok(Arc::new(RemoteNotifier::new(options.hub_url())))
    } else {
        Ok(Arc::new(NullNotifier))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hubs_are_shared_per_address() {
        let mut registry = HubRegistry::new();
        let options = ReloadOptions {
            port: 0,
            ..Default::default()
        };

        registry.ensure(&options).await.unwrap();
        registry.ensure(&options).await.unwrap();
        assert_eq!(registry.len(), 1);

        let other_host = ReloadOptions {
            port: 0,
            host: Some("127.0.0.1".to_string()),
            ..Default::default()
        };
        registry.ensure(&other_host).await.unwrap();
        assert_eq!(registry.len(), 2);

        registry.shutdown();
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn reporter_only_builds_get_a_remote_notifier() {
        let mut registry = HubRegistry::new();
        let options = ReloadOptions {
            server: false,
            external_entries: vec!["vendor".to_string()],
            ..Default::default()
        };

        let _notifier = notifier_for(&options, &mut registry).await.unwrap();
        // no hub was started in this process
        assert!(registry.is_empty());
    }
}
