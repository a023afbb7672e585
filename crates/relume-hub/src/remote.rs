//! Out-of-process reporter: notifies a hub the build does not host.

use crate::error::{HubError, Result};
use crate::protocol::{ErrorPayload, Inbound, Outbound};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use relume_graph::{BundlePayload, ReloadNotifier};
use std::time::Duration;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

const DEFAULT_ACK_TIMEOUT: Duration = Duration::from_secs(2);
const DEFAULT_RETRIES: u32 = 2;

/// WebSocket client used when the hub runs in another process (external
/// entry bundles sharing one dev server).
///
/// Each notification is one short-lived connection: dial, send the frame,
/// wait for the hub's `ack`, close. A delivery that still fails after the
/// retries becomes a build warning — reload notifications are best-effort,
/// the build itself must not fail over them.
pub struct RemoteNotifier {
    url: String,
    ack_timeout: Duration,
    retries: u32,
}

impl RemoteNotifier {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ack_timeout: DEFAULT_ACK_TIMEOUT,
            retries: DEFAULT_RETRIES,
        }
    }

    pub fn with_ack_timeout(mut self, timeout: Duration) -> Self {
        self.ack_timeout = timeout;
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    async fn deliver(&self, frame: &Inbound) -> Result<()> {
        let (mut socket, _) = connect_async(self.url.as_str()).await?;
        socket
            .send(Message::Text(serde_json::to_string(frame)?.into()))
            .await?;

        let acked = tokio::time::timeout(self.ack_timeout, async {
            while let Some(message) = socket.next().await {
                if let Message::Text(text) = message? {
                    if matches!(serde_json::from_str(text.as_str()), Ok(Outbound::Ack)) {
                        return Ok(());
                    }
                }
            }
            Err(HubError::ClosedBeforeAck)
        })
        .await;

        let result = match acked {
            Ok(result) => result,
            Err(_) => Err(HubError::AckTimeout),
        };
        let _ = socket.close(None).await;
        result
    }

    async fn send_with_retry(&self, frame: Inbound, what: &str) {
        let mut attempt = 0;
        loop {
            match self.deliver(&frame).await {
                Ok(()) => return,
                Err(err) if attempt < self.retries => {
                    attempt += 1;
                    debug!(%err, attempt, what, "retrying hub notification");
                }
                Err(err) => {
                    warn!(%err, what, url = %self.url, "could not deliver notification to the reload hub");
                    return;
                }
            }
        }
    }
}

#[async_trait]
impl ReloadNotifier for RemoteNotifier {
    async fn notify_bundling(&self, bundle_id: &str) {
        self.send_with_retry(
            Inbound::Bundling {
                bundle_id: bundle_id.to_string(),
            },
            "bundling",
        )
        .await;
    }

    async fn notify_reload(&self, bundle_id: &str, payload: BundlePayload) {
        let data = match serde_json::to_value(&payload) {
            Ok(data) => data,
            Err(err) => {
                warn!(%err, bundle_id, "failed to encode reload payload");
                return;
            }
        };
        self.send_with_retry(
            Inbound::Reload {
                bundle_id: bundle_id.to_string(),
                data,
            },
            "reload",
        )
        .await;
    }

    async fn notify_bundle_error(&self, error: &str) {
        self.send_with_retry(
            Inbound::BundleError {
                data: ErrorPayload {
                    error: error.to_string(),
                },
            },
            "bundle_error",
        )
        .await;
    }
}
