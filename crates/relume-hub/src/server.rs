//! WebSocket endpoint for the notification hub.

use crate::error::{HubError, Result};
use crate::protocol::{Inbound, Outbound};
use crate::state::Hub;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use axum::Router;
use futures_util::{SinkExt, StreamExt};
use relume_config::{ReloadOptions, TlsFiles};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// The hub's WebSocket server.
pub struct HubServer {
    hub: Hub,
    bind_addr: String,
    tls: Option<TlsFiles>,
}

impl HubServer {
    /// Validate options and prepare a server. Fails fast on a half TLS pair.
    pub fn new(options: &ReloadOptions) -> Result<Self> {
        let tls = options.tls()?;
        Ok(Self {
            hub: Hub::new(),
            bind_addr: format!("{}:{}", options.bind_host(), options.port),
            tls,
        })
    }

    pub fn hub(&self) -> Hub {
        self.hub.clone()
    }

    /// The validated TLS pair for the hosting process to terminate with;
    /// certificate loading stays outside the hub.
    pub fn tls(&self) -> Option<&TlsFiles> {
        self.tls.as_ref()
    }

    /// Bind and start serving in a background task.
    pub async fn start(self) -> Result<RunningHub> {
        let listener = TcpListener::bind(&self.bind_addr)
            .await
            .map_err(|source| HubError::Bind {
                addr: self.bind_addr.clone(),
                source,
            })?;
        let addr = listener.local_addr()?;
        info!(%addr, "reload hub listening");

        let hub = self.hub.clone();
        let app = Router::new()
            // the endpoint answers upgrades on any path
            .fallback(upgrade)
            .with_state(hub.clone());
        let task = tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, app).await {
                warn!(%err, "reload hub stopped serving");
            }
        });

        Ok(RunningHub { hub, addr, task })
    }
}

/// A started hub: handle, bound address, and the serving task.
pub struct RunningHub {
    hub: Hub,
    addr: SocketAddr,
    task: JoinHandle<()>,
}

impl RunningHub {
    pub fn hub(&self) -> Hub {
        self.hub.clone()
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Stop serving. Registered clients are dropped with the task.
    pub fn shutdown(self) {
        self.task.abort();
    }
}

async fn upgrade(ws: WebSocketUpgrade, State(hub): State<Hub>) -> Response {
    ws.on_upgrade(move |socket| handle_connection(socket, hub))
}

/// One connection's read loop.
///
/// Outbound frames (acks, broadcasts) funnel through a per-connection channel
/// into a writer task, so hub broadcasts never need the socket itself.
async fn handle_connection(socket: WebSocket, hub: Hub) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    let writer = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if sink.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    let mut browser_id = None;
    while let Some(Ok(message)) = stream.next().await {
        let text = match message {
            Message::Text(text) => text.to_string(),
            Message::Binary(data) => match String::from_utf8(data.to_vec()) {
                Ok(text) => text,
                Err(_) => {
                    warn!("dropping non-UTF-8 frame");
                    continue;
                }
            },
            Message::Close(_) => break,
            Message::Ping(_) | Message::Pong(_) => continue,
        };

        match serde_json::from_str::<Inbound>(&text) {
            Ok(Inbound::Browser) => {
                if browser_id.is_none() {
                    let (id, mut events) = hub.register_client();
                    browser_id = Some(id);
                    let outbound = tx.clone();
                    tokio::spawn(async move {
                        while let Some(frame) = events.recv().await {
                            if outbound.send(frame).is_err() {
                                break;
                            }
                        }
                    });
                }
            }
            Ok(Inbound::Bundling { bundle_id }) => {
                hub.notify_bundling(&bundle_id);
                ack(&tx);
            }
            Ok(Inbound::Reload { bundle_id, data }) => {
                hub.notify_reload(&bundle_id, data);
                ack(&tx);
            }
            Ok(Inbound::BundleError { data }) => {
                hub.notify_bundle_error(&data.error);
                ack(&tx);
            }
            Err(err) => {
                // recoverable: drop the frame, keep the connection open
                warn!(%err, frame = %text, "unexpected message");
            }
        }
    }

    if let Some(id) = browser_id {
        hub.unregister_client(id);
    } else {
        debug!("reporter connection closed");
    }
    writer.abort();
}

fn ack(tx: &mpsc::UnboundedSender<String>) {
    if let Ok(frame) = serde_json::to_string(&Outbound::Ack) {
        let _ = tx.send(frame);
    }
}
