//! Notification hub for live-reload coordination.
//!
//! A long-lived WebSocket hub tracks per-bundle build state and broadcasts
//! consolidated `change` events only once every concurrently-building bundle
//! has settled. Co-located builds talk to the [`Hub`] handle directly; builds
//! in other processes report through [`RemoteNotifier`]. Both implement
//! `relume_graph::ReloadNotifier`.

pub mod error;
pub mod logging;
pub mod protocol;
pub mod registry;
pub mod remote;
pub mod server;
pub mod state;

pub use error::{HubError, Result};
pub use logging::{init_logging, LogLevel};
pub use protocol::{ErrorPayload, Inbound, Outbound};
pub use registry::{notifier_for, HubRegistry};
pub use remote::RemoteNotifier;
pub use server::{HubServer, RunningHub};
pub use state::Hub;
