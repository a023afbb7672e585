//! Wire protocol: JSON text frames over WebSocket.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Frames the hub receives. A connection's first frame decides its role:
/// `browser` registers it as a reload listener, everything else is a build
/// reporter driving the hub remotely.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Inbound {
    Browser,
    Bundling {
        #[serde(rename = "bundleId")]
        bundle_id: String,
    },
    Reload {
        #[serde(rename = "bundleId")]
        bundle_id: String,
        data: Value,
    },
    BundleError {
        data: ErrorPayload,
    },
}

/// Frames the hub sends.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outbound {
    /// Consolidated per-bundle payloads, sent only at a settle point.
    Change { data: BTreeMap<String, Value> },
    BundleError { data: ErrorPayload },
    /// Delivery confirmation for reporter frames.
    Ack,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub error: String,
}
