//! Serializable payload types shared with the runtime loader and the hub.

use crate::row::ModuleRef;
use relume_config::ReloadOptions;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Per-module fingerprint and identity.
///
/// `browserifyId` is the serialized key the companion runtime loader matches
/// modules on across reloads; it carries the pass-local internal id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModuleMetadata {
    /// Canonical file path.
    pub id: String,

    /// Content fingerprint over the map-stripped source.
    pub hash: String,

    #[serde(rename = "browserifyId")]
    pub bundler_id: ModuleRef,

    /// Offset-adjusted inline source-map comment, or empty.
    pub sourcemap: String,
}

/// One module in the payload, serialized as `[source, deps, metadata]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModuleEntry(
    pub String,
    pub BTreeMap<String, String>,
    pub ModuleMetadata,
);

/// Canonical path → module entry. Ordered so serialization is stable.
pub type ModuleMap = BTreeMap<String, ModuleEntry>;

/// Everything one reload notification carries for a single bundle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BundlePayload {
    pub modules: ModuleMap,
    pub entries: Vec<String>,
    pub client: ClientConfig,
}

/// Configuration serialized into the generated bootstrap for the in-browser
/// client.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    pub port: u16,
    pub host: Option<String>,
    pub client_enabled: bool,
    pub debug: bool,
    pub bundle_id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub external_entries: Vec<String>,
    pub base_dir: PathBuf,
}

impl ClientConfig {
    pub fn from_options(options: &ReloadOptions) -> Self {
        Self {
            port: options.port,
            host: options.host.clone(),
            client_enabled: options.client,
            debug: options.debug,
            bundle_id: options.bundle_id.clone(),
            external_entries: options.external_entries.clone(),
            base_dir: options.basedir.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_entry_serializes_as_triple() {
        let entry = ModuleEntry(
            "module.exports = 1".to_string(),
            BTreeMap::from([("./dep".to_string(), "/src/dep.js".to_string())]),
            ModuleMetadata {
                id: "/src/app.js".to_string(),
                hash: "abc".to_string(),
                bundler_id: ModuleRef::Index(1),
                sourcemap: String::new(),
            },
        );

        let json: serde_json::Value = serde_json::to_value(&entry).unwrap();
        assert!(json.is_array());
        assert_eq!(json[0], "module.exports = 1");
        assert_eq!(json[1]["./dep"], "/src/dep.js");
        assert_eq!(json[2]["browserifyId"], 1);
        assert_eq!(json[2]["id"], "/src/app.js");
    }

    #[test]
    fn client_config_uses_camel_case_keys() {
        let config = ClientConfig::from_options(&ReloadOptions::default());
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["clientEnabled"], true);
        assert_eq!(json["bundleId"], "main");
        assert!(json.get("externalEntries").is_none());
    }
}
