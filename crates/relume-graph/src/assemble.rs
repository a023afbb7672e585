//! Bundle payload assembly and bootstrap generation.

use crate::error::Result;
use crate::payload::{BundlePayload, ClientConfig, ModuleEntry, ModuleMap};
use crate::recorder::GraphRecorder;
use crate::row::ModuleRef;
use std::collections::{BTreeMap, HashMap};

/// The runtime-loader bootstrap the generated buffer invokes. Internal
/// contract with the companion client runtime, not a public API.
const LOADER_BOOTSTRAP: &str = include_str!("../assets/loader.js");

/// Global that captures the loader when a pass exposes modules.
pub const EXPORT_GLOBAL: &str = "__relume_bundle";

/// Convert the recorded graph into a serializable payload and the executable
/// bootstrap buffer the host appends to its compiled output.
pub fn assemble(recorder: &GraphRecorder, client: &ClientConfig) -> Result<(String, BundlePayload)> {
    // invert the id→path relation captured during recording
    let path_by_bundler_id: HashMap<&ModuleRef, &str> = recorder
        .modules()
        .values()
        .map(|record| (&record.meta.bundler_id, record.meta.id.as_str()))
        .collect();

    let mut modules = ModuleMap::new();
    for (file, record) in recorder.modules() {
        let mut deps = BTreeMap::new();
        for (specifier, id) in &record.deps {
            let resolved = path_by_bundler_id
                .get(id)
                .map(|path| path.to_string())
                .or_else(|| id.as_path().map(str::to_string));
            // an id nothing in this pass resolves is an external or optional
            // dependency; leave it out
            if let Some(path) = resolved {
                deps.insert(specifier.clone(), path);
            }
        }
        modules.insert(
            file.clone(),
            ModuleEntry(record.source.clone(), deps, record.meta.clone()),
        );
    }

    let payload = BundlePayload {
        modules,
        entries: recorder.entries().to_vec(),
        client: client.clone(),
    };

    let mut code = format!(
        "({})({}, {}, {})",
        LOADER_BOOTSTRAP.trim_end(),
        serde_json::to_string_pretty(&payload.modules)?,
        serde_json::to_string_pretty(&payload.entries)?,
        serde_json::to_string_pretty(&payload.client)?,
    );
    if recorder.has_exports() {
        code = format!(
            "{global} = {code};\nrequire = {global}.load;",
            global = EXPORT_GLOBAL
        );
    }
    code.push(';');
    if let Some(name) = recorder.standalone() {
        code = umd_shim(name, &format!("return {}", code));
    }

    Ok((code, payload))
}

/// Universal module definition wrapper for standalone builds.
fn umd_shim(name: &str, body: &str) -> String {
    let export = serde_json::Value::String(name.to_string()).to_string();
    format!(
        "(function (root, factory) {{\n\
         \x20 if (typeof define === 'function' && define.amd) {{\n\
         \x20   define([], factory);\n\
         \x20 }} else if (typeof module === 'object' && module.exports) {{\n\
         \x20   module.exports = factory();\n\
         \x20 }} else {{\n\
         \x20   root[{export}] = factory();\n\
         \x20 }}\n\
         }})(typeof self !== 'undefined' ? self : this, function () {{\n\
         \x20 {body}\n\
         }});\n"
    )
}
