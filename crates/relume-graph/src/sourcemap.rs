//! Inline source-map comment handling.
//!
//! Modules arrive with an optional trailing
//! `//# sourceMappingURL=data:application/json;base64,...` comment. The
//! recorder strips it before fingerprinting (so regenerated maps never change
//! a module's hash) and re-emits it shifted down by the wrapper line the
//! runtime loader injects around each module body.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::debug;

static MAP_COMMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)^[ \t]*//[#@] ?sourceMappingURL=data:application/json(?:;charset=[^;,]+)?;base64,([A-Za-z0-9+/=]+)[ \t]*$",
    )
    .expect("source map comment pattern")
});

/// A decoded inline source map.
#[derive(Clone, Debug, PartialEq)]
pub struct InlineSourceMap {
    map: Map<String, Value>,
}

impl InlineSourceMap {
    /// Extract the trailing inline map from `source`, if one decodes.
    ///
    /// A comment that fails to decode is treated as no map at all; a build
    /// pass never dies on a mangled comment some transform emitted.
    pub fn from_source(source: &str) -> Option<Self> {
        let captures = MAP_COMMENT.captures_iter(source).last()?;
        let encoded = captures.get(1)?.as_str();

        let bytes = match BASE64.decode(encoded) {
            Ok(bytes) => bytes,
            Err(err) => {
                debug!(%err, "ignoring undecodable inline source map comment");
                return None;
            }
        };
        match serde_json::from_slice::<Value>(&bytes) {
            Ok(Value::Object(map)) => Some(Self { map }),
            Ok(_) => {
                debug!("ignoring inline source map that is not a JSON object");
                None
            }
            Err(err) => {
                debug!(%err, "ignoring unparsable inline source map");
                None
            }
        }
    }

    /// Shift every generated line down by `lines`.
    ///
    /// A VLQ `mappings` string separates generated lines with `;`, so the
    /// shift is a prefix of empty lines.
    pub fn offset_lines(mut self, lines: usize) -> Self {
        let mappings = self
            .map
            .get("mappings")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let shifted = format!("{}{}", ";".repeat(lines), mappings);
        self.map.insert("mappings".to_string(), Value::String(shifted));
        self
    }

    /// Re-encode as an inline comment.
    pub fn to_comment(&self) -> String {
        let json = Value::Object(self.map.clone()).to_string();
        format!(
            "//# sourceMappingURL=data:application/json;charset=utf-8;base64,{}",
            BASE64.encode(json.as_bytes())
        )
    }
}

/// Remove every inline source-map comment from `source`.
pub fn strip_comments(source: &str) -> String {
    let stripped = MAP_COMMENT.replace_all(source, "");
    stripped.trim_end_matches(['\n', ' ', '\t']).to_string()
}
