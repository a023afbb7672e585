//! Typed build records flowing through the pipeline stages.

use crate::error::{GraphError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A bundler-internal module reference.
///
/// Hosts hand out either pass-local numeric indices or string ids; a string
/// id that is a file path ("path-shaped") may stand for itself during
/// canonicalization.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModuleRef {
    Index(u64),
    Name(String),
}

impl ModuleRef {
    /// The string form, when this ref can stand for a path itself.
    pub fn as_path(&self) -> Option<&str> {
        match self {
            ModuleRef::Name(name) => Some(name),
            ModuleRef::Index(_) => None,
        }
    }
}

impl fmt::Display for ModuleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleRef::Index(idx) => write!(f, "{}", idx),
            ModuleRef::Name(name) => write!(f, "{}", name),
        }
    }
}

impl From<u64> for ModuleRef {
    fn from(idx: u64) -> Self {
        ModuleRef::Index(idx)
    }
}

impl From<&str> for ModuleRef {
    fn from(name: &str) -> Self {
        ModuleRef::Name(name.to_string())
    }
}

impl From<String> for ModuleRef {
    fn from(name: String) -> Self {
        ModuleRef::Name(name)
    }
}

/// The fixed pipeline stages, in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StageName {
    Record,
    Sort,
    Dedupe,
    Label,
    Assemble,
}

impl StageName {
    /// Stage order the host pipeline contract fixes.
    pub const ORDER: [StageName; 5] = [
        StageName::Record,
        StageName::Sort,
        StageName::Dedupe,
        StageName::Label,
        StageName::Assemble,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StageName::Record => "record",
            StageName::Sort => "sort",
            StageName::Dedupe => "dedupe",
            StageName::Label => "label",
            StageName::Assemble => "assemble",
        }
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One per-module record as the host pipeline streams it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BuildRow {
    /// Bundler-internal id.
    pub id: ModuleRef,

    /// Pass-local numeric index.
    pub index: u64,

    /// Resolved file path.
    pub file: String,

    /// Module source text, possibly carrying an inline source-map comment.
    pub source: String,

    /// Raw dependency map: import specifier → internal id.
    #[serde(default)]
    pub deps: BTreeMap<String, ModuleRef>,

    /// Entry module of this pass.
    #[serde(default)]
    pub entry: bool,

    /// External name the module is exposed under, if any.
    #[serde(default)]
    pub expose: Option<String>,

    /// Reference to the module this one is a duplicate of.
    #[serde(default)]
    pub dedupe: Option<ModuleRef>,

    /// Index form of the duplicate reference.
    #[serde(default)]
    pub dedupe_index: Option<ModuleRef>,

    /// Standalone export name requested via build options.
    #[serde(default)]
    pub standalone: Option<String>,
}

impl BuildRow {
    pub fn new(
        id: impl Into<ModuleRef>,
        index: u64,
        file: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            index,
            file: file.into(),
            source: source.into(),
            deps: BTreeMap::new(),
            entry: false,
            expose: None,
            dedupe: None,
            dedupe_index: None,
            standalone: None,
        }
    }

    pub fn with_dep(mut self, specifier: impl Into<String>, id: impl Into<ModuleRef>) -> Self {
        self.deps.insert(specifier.into(), id.into());
        self
    }

    pub fn as_entry(mut self) -> Self {
        self.entry = true;
        self
    }

    pub fn exposed_as(mut self, name: impl Into<String>) -> Self {
        self.expose = Some(name.into());
        self
    }

    pub fn standalone(mut self, name: impl Into<String>) -> Self {
        self.standalone = Some(name.into());
        self
    }

    /// Stage-boundary check: stages that key on the file path reject rows
    /// without one.
    pub(crate) fn require_file(&self, stage: StageName) -> Result<&str> {
        if self.file.is_empty() {
            return Err(GraphError::MissingFile { stage });
        }
        Ok(&self.file)
    }
}
