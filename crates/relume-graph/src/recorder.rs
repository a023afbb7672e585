//! Pass-scoped graph recording.

use crate::error::{GraphError, Result};
use crate::payload::ModuleMetadata;
use crate::row::{BuildRow, ModuleRef, StageName};
use crate::sourcemap::{strip_comments, InlineSourceMap};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// What the label stage stores for one module.
#[derive(Clone, Debug, PartialEq)]
pub struct ModuleRecord {
    /// Source with inline map comments stripped.
    pub source: String,
    /// Raw dependency map, still keyed by internal ids.
    pub deps: BTreeMap<String, ModuleRef>,
    pub meta: ModuleMetadata,
}

/// Records one build pass's module graph.
///
/// All caches are scoped to a single pass: `reset` rebuilds them from empty
/// whenever the host pipeline announces a new pass, and nothing here outlives
/// the pass it was recorded in.
#[derive(Debug, Default)]
pub struct GraphRecorder {
    path_by_id: HashMap<ModuleRef, String>,
    path_by_index: HashMap<u64, String>,
    modules: BTreeMap<String, ModuleRecord>,
    entries: Vec<String>,
    standalone: Option<String>,
    has_exports: bool,
    debug: bool,
}

impl GraphRecorder {
    pub fn new(debug: bool) -> Self {
        Self {
            debug,
            ..Default::default()
        }
    }

    /// Discard every pass-scoped cache.
    pub fn reset(&mut self) {
        *self = Self::new(self.debug);
    }

    /// `record` stage: capture build options carried on rows.
    pub fn record(&mut self, row: &BuildRow) {
        if let Some(name) = &row.standalone {
            self.standalone = Some(name.clone());
        }
        if let Some(expose) = &row.expose {
            self.has_exports = true;
            if self.debug {
                debug!(file = %row.file, name = %expose, "module exposed");
            }
        }
    }

    /// `sort` stage: associate internal ids and indices with file paths, in
    /// whatever order the host delivers rows.
    pub fn sort(&mut self, row: &BuildRow) -> Result<()> {
        let file = row.require_file(StageName::Sort)?.to_string();
        self.path_by_id.insert(row.id.clone(), file.clone());
        self.path_by_index.insert(row.index, file);
        Ok(())
    }

    /// `label` stage: fingerprint the module and store its record under the
    /// canonical path.
    pub fn label(&mut self, row: &BuildRow) -> Result<()> {
        let file = row.require_file(StageName::Label)?.to_string();

        let source_without_maps = strip_comments(&row.source);
        let sourcemap = match InlineSourceMap::from_source(&row.source) {
            // one line down: the loader wraps each module body in a function
            // header line
            Some(map) => map.offset_lines(1).to_comment(),
            None => String::new(),
        };
        let hash = fingerprint(&source_without_maps);

        if row.entry {
            // TODO: keep every entry once the runtime loader can boot
            // multi-entry graphs
            self.entries.clear();
            self.entries.push(file.clone());
        }

        self.modules.insert(
            file.clone(),
            ModuleRecord {
                source: source_without_maps,
                deps: row.deps.clone(),
                meta: ModuleMetadata {
                    id: file,
                    hash,
                    bundler_id: row.id.clone(),
                    sourcemap,
                },
            },
        );
        Ok(())
    }

    /// Canonicalize an internal id to a file path.
    ///
    /// Failing here is fatal for the pass: an id that was never sorted and is
    /// not path-shaped means the host pipeline fed us inconsistent rows.
    pub fn id_to_path(&self, id: &ModuleRef) -> Result<String> {
        if let Some(path) = self.path_by_id.get(id) {
            return Ok(path.clone());
        }
        if let Some(path) = id.as_path() {
            return Ok(path.to_string());
        }
        Err(GraphError::UnknownId(id.clone()))
    }

    /// Canonicalize a pass-local index to a file path.
    pub fn idx_to_path(&self, idx: &ModuleRef) -> Result<String> {
        if let ModuleRef::Index(index) = idx {
            if let Some(path) = self.path_by_index.get(index) {
                return Ok(path.clone());
            }
        }
        if let Some(path) = idx.as_path() {
            return Ok(path.to_string());
        }
        Err(GraphError::UnknownIndex(idx.clone()))
    }

    pub fn modules(&self) -> &BTreeMap<String, ModuleRecord> {
        &self.modules
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn standalone(&self) -> Option<&str> {
        self.standalone.as_deref()
    }

    pub fn has_exports(&self) -> bool {
        self.has_exports
    }
}

/// Content fingerprint over map-stripped source.
pub fn fingerprint(source: &str) -> String {
    blake3::hash(source.as_bytes()).to_hex().to_string()
}
