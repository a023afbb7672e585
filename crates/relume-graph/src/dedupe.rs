//! Duplicate-module reference rewriting.

use crate::error::Result;
use crate::recorder::GraphRecorder;
use crate::row::{BuildRow, ModuleRef};
use tracing::warn;

/// Rewrites `dedupe`/`dedupe_index` references from pass-local internal form
/// to canonical file paths, so the runtime loader matches duplicates by
/// stable path across passes.
#[derive(Debug)]
pub struct DedupeResolver {
    enabled: bool,
}

impl DedupeResolver {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// One-time advisory, emitted at pipeline construction: disabling this
    /// stage does nothing when the host already dedupes upstream.
    pub(crate) fn advise_if_redundant(&self, host_stages: &[&str]) {
        if !self.enabled && host_stages.contains(&"dedupe") {
            warn!("host pipeline already de-duplicates modules; disabling dedupe here has no effect");
        }
    }

    /// `dedupe` stage body. Pass-through when disabled or when the row holds
    /// no duplicate references.
    pub fn transform(&self, mut row: BuildRow, recorder: &GraphRecorder) -> Result<BuildRow> {
        if !self.enabled {
            return Ok(row);
        }
        if let Some(idx) = row.dedupe_index.take() {
            row.dedupe_index = Some(ModuleRef::Name(recorder.idx_to_path(&idx)?));
        }
        if let Some(id) = row.dedupe.take() {
            row.dedupe = Some(ModuleRef::Name(recorder.id_to_path(&id)?));
        }
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GraphError;

    fn recorder_with(id: u64, index: u64, file: &str) -> GraphRecorder {
        let mut recorder = GraphRecorder::default();
        recorder
            .sort(&BuildRow::new(id, index, file, ""))
            .unwrap();
        recorder
    }

    #[test]
    fn rewrites_refs_to_paths() {
        let recorder = recorder_with(3, 0, "/src/shared.js");
        let resolver = DedupeResolver::new(true);

        let mut row = BuildRow::new(4u64, 1, "/src/copy.js", "copy");
        row.dedupe = Some(ModuleRef::Index(3));
        row.dedupe_index = Some(ModuleRef::Index(0));

        let row = resolver.transform(row, &recorder).unwrap();
        assert_eq!(row.dedupe, Some("/src/shared.js".into()));
        assert_eq!(row.dedupe_index, Some("/src/shared.js".into()));
    }

    #[test]
    fn disabled_resolver_passes_rows_through() {
        let recorder = GraphRecorder::default();
        let resolver = DedupeResolver::new(false);

        let mut row = BuildRow::new(4u64, 1, "/src/copy.js", "copy");
        row.dedupe = Some(ModuleRef::Index(3));

        let row = resolver.transform(row, &recorder).unwrap();
        assert_eq!(row.dedupe, Some(ModuleRef::Index(3)));
    }

    #[test]
    fn rows_without_dedupe_refs_are_untouched() {
        let recorder = GraphRecorder::default();
        let resolver = DedupeResolver::new(true);

        let row = BuildRow::new(4u64, 1, "/src/app.js", "app");
        let out = resolver.transform(row.clone(), &recorder).unwrap();
        assert_eq!(out, row);
    }

    #[test]
    fn unknown_dedupe_ref_aborts_the_stage() {
        let recorder = GraphRecorder::default();
        let resolver = DedupeResolver::new(true);

        let mut row = BuildRow::new(4u64, 1, "/src/copy.js", "copy");
        row.dedupe = Some(ModuleRef::Index(42));

        assert!(matches!(
            resolver.transform(row, &recorder),
            Err(GraphError::UnknownId(_))
        ));
    }
}
