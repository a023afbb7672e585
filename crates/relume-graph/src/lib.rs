//! Module-graph recording and payload assembly for live-reload.
//!
//! One `ReloadPipeline` per bundle id: the host build pipeline drives rows
//! through the fixed record → sort → dedupe → label → assemble stages, and
//! every finished pass produces a runtime bootstrap buffer plus exactly one
//! reload notification through the [`ReloadNotifier`] seam.

pub mod assemble;
pub mod dedupe;
pub mod error;
pub mod notify;
pub mod payload;
pub mod pipeline;
pub mod recorder;
pub mod row;
pub mod sourcemap;

pub use assemble::{assemble, EXPORT_GLOBAL};
pub use dedupe::DedupeResolver;
pub use error::{GraphError, Result};
pub use notify::{NullNotifier, ReloadNotifier};
pub use payload::{BundlePayload, ClientConfig, ModuleEntry, ModuleMap, ModuleMetadata};
pub use pipeline::ReloadPipeline;
pub use recorder::{fingerprint, GraphRecorder, ModuleRecord};
pub use row::{BuildRow, ModuleRef, StageName};
