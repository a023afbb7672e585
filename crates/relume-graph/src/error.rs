//! Error types for graph recording and payload assembly.

use crate::row::{ModuleRef, StageName};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, GraphError>;

/// Fatal, pass-local failures.
///
/// Every variant signals an inconsistency in what the host pipeline fed us;
/// the current pass is aborted and the caches discarded, the next pass starts
/// clean.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("full path not found for id: {0}")]
    UnknownId(ModuleRef),

    #[error("full path not found for index: {0}")]
    UnknownIndex(ModuleRef),

    #[error("row reached the {stage} stage without a file path")]
    MissingFile { stage: StageName },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
