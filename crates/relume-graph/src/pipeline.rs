//! Stage composition and pass lifecycle.
//!
//! The host build pipeline streams rows through the fixed stages
//! record → sort → dedupe → label → assemble. The stage list is composed
//! exactly once at construction; per pass, the host calls `begin_pass`,
//! `push` for every row, and `finish` when its stream ends.

use crate::assemble::assemble;
use crate::dedupe::DedupeResolver;
use crate::error::Result;
use crate::notify::ReloadNotifier;
use crate::payload::ClientConfig;
use crate::recorder::GraphRecorder;
use crate::row::{BuildRow, StageName};
use relume_config::ReloadOptions;
use std::sync::Arc;
use tracing::debug;

pub struct ReloadPipeline {
    stages: Vec<StageName>,
    recorder: GraphRecorder,
    dedupe: DedupeResolver,
    client: ClientConfig,
    bundle_id: String,
    notifier: Arc<dyn ReloadNotifier>,
}

impl ReloadPipeline {
    pub fn new(options: &ReloadOptions, notifier: Arc<dyn ReloadNotifier>) -> Self {
        Self {
            stages: StageName::ORDER.to_vec(),
            recorder: GraphRecorder::new(options.debug),
            dedupe: DedupeResolver::new(options.dedupe),
            client: ClientConfig::from_options(options),
            bundle_id: options.bundle_id.clone(),
            notifier,
        }
    }

    /// Tell the pipeline which transform stages the host already runs, so it
    /// can warn when a disabled dedupe stage is redundant.
    pub fn with_host_stages(self, host_stages: &[&str]) -> Self {
        self.dedupe.advise_if_redundant(host_stages);
        self
    }

    /// The composed stage order. Fixed for the pipeline's lifetime.
    pub fn stages(&self) -> &[StageName] {
        &self.stages
    }

    /// Start a new pass: discard the previous pass's caches and mark the
    /// bundle as building on the hub.
    pub async fn begin_pass(&mut self) {
        debug!(bundle_id = %self.bundle_id, "build pass starting");
        self.recorder.reset();
        self.notifier.notify_bundling(&self.bundle_id).await;
    }

    /// Drive one row through every per-row stage, in order.
    pub fn push(&mut self, row: BuildRow) -> Result<BuildRow> {
        let mut row = row;
        for stage in &self.stages {
            row = match stage {
                StageName::Record => {
                    self.recorder.record(&row);
                    row
                }
                StageName::Sort => {
                    self.recorder.sort(&row)?;
                    row
                }
                StageName::Dedupe => self.dedupe.transform(row, &self.recorder)?,
                StageName::Label => {
                    self.recorder.label(&row)?;
                    row
                }
                // flush-only stage; nothing happens per row
                StageName::Assemble => row,
            };
        }
        Ok(row)
    }

    /// End the pass: assemble the payload and bootstrap buffer, and send the
    /// pass's single reload notification.
    pub async fn finish(&mut self) -> Result<String> {
        let (code, payload) = assemble(&self.recorder, &self.client)?;
        debug!(
            bundle_id = %self.bundle_id,
            modules = payload.modules.len(),
            "build pass assembled"
        );
        self.notifier.notify_reload(&self.bundle_id, payload).await;
        Ok(code)
    }

    /// Forward a build error the host pipeline surfaced. The pipeline keeps
    /// running; the next pass starts clean.
    pub async fn report_error(&self, error: &str) {
        self.notifier.notify_bundle_error(error).await;
    }
}
