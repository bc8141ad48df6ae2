// src/orchestrator.rs

use crate::archive::{ArchiveBuilder, ArchiveError, BuiltArchive};
use crate::models::{ClipRef, FailureRecord, Selection};
use crate::progress::{ProgressState, Stage};
use crate::scheduler;
use crate::speed::SpeedEstimator;
use crate::transfer::TransferOutcome;
use chrono::Local;
use reqwest::Client;
use std::io::{Cursor, Seek, Write};
use std::time::Instant;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{error, info, warn};

/// Coarse pre-transfer size estimate per clip. True sizes are unknown until
/// each payload is buffered, so the total is approximate by construction.
pub const PER_CLIP_SIZE_ESTIMATE: u64 = 5 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ExportError {
    /// Rejected before any stage transition; the run never leaves `Idle`.
    #[error("no clips selected for export")]
    EmptySelection,
    /// The compression pass failed. Terminal for the run: `fetched` lists
    /// the clips that had already transferred so the caller can offer them
    /// as individually downloadable.
    #[error("archive finalization failed: {source}")]
    Archive {
        #[source]
        source: ArchiveError,
        fetched: Vec<String>,
    },
}

/// Everything a completed run exposes.
#[derive(Debug)]
pub struct ExportReport {
    pub archive: BuiltArchive,
    pub succeeded: usize,
    pub requested: usize,
    pub failures: Vec<FailureRecord>,
}

impl ExportReport {
    pub fn summary(&self) -> String {
        format!(
            "Successfully downloaded {} videos of {}",
            self.succeeded, self.requested
        )
    }
}

/// Drives the four-stage export pipeline:
/// prepare -> transfer -> archive -> complete.
///
/// Owns all progress and failure state. Progress is published through a
/// watch channel; observers only ever see clones, so no locking discipline
/// is needed around [`ProgressState`]. `run` takes `&mut self`, which makes
/// overlapping runs unrepresentable: a caller cannot start a second export
/// until the first returns.
pub struct ExportOrchestrator {
    client: Client,
    batch_size: usize,
    user: String,
    progress: watch::Sender<ProgressState>,
}

impl ExportOrchestrator {
    pub fn new(client: Client, user: impl Into<String>, batch_size: usize) -> Self {
        let (progress, _) = watch::channel(ProgressState::idle());
        Self {
            client,
            batch_size: batch_size.max(1),
            user: user.into(),
            progress,
        }
    }

    /// Subscribes to progress snapshots. Receivers see the latest state
    /// published at each stage transition and batch boundary.
    pub fn subscribe(&self) -> watch::Receiver<ProgressState> {
        self.progress.subscribe()
    }

    /// The most recently published progress snapshot.
    pub fn progress(&self) -> ProgressState {
        self.progress.borrow().clone()
    }

    fn publish(&self, state: &ProgressState) {
        self.progress.send_replace(state.clone());
    }

    /// Runs one full export of `selection` resolved against `catalog`.
    ///
    /// Per-item transfer failures never abort the run; they land in the
    /// failure log. An empty selection is rejected before `Preparing` with
    /// no network activity.
    pub async fn run(
        &mut self,
        catalog: &[ClipRef],
        selection: &Selection,
    ) -> Result<ExportReport, ExportError> {
        self.run_with_sink(catalog, selection, Cursor::new(Vec::new()), Cursor::into_inner)
            .await
    }

    /// Pipeline body, generic over the archive sink so the compression
    /// pass can target something other than an in-memory buffer.
    async fn run_with_sink<W, C>(
        &mut self,
        catalog: &[ClipRef],
        selection: &Selection,
        sink: W,
        into_payload: C,
    ) -> Result<ExportReport, ExportError>
    where
        W: Write + Seek,
        C: FnOnce(W) -> Vec<u8>,
    {
        if selection.is_empty() {
            warn!("export requested with an empty selection");
            self.publish(&ProgressState::idle());
            return Err(ExportError::EmptySelection);
        }

        // Fresh zero-state for every run.
        let mut state = ProgressState::idle();
        let mut estimator = SpeedEstimator::new();
        estimator.start(Instant::now());

        // Stage 1: resolve the selection into an ordered transfer plan.
        state.stage = Stage::Preparing;
        let clips = selection.materialize(catalog);
        state.total = clips.len();
        state.estimated_total_bytes = clips.len() as u64 * PER_CLIP_SIZE_ESTIMATE;
        self.publish(&state);
        info!(clips = clips.len(), batch_size = self.batch_size, "export prepared");

        // Stage 2: transfer batches; all accounting happens at the batch
        // barrier, never mid-chunk.
        state.stage = Stage::Transferring;
        let batches = scheduler::partition(&clips, self.batch_size);
        state.total_batches = batches.len();
        self.publish(&state);

        let mut builder = ArchiveBuilder::new();
        for (index, batch) in batches.iter().enumerate() {
            let outcomes = scheduler::run_batch(&self.client, batch, &mut estimator).await;
            for outcome in outcomes {
                match outcome {
                    TransferOutcome::Fetched { filename, payload } => {
                        state.bytes_transferred += payload.len() as u64;
                        builder.insert(filename, payload);
                    }
                    TransferOutcome::Failed { filename, reason } => {
                        warn!(%filename, %reason, "clip transfer failed");
                        state.failures.push(FailureRecord { filename, reason });
                    }
                }
            }

            state.processed += batch.len();
            state.batch_index = index + 1;
            state.transfer_percent = ((state.processed * 100) / state.total) as u8;
            state.rate_kbs = estimator.rate_kbs();
            state.throughput_window = estimator.window();
            let remaining = state
                .estimated_total_bytes
                .saturating_sub(state.bytes_transferred);
            state.eta_seconds = estimator.eta_seconds(remaining);
            self.publish(&state);
        }

        // Stage 3: single compression pass with its own percentage.
        state.stage = Stage::Archiving;
        state.archive_percent = 0;
        self.publish(&state);

        let fetched: Vec<String> = builder.filenames().map(str::to_string).collect();
        let progress_tx = &self.progress;
        let build_result = builder.build_into(sink, |percent| {
            state.archive_percent = percent;
            progress_tx.send_replace(state.clone());
        });

        let written = match build_result {
            Ok(written) => written,
            Err(source) => {
                error!(error = %source, "archive finalization failed, abandoning run");
                state.stage = Stage::Failed;
                self.publish(&state);
                return Err(ExportError::Archive { source, fetched });
            }
        };
        let archive = BuiltArchive {
            payload: into_payload(written),
            suggested_filename: crate::archive::suggested_filename(
                &self.user,
                Local::now().date_naive(),
            ),
        };

        // Stage 4: done.
        state.stage = Stage::Complete;
        state.archive_percent = 100;
        self.publish(&state);

        let report = ExportReport {
            archive,
            succeeded: state.total - state.failures.len(),
            requested: state.total,
            failures: state.failures.clone(),
        };
        info!(
            succeeded = report.succeeded,
            requested = report.requested,
            failures = report.failures.len(),
            "export complete"
        );
        Ok(report)
    }
}
