// src/progress.rs

use crate::models::FailureRecord;

/// Pipeline stage, in strict order. No skipping, no re-entry except via a
/// fresh run. `Failed` is the terminal state for an archive finalization
/// failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Preparing,
    Transferring,
    Archiving,
    Complete,
    Failed,
}

impl Stage {
    pub fn label(&self) -> &'static str {
        match self {
            Stage::Idle => "Idle",
            Stage::Preparing => "Preparing files",
            Stage::Transferring => "Downloading files",
            Stage::Archiving => "Creating archive",
            Stage::Complete => "Complete",
            Stage::Failed => "Failed",
        }
    }
}

/// Snapshot of the orchestrator's progress, published after every stage
/// transition and batch boundary.
///
/// Exclusively owned by the orchestrator; observers receive clones through
/// a watch channel, never a shared mutable reference.
#[derive(Debug, Clone)]
pub struct ProgressState {
    pub stage: Stage,
    /// Clips settled so far (successes and failures alike).
    pub processed: usize,
    pub total: usize,
    /// 1-based index of the batch most recently settled; 0 before any.
    pub batch_index: usize,
    pub total_batches: usize,
    /// Transfer-phase completion, 0..=100.
    pub transfer_percent: u8,
    /// Archive-phase completion, 0..=100. Independent of the transfer one.
    pub archive_percent: u8,
    pub bytes_transferred: u64,
    /// Coarse pre-transfer estimate; true sizes are unknown until fetched.
    pub estimated_total_bytes: u64,
    /// Retained throughput samples, oldest first, in KB/s.
    pub throughput_window: Vec<f64>,
    pub rate_kbs: f64,
    pub eta_seconds: Option<f64>,
    pub failures: Vec<FailureRecord>,
}

impl Default for ProgressState {
    fn default() -> Self {
        Self::idle()
    }
}

impl ProgressState {
    /// The zero-state every run starts from.
    pub fn idle() -> Self {
        Self {
            stage: Stage::Idle,
            processed: 0,
            total: 0,
            batch_index: 0,
            total_batches: 0,
            transfer_percent: 0,
            archive_percent: 0,
            bytes_transferred: 0,
            estimated_total_bytes: 0,
            throughput_window: Vec::new(),
            rate_kbs: 0.0,
            eta_seconds: None,
            failures: Vec::new(),
        }
    }
}
