// src/transfer.rs

use crate::models::ClipRef;
use reqwest::Client;
use thiserror::Error;
use tracing::debug;

/// Expected media extension for delivered clips.
const MEDIA_EXT: &str = ".mp4";

/// Internal error plumbing for a single fetch attempt. Converted into a
/// [`TransferOutcome::Failed`] before leaving this module; per-item failures
/// are data, not control flow.
#[derive(Debug, Error)]
enum TransferError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("clip has no source url")]
    MissingUrl,
}

/// Settled result of one transfer. Consumed at the batch barrier: the
/// payload goes into the archive, or the reason goes into the failure log.
#[derive(Debug, Clone)]
pub enum TransferOutcome {
    Fetched { filename: String, payload: Vec<u8> },
    Failed { filename: String, reason: String },
}

impl TransferOutcome {
    pub fn filename(&self) -> &str {
        match self {
            TransferOutcome::Fetched { filename, .. } => filename,
            TransferOutcome::Failed { filename, .. } => filename,
        }
    }

    pub fn succeeded(&self) -> bool {
        matches!(self, TransferOutcome::Fetched { .. })
    }

    /// Payload size in bytes; 0 for failures.
    pub fn byte_size(&self) -> u64 {
        match self {
            TransferOutcome::Fetched { payload, .. } => payload.len() as u64,
            TransferOutcome::Failed { .. } => 0,
        }
    }
}

/// Ensures the filename carries the expected media extension.
pub fn normalized_filename(name: &str) -> String {
    if name.ends_with(MEDIA_EXT) {
        name.to_string()
    } else {
        format!("{name}{MEDIA_EXT}")
    }
}

/// Fetches one clip fully into memory.
///
/// Never returns an error: any network, status, or body failure becomes a
/// [`TransferOutcome::Failed`] carrying the original filename and a
/// human-readable reason, so batch aggregation stays uniform.
pub async fn fetch_clip(client: &Client, clip: &ClipRef) -> TransferOutcome {
    match fetch_inner(client, clip).await {
        Ok(payload) => {
            debug!(
                filename = %clip.filename,
                bytes = payload.len(),
                "clip buffered"
            );
            TransferOutcome::Fetched {
                filename: normalized_filename(&clip.filename),
                payload,
            }
        }
        Err(e) => TransferOutcome::Failed {
            filename: clip.filename.clone(),
            reason: e.to_string(),
        },
    }
}

async fn fetch_inner(client: &Client, clip: &ClipRef) -> Result<Vec<u8>, TransferError> {
    if clip.source_url.is_empty() {
        return Err(TransferError::MissingUrl);
    }
    let response = client
        .get(&clip.source_url)
        .send()
        .await?
        .error_for_status()?;
    let payload = response.bytes().await?;
    Ok(payload.to_vec())
}
