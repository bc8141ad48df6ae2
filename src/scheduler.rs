// src/scheduler.rs

use crate::models::ClipRef;
use crate::speed::SpeedEstimator;
use crate::transfer::{fetch_clip, TransferOutcome};
use futures_util::stream::{FuturesUnordered, StreamExt};
use reqwest::Client;
use std::time::Instant;
use tracing::debug;

/// Default number of clips transferred concurrently per batch.
pub const DEFAULT_BATCH_SIZE: usize = 5;

/// Partitions `clips` into contiguous chunks of at most `batch_size`,
/// preserving order. Produces `ceil(N / B)` chunks; an empty input yields
/// zero chunks.
pub fn partition(clips: &[ClipRef], batch_size: usize) -> Vec<&[ClipRef]> {
    assert!(batch_size > 0, "batch size must be positive");
    clips.chunks(batch_size).collect()
}

/// Runs one batch: every member's transfer is dispatched concurrently and
/// the call returns only after all of them have settled, success or failure.
/// This caps in-flight network and memory pressure at the batch size.
///
/// Each success reports its byte count to the estimator the moment its
/// future completes, so recording order follows completion order. The
/// returned outcomes are re-ordered to match the input order, which is what
/// downstream archive insertion expects.
pub async fn run_batch(
    client: &Client,
    batch: &[ClipRef],
    estimator: &mut SpeedEstimator,
) -> Vec<TransferOutcome> {
    let mut in_flight: FuturesUnordered<_> = batch
        .iter()
        .enumerate()
        .map(|(idx, clip)| async move { (idx, fetch_clip(client, clip).await) })
        .collect();

    let mut settled: Vec<Option<TransferOutcome>> = vec![None; batch.len()];
    while let Some((idx, outcome)) = in_flight.next().await {
        if outcome.succeeded() {
            estimator.record(outcome.byte_size(), Instant::now());
        }
        debug!(
            filename = %outcome.filename(),
            succeeded = outcome.succeeded(),
            "transfer settled"
        );
        settled[idx] = Some(outcome);
    }

    // Every slot is filled once the stream is drained.
    settled.into_iter().flatten().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn clips(n: usize) -> Vec<ClipRef> {
        (0..n)
            .map(|i| ClipRef {
                id: format!("id-{i}"),
                filename: format!("clip-{i}.mp4"),
                source_url: format!("http://example.com/clip-{i}"),
                date: "01-02-2025".to_string(),
                from_time: "01:00:00".to_string(),
                to_time: "01:05:00".to_string(),
            })
            .collect()
    }

    #[test]
    fn partition_counts_match_ceiling_division() {
        for (n, b, expected) in [(12, 5, 3), (10, 5, 2), (1, 5, 1), (5, 5, 1), (3, 10, 1)] {
            let clips = clips(n);
            let chunks = partition(&clips, b);
            assert_eq!(chunks.len(), expected, "N={n} B={b}");
            let total: usize = chunks.iter().map(|c| c.len()).sum();
            assert_eq!(total, n);
        }
    }

    #[test]
    fn twelve_by_five_partitions_as_five_five_two() {
        let clips = clips(12);
        let sizes: Vec<_> = partition(&clips, 5).iter().map(|c| c.len()).collect();
        assert_eq!(sizes, vec![5, 5, 2]);
    }

    #[test]
    fn empty_selection_yields_zero_batches() {
        assert!(partition(&[], 5).is_empty());
    }

    #[test]
    fn partition_preserves_input_order() {
        let clips = clips(7);
        let chunks = partition(&clips, 3);
        let flattened: Vec<_> = chunks
            .iter()
            .flat_map(|c| c.iter().map(|clip| clip.id.clone()))
            .collect();
        let original: Vec<_> = clips.iter().map(|c| c.id.clone()).collect();
        assert_eq!(flattened, original);
    }

    #[tokio::test]
    async fn batch_settles_all_members_and_keeps_input_order() {
        let server = MockServer::start().await;
        for i in 0..4 {
            Mock::given(method("GET"))
                .and(path(format!("/clip-{i}")))
                .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![i as u8; 64]))
                .mount(&server)
                .await;
        }

        let batch: Vec<ClipRef> = clips(4)
            .into_iter()
            .map(|mut c| {
                c.source_url = format!("{}/clip-{}", server.uri(), &c.id[3..]);
                c
            })
            .collect();

        let client = Client::new();
        let mut estimator = SpeedEstimator::new();
        estimator.start(Instant::now());
        let outcomes = run_batch(&client, &batch, &mut estimator).await;

        assert_eq!(outcomes.len(), 4);
        for (clip, outcome) in batch.iter().zip(&outcomes) {
            assert_eq!(outcome.filename(), clip.filename);
            assert!(outcome.succeeded());
        }
        assert!(!estimator.window().is_empty());
    }

    #[tokio::test]
    async fn one_failure_does_not_abort_the_batch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ok"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"payload".to_vec()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/broken"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let mut batch = clips(2);
        batch[0].source_url = format!("{}/ok", server.uri());
        batch[1].source_url = format!("{}/broken", server.uri());

        let client = Client::new();
        let mut estimator = SpeedEstimator::new();
        let outcomes = run_batch(&client, &batch, &mut estimator).await;

        assert!(outcomes[0].succeeded());
        assert!(!outcomes[1].succeeded());
    }
}
