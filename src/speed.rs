// src/speed.rs

use std::time::Instant;

/// Number of rate samples retained for smoothing.
const WINDOW: usize = 5;

/// Rolling throughput estimator.
///
/// Keeps the most recent [`WINDOW`] rate samples in a fixed-capacity ring
/// buffer; older samples are evicted FIFO, giving recency-weighted smoothing
/// without a full moving average.
#[derive(Debug)]
pub struct SpeedEstimator {
    samples: [f64; WINDOW],
    len: usize,
    head: usize,
    started_at: Option<Instant>,
}

impl Default for SpeedEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl SpeedEstimator {
    pub fn new() -> Self {
        Self {
            samples: [0.0; WINDOW],
            len: 0,
            head: 0,
            started_at: None,
        }
    }

    /// Marks the origin of the run. Samples recorded before `start` use the
    /// first `record` call as the origin instead.
    pub fn start(&mut self, now: Instant) {
        self.started_at = Some(now);
    }

    /// Discards all samples and the run origin.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Records that `bytes` finished transferring at `now`.
    ///
    /// The sample rate is `bytes / elapsed-since-start` in KB/s. An
    /// observation with zero elapsed time produces no sample at all, so the
    /// rate can never become infinite.
    pub fn record(&mut self, bytes: u64, now: Instant) {
        let started = *self.started_at.get_or_insert(now);
        let elapsed = now.saturating_duration_since(started);
        if elapsed.is_zero() {
            return;
        }
        let rate_kbs = (bytes as f64 / elapsed.as_secs_f64()) / 1024.0;
        self.push(rate_kbs);
    }

    fn push(&mut self, rate_kbs: f64) {
        if self.len < WINDOW {
            self.samples[(self.head + self.len) % WINDOW] = rate_kbs;
            self.len += 1;
        } else {
            // Full: overwrite the oldest slot and advance the head.
            self.samples[self.head] = rate_kbs;
            self.head = (self.head + 1) % WINDOW;
        }
    }

    /// Arithmetic mean of the retained samples, in KB/s. 0.0 before any
    /// sample has been recorded.
    pub fn rate_kbs(&self) -> f64 {
        if self.len == 0 {
            return 0.0;
        }
        self.window().iter().sum::<f64>() / self.len as f64
    }

    /// Estimated seconds to transfer `remaining_bytes` at the current rate.
    /// `None` while the rate is still zero.
    pub fn eta_seconds(&self, remaining_bytes: u64) -> Option<f64> {
        let rate = self.rate_kbs();
        if rate <= 0.0 {
            return None;
        }
        Some(remaining_bytes as f64 / (rate * 1024.0))
    }

    /// Retained samples, oldest first.
    pub fn window(&self) -> Vec<f64> {
        (0..self.len)
            .map(|i| self.samples[(self.head + i) % WINDOW])
            .collect()
    }
}

/// Renders an ETA for display. `None` means the rate is still unknown.
pub fn format_eta(eta: Option<f64>) -> String {
    let seconds = match eta {
        Some(s) if s.is_finite() && s >= 0.0 => s,
        _ => return "Calculating...".to_string(),
    };
    let whole = seconds as u64;
    if whole < 60 {
        format!("{whole} seconds")
    } else if whole < 3600 {
        format!("{} min {} sec", whole / 60, whole % 60)
    } else {
        format!("{} hr {} min", whole / 3600, (whole % 3600) / 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn origin() -> Instant {
        Instant::now()
    }

    #[test]
    fn empty_estimator_reports_zero_rate() {
        let est = SpeedEstimator::new();
        assert_eq!(est.rate_kbs(), 0.0);
        assert_eq!(est.eta_seconds(1024), None);
    }

    #[test]
    fn zero_elapsed_sample_is_ignored() {
        let t0 = origin();
        let mut est = SpeedEstimator::new();
        est.start(t0);
        est.record(4096, t0);
        assert_eq!(est.window().len(), 0);
        assert_eq!(est.rate_kbs(), 0.0);
    }

    #[test]
    fn zero_byte_samples_never_raise_rate_and_window_holds_five() {
        let t0 = origin();
        let mut est = SpeedEstimator::new();
        est.start(t0);
        for i in 1..=6u64 {
            est.record(0, t0 + Duration::from_secs(i));
        }
        assert_eq!(est.window().len(), 5);
        assert_eq!(est.rate_kbs(), 0.0);
        // No divide-by-zero: ETA is simply unknown at zero rate.
        assert_eq!(est.eta_seconds(1_000_000), None);
    }

    #[test]
    fn sixth_sample_evicts_the_first() {
        let t0 = origin();
        let mut est = SpeedEstimator::new();
        est.start(t0);
        // One distinct rate per second of elapsed time.
        for i in 1..=5u64 {
            est.record(i * 1024 * i, t0 + Duration::from_secs(i));
        }
        let before = est.window();
        assert_eq!(before.len(), 5);

        est.record(7 * 1024 * 6, t0 + Duration::from_secs(6));
        let after = est.window();
        assert_eq!(after.len(), 5);
        assert_eq!(after[..4], before[1..]);
        assert!((after[4] - 7.0).abs() < 1e-9);
    }

    #[test]
    fn rate_is_mean_of_window() {
        let t0 = origin();
        let mut est = SpeedEstimator::new();
        est.start(t0);
        // 1024 bytes over 1s = 1 KB/s; 4096 over 2s = 2 KB/s.
        est.record(1024, t0 + Duration::from_secs(1));
        est.record(4096, t0 + Duration::from_secs(2));
        assert!((est.rate_kbs() - 1.5).abs() < 1e-9);
    }

    #[test]
    fn eta_divides_remaining_by_rate() {
        let t0 = origin();
        let mut est = SpeedEstimator::new();
        est.start(t0);
        est.record(1024, t0 + Duration::from_secs(1)); // 1 KB/s
        let eta = est.eta_seconds(10 * 1024).unwrap();
        assert!((eta - 10.0).abs() < 1e-9);
    }

    #[test]
    fn eta_formatting() {
        assert_eq!(format_eta(None), "Calculating...");
        assert_eq!(format_eta(Some(42.7)), "42 seconds");
        assert_eq!(format_eta(Some(125.0)), "2 min 5 sec");
        assert_eq!(format_eta(Some(3_720.0)), "1 hr 2 min");
        assert_eq!(format_eta(Some(f64::INFINITY)), "Calculating...");
    }
}
