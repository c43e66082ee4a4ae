use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::Instant;

/// Maximum number of retained samples.
pub const WINDOW_SIZE: usize = 10;

/// Lifecycle of a [`BandwidthEstimator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EstimatorState {
    Idle,
    Running,
    Finished,
}

/// Moving-average throughput estimator fed with cumulative byte counts.
///
/// While running, the rate is the slope across the sample window; once
/// finished, it is the final byte count over the whole transfer duration.
#[derive(Debug)]
pub struct BandwidthEstimator {
    samples: VecDeque<u64>,
    poll_interval: Duration,
    state: EstimatorState,
    started_at: Option<Instant>,
    finished_at: Option<Instant>,
}

impl BandwidthEstimator {
    /// Creates an idle estimator sampled every `poll_interval`.
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            samples: VecDeque::with_capacity(WINDOW_SIZE),
            poll_interval,
            state: EstimatorState::Idle,
            started_at: None,
            finished_at: None,
        }
    }

    /// Records the start time. No-op unless idle.
    pub fn start(&mut self) {
        if self.state == EstimatorState::Idle {
            self.started_at = Some(Instant::now());
            self.state = EstimatorState::Running;
        }
    }

    /// Appends a cumulative byte count, evicting the oldest at capacity.
    ///
    /// Ignored once finished.
    pub fn push_sample(&mut self, cumulative_bytes: u64) {
        if self.state == EstimatorState::Finished {
            return;
        }
        if self.samples.len() == WINDOW_SIZE {
            self.samples.pop_front();
        }
        self.samples.push_back(cumulative_bytes);
    }

    /// Pushes the final byte count and freezes the window. Idempotent.
    pub fn finish(&mut self, final_bytes: u64) {
        if self.state == EstimatorState::Finished {
            return;
        }
        self.push_sample(final_bytes);
        self.finished_at = Some(Instant::now());
        self.state = EstimatorState::Finished;
    }

    /// Average rate in bits per second.
    pub fn average_rate(&self) -> f64 {
        let (Some(&first), Some(&last)) = (self.samples.front(), self.samples.back()) else {
            return 0.0;
        };

        if self.state == EstimatorState::Finished {
            let elapsed = match (self.started_at, self.finished_at) {
                (Some(start), Some(end)) => end.duration_since(start).as_secs_f64(),
                _ => 0.0,
            };
            if elapsed <= 0.0 {
                return 0.0;
            }
            return 8.0 * last as f64 / elapsed;
        }

        let window_secs = self.samples.len() as f64 * self.poll_interval.as_secs_f64();
        if window_secs <= 0.0 {
            return 0.0;
        }
        8.0 * last.saturating_sub(first) as f64 / window_secs
    }

    pub fn state(&self) -> EstimatorState {
        self.state
    }

    /// Current sample window, oldest first.
    pub fn samples(&self) -> impl Iterator<Item = u64> + '_ {
        self.samples.iter().copied()
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POLL: Duration = Duration::from_millis(100);

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-6,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn empty_window_rate_is_zero() {
        let mut est = BandwidthEstimator::new(POLL);
        assert_eq!(est.average_rate(), 0.0);
        est.start();
        assert_eq!(est.average_rate(), 0.0);
    }

    #[test]
    fn running_rate_uses_window_slope() {
        let mut est = BandwidthEstimator::new(POLL);
        est.start();
        for bytes in [0, 1000, 2000] {
            est.push_sample(bytes);
        }
        assert_close(est.average_rate(), 8.0 * 2000.0 / (3.0 * 0.1));
    }

    #[tokio::test(start_paused = true)]
    async fn finished_rate_uses_whole_duration() {
        let mut est = BandwidthEstimator::new(POLL);
        est.start();
        est.push_sample(0);
        est.push_sample(1000);
        tokio::time::advance(Duration::from_secs(1)).await;
        est.finish(2000);

        assert_eq!(est.state(), EstimatorState::Finished);
        assert_close(est.average_rate(), 8.0 * 2000.0 / 1.0);
    }

    #[test]
    fn window_keeps_most_recent_ten() {
        let mut est = BandwidthEstimator::new(POLL);
        est.start();
        for i in 0..15 {
            est.push_sample(i * 100);
        }
        let samples: Vec<u64> = est.samples().collect();
        assert_eq!(samples.len(), WINDOW_SIZE);
        assert_eq!(samples, (5..15).map(|i| i * 100).collect::<Vec<_>>());
    }

    #[test]
    fn finish_is_idempotent_and_freezes_window() {
        let mut est = BandwidthEstimator::new(POLL);
        est.start();
        est.push_sample(10);
        est.finish(20);
        est.finish(30);
        est.push_sample(40);

        let samples: Vec<u64> = est.samples().collect();
        assert_eq!(samples, vec![10, 20]);
    }

    #[test]
    fn zero_elapsed_after_finish_is_zero_rate() {
        let mut est = BandwidthEstimator::new(POLL);
        // Finished without ever starting: no duration to divide by.
        est.finish(5000);
        assert_eq!(est.average_rate(), 0.0);
    }

    #[test]
    fn start_is_noop_after_running() {
        let mut est = BandwidthEstimator::new(POLL);
        est.start();
        est.start();
        assert_eq!(est.state(), EstimatorState::Running);
        assert_eq!(est.poll_interval(), POLL);
    }
}
