//! Statistical summaries over repeated timing measurements
//!
//! The timing controller produces one averaged duration per timed
//! region; suites that repeat a region collect the samples here to
//! judge measurement stability before trusting a comparison.

#![allow(clippy::cast_precision_loss)]

use crate::timing::Measurement;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Summary statistics over a set of duration samples
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingStatistics {
    /// Mean duration
    pub mean: Duration,
    /// Sample standard deviation
    pub std_dev: Duration,
    /// Minimum sample
    pub min: Duration,
    /// Maximum sample
    pub max: Duration,
    /// Median (nearest rank)
    pub p50: Duration,
    /// 95th percentile (nearest rank)
    pub p95: Duration,
    /// Coefficient of variation (std_dev / mean)
    pub cv: f64,
    /// Number of valid samples summarized
    pub samples: usize,
    /// Number of failed measurements dropped from the summary
    pub failed: usize,
}

impl TimingStatistics {
    /// Summarize measurements, dropping failed ones
    ///
    /// Returns `None` when no measurement completed; a run of failures
    /// must never masquerade as a zero-latency result.
    #[must_use]
    pub fn from_measurements(measurements: &[Measurement]) -> Option<Self> {
        let durations: Vec<Duration> = measurements
            .iter()
            .filter_map(|m| match m {
                Measurement::Duration(d) => Some(*d),
                Measurement::Failed => None,
            })
            .collect();
        let failed = measurements.len() - durations.len();
        if durations.is_empty() {
            return None;
        }
        Some(Self::from_durations(&durations, failed))
    }

    fn from_durations(samples: &[Duration], failed: usize) -> Self {
        let n = samples.len();
        let n_f64 = n as f64;

        let sum_nanos: u128 = samples.iter().map(Duration::as_nanos).sum();
        let mean_nanos = (sum_nanos / n as u128) as f64;
        let mean = Duration::from_nanos(mean_nanos as u64);

        let variance: f64 = samples
            .iter()
            .map(|s| {
                let diff = s.as_nanos() as f64 - mean_nanos;
                diff * diff
            })
            .sum::<f64>()
            / (n_f64 - 1.0).max(1.0);
        let std_dev_nanos = variance.sqrt();
        let std_dev = Duration::from_nanos(std_dev_nanos as u64);

        let mut sorted: Vec<Duration> = samples.to_vec();
        sorted.sort();
        let percentile = |p: f64| -> Duration {
            let idx = ((p / 100.0) * n_f64).ceil() as usize;
            sorted[idx.saturating_sub(1).min(n - 1)]
        };

        let cv = if mean_nanos > 0.0 {
            std_dev_nanos / mean_nanos
        } else {
            0.0
        };

        Self {
            mean,
            std_dev,
            min: sorted[0],
            max: sorted[n - 1],
            p50: percentile(50.0),
            p95: percentile(95.0),
            cv,
            samples: n,
            failed,
        }
    }

    /// Whether the measurements are stable enough to compare
    /// (coefficient of variation under `target_cv`)
    #[must_use]
    pub fn is_stable(&self, target_cv: f64) -> bool {
        self.cv < target_cv
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Measurement {
        Measurement::Duration(Duration::from_millis(v))
    }

    #[test]
    fn test_summary_of_identical_samples() {
        let stats = TimingStatistics::from_measurements(&[ms(10), ms(10), ms(10)]).unwrap();
        assert_eq!(stats.mean, Duration::from_millis(10));
        assert_eq!(stats.std_dev, Duration::ZERO);
        assert_eq!(stats.cv, 0.0);
        assert_eq!(stats.samples, 3);
        assert!(stats.is_stable(0.05));
    }

    #[test]
    fn test_percentiles_from_sorted_order() {
        let stats =
            TimingStatistics::from_measurements(&[ms(5), ms(1), ms(3), ms(2), ms(4)]).unwrap();
        assert_eq!(stats.min, Duration::from_millis(1));
        assert_eq!(stats.max, Duration::from_millis(5));
        assert_eq!(stats.p50, Duration::from_millis(3));
    }

    #[test]
    fn test_failed_measurements_are_dropped_and_counted() {
        let stats =
            TimingStatistics::from_measurements(&[ms(10), Measurement::Failed, ms(12)]).unwrap();
        assert_eq!(stats.samples, 2);
        assert_eq!(stats.failed, 1);
    }

    #[test]
    fn test_all_failed_yields_none() {
        let stats = TimingStatistics::from_measurements(&[Measurement::Failed, Measurement::Failed]);
        assert!(stats.is_none());
    }

    #[test]
    fn test_high_variance_is_unstable() {
        let stats = TimingStatistics::from_measurements(&[ms(1), ms(100)]).unwrap();
        assert!(!stats.is_stable(0.05));
    }

    #[test]
    fn test_serde_roundtrip() {
        let stats = TimingStatistics::from_measurements(&[ms(2), ms(4)]).unwrap();
        let json = serde_json::to_string(&stats).unwrap();
        let back: TimingStatistics = serde_json::from_str(&json).unwrap();
        assert_eq!(stats, back);
    }
}
