//! Timing controller for the performance path
//!
//! Wall-clock timestamps bracket only the accelerated invocation loop;
//! setup, transfer and retrieval stay outside the timed region. A
//! measurement that cannot complete is the distinct [`Measurement::Failed`]
//! sentinel, never a zero duration.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// One measured duration or the error sentinel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Measurement {
    /// Completed measurement; strictly positive
    Duration(Duration),
    /// The measurement could not be completed
    Failed,
}

impl Measurement {
    /// Whether the measurement completed
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, Measurement::Duration(_))
    }

    /// Seconds, if the measurement completed
    #[must_use]
    pub fn as_secs_f64(&self) -> Option<f64> {
        match self {
            Measurement::Duration(d) => Some(d.as_secs_f64()),
            Measurement::Failed => None,
        }
    }

    /// Wrap a raw duration, mapping zero to the error sentinel
    ///
    /// A zero wall-clock delta means the clock did not advance across
    /// the timed region; that is a timing error, not a fast kernel.
    #[must_use]
    pub fn from_wall_delta(d: Duration) -> Self {
        if d.is_zero() {
            Measurement::Failed
        } else {
            Measurement::Duration(d)
        }
    }
}

/// Iteration protocol for the accelerated timed loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Invocations inside the single timed region
    pub iterations: u32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self { iterations: 20 }
    }
}

/// Time a repeated invocation: warm-up drain, one timed region around
/// `iterations` calls, final drain, divide by the iteration count
///
/// `sync` drains the device queues; `body` enqueues one invocation.
/// Any error from either maps to [`Measurement::Failed`].
pub fn time_loop<S, B>(config: TimingConfig, mut sync: S, mut body: B) -> Measurement
where
    S: FnMut() -> Result<()>,
    B: FnMut() -> Result<()>,
{
    if config.iterations == 0 {
        return Measurement::Failed;
    }
    // Untimed warm-up: drain anything pending before the clock starts
    if sync().is_err() {
        return Measurement::Failed;
    }
    let start = Instant::now();
    for _ in 0..config.iterations {
        if body().is_err() {
            return Measurement::Failed;
        }
    }
    if sync().is_err() {
        return Measurement::Failed;
    }
    let elapsed = start.elapsed();
    match Measurement::from_wall_delta(elapsed) {
        Measurement::Duration(d) => Measurement::Duration(d / config.iterations),
        Measurement::Failed => Measurement::Failed,
    }
}

/// Time a single synchronous call (the reference path)
pub fn time_single<B>(mut body: B) -> Measurement
where
    B: FnMut() -> Result<()>,
{
    let start = Instant::now();
    if body().is_err() {
        return Measurement::Failed;
    }
    Measurement::from_wall_delta(start.elapsed())
}

/// Advisory verdict from the performance reporter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    /// Accelerated path is competitive with the reference
    Competitive,
    /// Accelerated path is slower; advisory only, never a test failure
    AdvisorySlower,
    /// One or both measurements failed; nothing to judge
    NotMeasured,
}

/// Receives the two measured durations and renders a judgment
///
/// The judgment is advisory: it never blocks correctness.
pub trait PerformanceReporter {
    /// Report one routine's timings
    fn report(&mut self, routine: &str, reference: Measurement, accelerated: Measurement)
        -> Verdict;
}

/// Default reporter judging by speedup ratio
///
/// Competitive when `accelerated <= threshold * reference`.
#[derive(Debug, Clone)]
pub struct SpeedupReporter {
    /// Allowed slowdown factor before the advisory flag
    pub threshold: f64,
    verdicts: Vec<(String, Verdict)>,
}

impl Default for SpeedupReporter {
    fn default() -> Self {
        Self {
            threshold: 1.0,
            verdicts: Vec::new(),
        }
    }
}

impl SpeedupReporter {
    /// Create a reporter with the given slowdown threshold
    #[must_use]
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            verdicts: Vec::new(),
        }
    }

    /// All verdicts rendered so far
    #[must_use]
    pub fn verdicts(&self) -> &[(String, Verdict)] {
        &self.verdicts
    }
}

impl PerformanceReporter for SpeedupReporter {
    fn report(
        &mut self,
        routine: &str,
        reference: Measurement,
        accelerated: Measurement,
    ) -> Verdict {
        let verdict = match (reference.as_secs_f64(), accelerated.as_secs_f64()) {
            (Some(r), Some(a)) => {
                if a <= r * self.threshold {
                    Verdict::Competitive
                } else {
                    Verdict::AdvisorySlower
                }
            }
            _ => Verdict::NotMeasured,
        };
        if verdict == Verdict::AdvisorySlower {
            eprintln!(">> WARNING: accelerated {routine} is slower than the reference in this case");
        }
        self.verdicts.push((routine.to_string(), verdict));
        verdict
    }
}
