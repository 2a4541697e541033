//! Execution orchestrator: the two-sided run for one test case
//!
//! Owns the per-case state machine
//! `INIT → GENERATE → STAGE → TRANSFER → INVOKE(reference) →
//! INVOKE(accelerated) → SYNC → RETRIEVE → (COMPARE | TIME) → RELEASE`.
//!
//! Skips are successful outcomes: a case the device cannot host is
//! reported as [`CaseOutcome::Skipped`], never as a failure, and every
//! partial resource is released first (host buffers and device handles
//! are RAII values, so release happens on every exit path without
//! per-return cleanup code). One case's failure never aborts siblings;
//! the suite driver simply collects outcomes.

use crate::compare::verify_output;
use crate::device::{DeviceContext, MemIntent, QueueId};
use crate::element::Element;
use crate::engine::{reorder_to_col_major, AcceleratedEngine, ReferenceEngine};
use crate::error::{Result, VerificarError};
use crate::gate::{self, AllocationRequest, GateDecision};
use crate::generate::OperandGenerator;
use crate::params::{AccessPattern, Order, TestParams, Uplo};
use crate::timing::{
    time_loop, time_single, Measurement, PerformanceReporter, TimingConfig, Verdict,
};
use serde::{Deserialize, Serialize};

/// Why a case was skipped (all skips are successful outcomes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    /// The device lacks a numeric capability the element type needs
    UnsupportedCapability,
    /// The case is redundant at the current coverage level
    Coverage,
    /// The pre-check or an allocation request found memory insufficient
    Resources,
}

/// Terminal outcome of one test case
#[derive(Debug, Clone, PartialEq)]
pub enum CaseOutcome {
    /// Correctness verified (or performance run completed)
    Passed,
    /// Case could not run here; not a failure
    Skipped(SkipReason),
    /// Hard failure, naming the failing call or position
    Failed(VerificarError),
}

impl CaseOutcome {
    /// Whether the case passed
    #[must_use]
    pub fn is_passed(&self) -> bool {
        matches!(self, CaseOutcome::Passed)
    }

    /// Whether the case was skipped
    #[must_use]
    pub fn is_skipped(&self) -> bool {
        matches!(self, CaseOutcome::Skipped(_))
    }

    /// Whether the case failed
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, CaseOutcome::Failed(_))
    }
}

/// The reference-computed and device-computed buffers for one output
///
/// Created together, compared once, dropped together.
#[derive(Debug)]
pub struct ResultPair<T: Element> {
    /// Output computed by the reference engine
    pub reference: Vec<T>,
    /// Output retrieved from the device
    pub device: Vec<T>,
}

impl<T: Element> ResultPair<T> {
    /// Compare the pair over the logical pattern and verify sentinels
    ///
    /// # Errors
    ///
    /// Propagates the first mismatch or clobbered sentinel.
    pub fn verify(&self, pattern: &AccessPattern) -> Result<()> {
        verify_output(&self.reference, &self.device, pattern)
    }
}

/// Outcome and measurements of one performance case
#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceReport {
    /// Routine name
    pub routine: String,
    /// Terminal outcome (performance failures are advisory, so this is
    /// `Passed` unless the case was skipped)
    pub outcome: CaseOutcome,
    /// Single-shot reference duration
    pub reference: Measurement,
    /// Averaged accelerated duration
    pub accelerated: Measurement,
    /// Advisory judgment from the reporter
    pub verdict: Verdict,
}

impl PerformanceReport {
    fn skipped(routine: &str, reason: SkipReason) -> Self {
        Self {
            routine: routine.to_string(),
            outcome: CaseOutcome::Skipped(reason),
            reference: Measurement::Failed,
            accelerated: Measurement::Failed,
            verdict: Verdict::NotMeasured,
        }
    }
}

/// Drives one test case through both engines over the same operands
pub struct Orchestrator<'a, T: Element> {
    ctx: &'a DeviceContext,
    reference: &'a dyn ReferenceEngine<T>,
    accelerated: &'a dyn AcceleratedEngine<T>,
}

impl<'a, T: Element> Orchestrator<'a, T> {
    /// Create an orchestrator over one device context and two engines
    #[must_use]
    pub fn new(
        ctx: &'a DeviceContext,
        reference: &'a dyn ReferenceEngine<T>,
        accelerated: &'a dyn AcceleratedEngine<T>,
    ) -> Self {
        Self {
            ctx,
            reference,
            accelerated,
        }
    }

    /// INIT-stage skip decisions shared by every run mode
    fn preflight(&self, params: &TestParams) -> Option<SkipReason> {
        if T::REQUIRES_F64 && !self.ctx.caps().supports_f64 {
            eprintln!(
                ">> WARNING: the target device does not support native double \
                 precision floating point arithmetic"
            );
            eprintln!(">> Test skipped");
            return Some(SkipReason::UnsupportedCapability);
        }
        if params.redundant_for_coverage() {
            eprintln!(">> Test skipped: no importance for this coverage level");
            return Some(SkipReason::Coverage);
        }
        None
    }

    fn case_queues(&self, params: &TestParams) -> Result<Vec<QueueId>> {
        let available = self.ctx.queues();
        if params.num_queues > available.len() {
            return Err(VerificarError::InvalidShape {
                reason: format!(
                    "case wants {} queues, device exposes {}",
                    params.num_queues,
                    available.len()
                ),
            });
        }
        Ok(available[..params.num_queues].to_vec())
    }

    /// Column-major-only reference invocation for GEMV, reordering
    /// row-major storage first (the accelerated engine never sees the
    /// reordered copy)
    fn reference_gemv(&self, params: &TestParams, a: &[T], x: &[T], y: &mut [T]) {
        let alpha = T::from_scalar(params.effective_alpha());
        let beta = T::from_scalar(params.effective_beta());
        match params.order {
            Order::ColMajor => self.reference.gemv(
                params.trans_a,
                params.m,
                params.n,
                alpha,
                a,
                params.off_a,
                params.lda,
                x,
                &params.x_pattern(),
                beta,
                y,
                &params.y_pattern(),
            ),
            Order::RowMajor => {
                let col_a = reorder_to_col_major(a, params.m, params.n, params.lda, params.off_a);
                self.reference.gemv(
                    params.trans_a,
                    params.m,
                    params.n,
                    alpha,
                    &col_a,
                    0,
                    params.m,
                    x,
                    &params.x_pattern(),
                    beta,
                    y,
                    &params.y_pattern(),
                );
            }
        }
    }

    /// Column-major-only reference invocation for HPR; row-major packed
    /// storage maps to the opposite triangle of the conjugated matrix
    fn reference_hpr(&self, params: &TestParams, x: &[T], ap: &mut [T]) {
        match params.order {
            Order::ColMajor => self.reference.hpr(
                params.uplo,
                params.n,
                params.alpha.re,
                x,
                &hpr_x_pattern(params),
                ap,
                params.off_a,
            ),
            Order::RowMajor => {
                let flipped = match params.uplo {
                    Uplo::Upper => Uplo::Lower,
                    Uplo::Lower => Uplo::Upper,
                };
                let conj_x: Vec<T> = x.iter().map(|v| v.conj()).collect();
                self.reference.hpr(
                    flipped,
                    params.n,
                    params.alpha.re,
                    &conj_x,
                    &hpr_x_pattern(params),
                    ap,
                    params.off_a,
                );
            }
        }
    }

    /// Run one GEMV correctness case end to end
    #[must_use]
    pub fn run_gemv_correctness(&self, params: &TestParams) -> CaseOutcome {
        if let Err(err) = params.validate() {
            return CaseOutcome::Failed(err);
        }
        if let Some(reason) = self.preflight(params) {
            return CaseOutcome::Skipped(reason);
        }
        let queues = match self.case_queues(params) {
            Ok(q) => q,
            Err(err) => return CaseOutcome::Failed(err),
        };

        let x_pat = params.x_pattern();
        let y_pat = params.y_pattern();
        let a_len = params.a_extent();
        let x_len = x_pat.extent();
        let y_len = y_pat.extent();

        let decision = gate::check(
            self.ctx.caps(),
            &[
                AllocationRequest::new("A", a_len * T::size_of()),
                AllocationRequest::new("X", x_len * T::size_of()),
                AllocationRequest::new("Y", y_len * T::size_of()),
            ],
        );
        if let GateDecision::Insufficient { reason } = decision {
            eprintln!(">> RESOURCE CHECK: skip due to insufficient resources: {reason}");
            return CaseOutcome::Skipped(SkipReason::Resources);
        }

        // GENERATE: poisoned buffers, random fill of the logical regions
        let mut a_host = vec![T::sentinel(); a_len];
        let mut x_host = vec![T::sentinel(); x_len];
        let mut y_host = vec![T::sentinel(); y_len];
        let mut generator = OperandGenerator::for_params(params);
        generator.fill_gemv_operands(params, &mut a_host, &mut x_host, &mut y_host);

        // Byte-identical accumulator start state for both paths
        let y_initial = y_host.clone();

        // INVOKE(reference): once, synchronously, before any transfer
        let mut y_reference = y_initial.clone();
        self.reference_gemv(params, &a_host, &x_host, &mut y_reference);

        // STAGE / TRANSFER
        let Some(buf_a) = self.ctx.create_buffer(&a_host, MemIntent::ReadOnly) else {
            return self.transfer_skip("A");
        };
        let Some(buf_x) = self.ctx.create_buffer(&x_host, MemIntent::ReadOnly) else {
            return self.transfer_skip("X");
        };
        let Some(buf_y) = self.ctx.create_buffer(&y_initial, MemIntent::ReadWrite) else {
            return self.transfer_skip("Y");
        };

        // INVOKE(accelerated) → SYNC → RETRIEVE
        if let Err(err) = self
            .accelerated
            .gemv(params, &buf_a, &buf_x, &buf_y, &queues)
        {
            return CaseOutcome::Failed(err);
        }
        if let Err(err) = self.ctx.sync_all_queues(&queues) {
            return CaseOutcome::Failed(err);
        }
        let mut y_device = vec![T::sentinel(); y_len];
        if let Err(err) = self.ctx.read_back(&buf_y, &mut y_device) {
            return CaseOutcome::Failed(err);
        }

        // RELEASE device handles before comparing
        drop(buf_a);
        drop(buf_x);
        drop(buf_y);

        // COMPARE
        let pair = ResultPair {
            reference: y_reference,
            device: y_device,
        };
        match pair.verify(&y_pat) {
            Ok(()) => CaseOutcome::Passed,
            Err(err) => CaseOutcome::Failed(err),
        }
    }

    /// Run one packed Hermitian rank-1 update correctness case
    #[must_use]
    pub fn run_hpr_correctness(&self, params: &TestParams) -> CaseOutcome {
        if params.n == 0 || params.incx == 0 || params.num_queues == 0 {
            return CaseOutcome::Failed(VerificarError::InvalidShape {
                reason: "HPR requires n > 0, nonzero incx and at least one queue".to_string(),
            });
        }
        if let Some(reason) = self.preflight(params) {
            return CaseOutcome::Skipped(reason);
        }
        let queues = match self.case_queues(params) {
            Ok(q) => q,
            Err(err) => return CaseOutcome::Failed(err),
        };

        let x_pat = hpr_x_pattern(params);
        let ap_pat = AccessPattern::new(params.off_a, 1, TestParams::packed_len(params.n));
        let ap_len = ap_pat.extent();
        let x_len = x_pat.extent();

        let decision = gate::check(
            self.ctx.caps(),
            &[
                AllocationRequest::new("AP", ap_len * T::size_of()),
                AllocationRequest::new("X", x_len * T::size_of()),
            ],
        );
        if let GateDecision::Insufficient { reason } = decision {
            eprintln!(">> RESOURCE CHECK: skip due to insufficient resources: {reason}");
            return CaseOutcome::Skipped(SkipReason::Resources);
        }

        let mut ap_host = vec![T::sentinel(); ap_len];
        let mut x_host = vec![T::sentinel(); x_len];
        let mut generator = OperandGenerator::for_params(params);
        generator.fill_hermitian_packed(
            params.uplo,
            params.n,
            &mut ap_host,
            params.off_a,
            &mut x_host,
            &x_pat,
        );

        let ap_initial = ap_host.clone();
        let mut ap_reference = ap_initial.clone();
        self.reference_hpr(params, &x_host, &mut ap_reference);

        let Some(buf_ap) = self.ctx.create_buffer(&ap_initial, MemIntent::ReadWrite) else {
            return self.transfer_skip("AP");
        };
        let Some(buf_x) = self.ctx.create_buffer(&x_host, MemIntent::ReadOnly) else {
            return self.transfer_skip("X");
        };

        if let Err(err) = self.accelerated.hpr(params, &buf_x, &buf_ap, &queues) {
            return CaseOutcome::Failed(err);
        }
        if let Err(err) = self.ctx.sync_all_queues(&queues) {
            return CaseOutcome::Failed(err);
        }
        let mut ap_device = vec![T::sentinel(); ap_len];
        if let Err(err) = self.ctx.read_back(&buf_ap, &mut ap_device) {
            return CaseOutcome::Failed(err);
        }
        drop(buf_ap);
        drop(buf_x);

        let pair = ResultPair {
            reference: ap_reference,
            device: ap_device,
        };
        match pair.verify(&ap_pat) {
            Ok(()) => CaseOutcome::Passed,
            Err(err) => CaseOutcome::Failed(err),
        }
    }

    /// Run one GEMV performance case
    ///
    /// The reference path is timed as a single call; the accelerated
    /// path as a warmed, iterated, averaged loop. Measurement failures
    /// surface as the [`Measurement::Failed`] sentinel and an advisory
    /// verdict, never as a case failure.
    pub fn run_gemv_performance(
        &self,
        params: &TestParams,
        config: TimingConfig,
        reporter: &mut dyn PerformanceReporter,
    ) -> PerformanceReport {
        if let Err(err) = params.validate() {
            return PerformanceReport {
                routine: "gemv".to_string(),
                outcome: CaseOutcome::Failed(err),
                reference: Measurement::Failed,
                accelerated: Measurement::Failed,
                verdict: Verdict::NotMeasured,
            };
        }
        if let Some(reason) = self.preflight(params) {
            return PerformanceReport::skipped("gemv", reason);
        }
        let queues = match self.case_queues(params) {
            Ok(q) => q,
            Err(err) => {
                return PerformanceReport {
                    routine: "gemv".to_string(),
                    outcome: CaseOutcome::Failed(err),
                    reference: Measurement::Failed,
                    accelerated: Measurement::Failed,
                    verdict: Verdict::NotMeasured,
                }
            }
        };

        let x_pat = params.x_pattern();
        let y_pat = params.y_pattern();
        let a_len = params.a_extent();
        let x_len = x_pat.extent();
        let y_len = y_pat.extent();

        let decision = gate::check(
            self.ctx.caps(),
            &[
                AllocationRequest::new("A", a_len * T::size_of()),
                AllocationRequest::new("X", x_len * T::size_of()),
                AllocationRequest::new("Y", y_len * T::size_of()),
            ],
        );
        if let GateDecision::Insufficient { reason } = decision {
            eprintln!(">> RESOURCE CHECK: skip due to insufficient resources: {reason}");
            return PerformanceReport::skipped("gemv", SkipReason::Resources);
        }

        let mut a_host = vec![T::sentinel(); a_len];
        let mut x_host = vec![T::sentinel(); x_len];
        let mut y_host = vec![T::sentinel(); y_len];
        let mut generator = OperandGenerator::for_params(params);
        generator.fill_gemv_operands(params, &mut a_host, &mut x_host, &mut y_host);
        let y_initial = y_host.clone();

        let reference_time = time_single(|| {
            let mut y_reference = y_initial.clone();
            self.reference_gemv(params, &a_host, &x_host, &mut y_reference);
            Ok(())
        });

        let Some(buf_a) = self.ctx.create_buffer(&a_host, MemIntent::ReadOnly) else {
            return PerformanceReport::skipped("gemv", SkipReason::Resources);
        };
        let Some(buf_x) = self.ctx.create_buffer(&x_host, MemIntent::ReadOnly) else {
            return PerformanceReport::skipped("gemv", SkipReason::Resources);
        };
        let Some(buf_y) = self.ctx.create_buffer(&y_initial, MemIntent::ReadWrite) else {
            return PerformanceReport::skipped("gemv", SkipReason::Resources);
        };

        // Restore the accumulator start state outside the timed region
        let accelerated_time = if self.ctx.write_buffer(&buf_y, &y_initial).is_err() {
            Measurement::Failed
        } else {
            time_loop(
                config,
                || self.ctx.sync_all_queues(&queues),
                || self.accelerated.gemv(params, &buf_a, &buf_x, &buf_y, &queues),
            )
        };

        let verdict = reporter.report("gemv", reference_time, accelerated_time);
        PerformanceReport {
            routine: "gemv".to_string(),
            outcome: CaseOutcome::Passed,
            reference: reference_time,
            accelerated: accelerated_time,
            verdict,
        }
    }

    /// Run one HPR performance case
    ///
    /// Mirrors the GEMV performance path; the packed accumulator is
    /// re-uploaded from its snapshot before the timed loop.
    pub fn run_hpr_performance(
        &self,
        params: &TestParams,
        config: TimingConfig,
        reporter: &mut dyn PerformanceReporter,
    ) -> PerformanceReport {
        if params.n == 0 || params.incx == 0 || params.num_queues == 0 {
            return PerformanceReport {
                routine: "hpr".to_string(),
                outcome: CaseOutcome::Failed(VerificarError::InvalidShape {
                    reason: "HPR requires n > 0, nonzero incx and at least one queue".to_string(),
                }),
                reference: Measurement::Failed,
                accelerated: Measurement::Failed,
                verdict: Verdict::NotMeasured,
            };
        }
        if let Some(reason) = self.preflight(params) {
            return PerformanceReport::skipped("hpr", reason);
        }
        let queues = match self.case_queues(params) {
            Ok(q) => q,
            Err(err) => {
                return PerformanceReport {
                    routine: "hpr".to_string(),
                    outcome: CaseOutcome::Failed(err),
                    reference: Measurement::Failed,
                    accelerated: Measurement::Failed,
                    verdict: Verdict::NotMeasured,
                }
            }
        };

        let x_pat = hpr_x_pattern(params);
        let ap_pat = AccessPattern::new(params.off_a, 1, TestParams::packed_len(params.n));
        let ap_len = ap_pat.extent();
        let x_len = x_pat.extent();

        let decision = gate::check(
            self.ctx.caps(),
            &[
                AllocationRequest::new("AP", ap_len * T::size_of()),
                AllocationRequest::new("X", x_len * T::size_of()),
            ],
        );
        if let GateDecision::Insufficient { reason } = decision {
            eprintln!(">> RESOURCE CHECK: skip due to insufficient resources: {reason}");
            return PerformanceReport::skipped("hpr", SkipReason::Resources);
        }

        let mut ap_host = vec![T::sentinel(); ap_len];
        let mut x_host = vec![T::sentinel(); x_len];
        let mut generator = OperandGenerator::for_params(params);
        generator.fill_hermitian_packed(
            params.uplo,
            params.n,
            &mut ap_host,
            params.off_a,
            &mut x_host,
            &x_pat,
        );
        let ap_snapshot = ap_host.clone();

        let reference_time = time_single(|| {
            let mut ap_reference = ap_snapshot.clone();
            self.reference_hpr(params, &x_host, &mut ap_reference);
            Ok(())
        });

        let Some(buf_ap) = self.ctx.create_buffer(&ap_host, MemIntent::ReadWrite) else {
            return PerformanceReport::skipped("hpr", SkipReason::Resources);
        };
        let Some(buf_x) = self.ctx.create_buffer(&x_host, MemIntent::ReadOnly) else {
            return PerformanceReport::skipped("hpr", SkipReason::Resources);
        };

        let accelerated_time = if self.ctx.write_buffer(&buf_ap, &ap_snapshot).is_err() {
            Measurement::Failed
        } else {
            time_loop(
                config,
                || self.ctx.sync_all_queues(&queues),
                || self.accelerated.hpr(params, &buf_x, &buf_ap, &queues),
            )
        };

        let verdict = reporter.report("hpr", reference_time, accelerated_time);
        PerformanceReport {
            routine: "hpr".to_string(),
            outcome: CaseOutcome::Passed,
            reference: reference_time,
            accelerated: accelerated_time,
            verdict,
        }
    }

    fn transfer_skip(&self, operand: &str) -> CaseOutcome {
        eprintln!(">> Failed to create a device buffer for operand {operand}");
        eprintln!(">> Cannot execute the case: data was not transferred to the device");
        eprintln!(">> Test skipped");
        CaseOutcome::Skipped(SkipReason::Resources)
    }
}

/// X access pattern for HPR (logical length is always n)
fn hpr_x_pattern(params: &TestParams) -> AccessPattern {
    AccessPattern::new(params.off_bx, params.incx, params.n)
}
