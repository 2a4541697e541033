//! End-to-end harness scenarios
//!
//! Drives the orchestrator through complete cases against the mock
//! accelerated engine: clean passes, capability and resource skips,
//! injected failures, and the performance path. Tests that inspect
//! context-wide counters run serially.

use serial_test::serial;
use verificar::device::{DeviceCaps, DeviceContext, MemIntent};
use verificar::engine::{
    reorder_to_col_major, AcceleratedEngine, MockAcceleratedEngine, NaiveReference,
    ReferenceEngine,
};
use verificar::generate::OperandGenerator;
use verificar::orchestrator::{CaseOutcome, Orchestrator, SkipReason};
use verificar::params::{CoverageLevel, Order, TestParams, Transpose, Uplo};
use verificar::timing::{Measurement, SpeedupReporter, TimingConfig, Verdict};
use verificar::{Element, Scalar, VerificarError};

fn default_context() -> DeviceContext {
    DeviceContext::new(DeviceCaps::default())
}

// ============================================================================
// CORRECTNESS SCENARIOS
// ============================================================================

#[test]
fn gemv_row_major_integer_operands_bit_exact() {
    // Integer-representable operands make the reference and the device
    // path bit-exact; any deviation at all would fail the comparator.
    let ctx = default_context();
    let reference = NaiveReference::new();
    let engine = MockAcceleratedEngine::new();
    let orchestrator = Orchestrator::<f32>::new(&ctx, &reference, &engine);

    let mut params = TestParams::gemv(Order::RowMajor, 4, 3, 42);
    params.integer_values = true;
    assert_eq!(orchestrator.run_gemv_correctness(&params), CaseOutcome::Passed);
    assert_eq!(engine.call_count(), 1);
}

#[test]
fn gemv_integer_operands_match_reference_bit_for_bit() {
    // Same operands through both engines, compared by bit pattern over
    // the Y positions rather than through the tolerance comparator.
    let ctx = default_context();
    let mut params = TestParams::gemv(Order::RowMajor, 4, 3, 42);
    params.integer_values = true;

    let x_pat = params.x_pattern();
    let y_pat = params.y_pattern();
    let mut a = vec![<f32 as Element>::sentinel(); params.a_extent()];
    let mut x = vec![<f32 as Element>::sentinel(); x_pat.extent()];
    let mut y = vec![<f32 as Element>::sentinel(); y_pat.extent()];
    let mut generator = OperandGenerator::for_params(&params);
    generator.fill_gemv_operands(&params, &mut a, &mut x, &mut y);

    // Reference path: column-major engine over a reordered copy.
    let mut y_reference = y.clone();
    let col_a = reorder_to_col_major(&a, params.m, params.n, params.lda, params.off_a);
    NaiveReference::new().gemv(
        Transpose::No,
        params.m,
        params.n,
        1.0f32,
        &col_a,
        0,
        params.m,
        &x,
        &x_pat,
        0.0f32,
        &mut y_reference,
        &y_pat,
    );

    // Device path: mock engine over the original row-major storage.
    let buf_a = ctx.create_buffer(&a, MemIntent::ReadOnly).unwrap();
    let buf_x = ctx.create_buffer(&x, MemIntent::ReadOnly).unwrap();
    let buf_y = ctx.create_buffer(&y, MemIntent::ReadWrite).unwrap();
    let engine = MockAcceleratedEngine::new();
    AcceleratedEngine::<f32>::gemv(&engine, &params, &buf_a, &buf_x, &buf_y, &ctx.queues())
        .unwrap();
    let mut y_device = vec![<f32 as Element>::sentinel(); y_pat.extent()];
    ctx.read_back(&buf_y, &mut y_device).unwrap();

    for idx in y_pat.positions() {
        assert_eq!(
            y_reference[idx].to_bits(),
            y_device[idx].to_bits(),
            "index {idx}: reference {} vs device {}",
            y_reference[idx],
            y_device[idx]
        );
    }
}

#[test]
fn gemv_all_transpose_modes_pass() {
    let ctx = default_context();
    let reference = NaiveReference::new();
    let engine = MockAcceleratedEngine::new();

    for order in [Order::ColMajor, Order::RowMajor] {
        for trans in [Transpose::No, Transpose::Trans, Transpose::ConjTrans] {
            let orchestrator = Orchestrator::<f64>::new(&ctx, &reference, &engine);
            let mut params = TestParams::gemv(order, 7, 5, 3);
            params.trans_a = trans;
            assert_eq!(
                orchestrator.run_gemv_correctness(&params),
                CaseOutcome::Passed,
                "order {order:?}, trans {trans:?}"
            );
        }
    }
}

#[test]
fn gemv_strided_vectors_leave_gaps_poisoned() {
    // X and Y live in larger allocations with strided patterns; the
    // comparator verifies every gap still holds its sentinel after the
    // device run, so a pass proves nothing outside the pattern moved.
    let ctx = default_context();
    let reference = NaiveReference::new();
    let engine = MockAcceleratedEngine::new();
    let orchestrator = Orchestrator::<f32>::new(&ctx, &reference, &engine);

    let mut params = TestParams::gemv(Order::ColMajor, 5, 4, 11);
    params.off_bx = 1;
    params.incx = 2;
    params.off_cy = 2;
    params.incy = 3;
    assert_eq!(orchestrator.run_gemv_correctness(&params), CaseOutcome::Passed);
}

#[test]
fn gemv_negative_increments_traverse_same_positions() {
    let ctx = default_context();
    let reference = NaiveReference::new();
    let engine = MockAcceleratedEngine::new();
    let orchestrator = Orchestrator::<f64>::new(&ctx, &reference, &engine);

    let mut params = TestParams::gemv(Order::ColMajor, 4, 4, 9);
    params.incx = -2;
    params.incy = -1;
    assert_eq!(orchestrator.run_gemv_correctness(&params), CaseOutcome::Passed);
}

#[test]
fn gemv_offset_matrix_with_padded_lda() {
    let ctx = default_context();
    let reference = NaiveReference::new();
    let engine = MockAcceleratedEngine::new();
    let orchestrator = Orchestrator::<f32>::new(&ctx, &reference, &engine);

    let mut params = TestParams::gemv(Order::ColMajor, 4, 3, 17);
    params.off_a = 5;
    params.lda = 6; // two padding rows per column stay poisoned
    assert_eq!(orchestrator.run_gemv_correctness(&params), CaseOutcome::Passed);
}

#[test]
fn gemv_unused_beta_gives_beta_independent_result() {
    // With use_beta = false the accumulator starts zeroed; the declared
    // beta value must not matter at all.
    let ctx = default_context();
    let reference = NaiveReference::new();
    let engine = MockAcceleratedEngine::new();

    for beta in [Scalar::ZERO, Scalar::new(123.0, -4.0)] {
        let orchestrator = Orchestrator::<f64>::new(&ctx, &reference, &engine);
        let mut params = TestParams::gemv(Order::ColMajor, 6, 6, 21);
        params.use_beta = false;
        params.beta = beta;
        assert_eq!(orchestrator.run_gemv_correctness(&params), CaseOutcome::Passed);
    }
}

#[test]
fn hpr_complex_round_trip_both_triangles() {
    use num_complex::Complex64;
    let ctx = default_context();
    let reference = NaiveReference::new();
    let engine = MockAcceleratedEngine::new();

    for uplo in [Uplo::Upper, Uplo::Lower] {
        for order in [Order::ColMajor, Order::RowMajor] {
            let orchestrator = Orchestrator::<Complex64>::new(&ctx, &reference, &engine);
            let mut params = TestParams::hpr(uplo, 8, 29);
            params.order = order;
            params.alpha = Scalar::real(2.5);
            assert_eq!(
                orchestrator.run_hpr_correctness(&params),
                CaseOutcome::Passed,
                "uplo {uplo:?}, order {order:?}"
            );
        }
    }
}

#[test]
fn invalid_shape_fails_without_touching_the_device() {
    let ctx = default_context();
    let reference = NaiveReference::new();
    let engine = MockAcceleratedEngine::new();
    let orchestrator = Orchestrator::<f32>::new(&ctx, &reference, &engine);

    let mut params = TestParams::gemv(Order::ColMajor, 4, 4, 0);
    params.lda = 2; // below the column-major minimum of m
    let outcome = orchestrator.run_gemv_correctness(&params);
    assert!(matches!(
        outcome,
        CaseOutcome::Failed(VerificarError::InvalidShape { .. })
    ));
    assert_eq!(engine.call_count(), 0);
    assert_eq!(ctx.live_allocations(), 0);
}

// ============================================================================
// SKIP SCENARIOS
// ============================================================================

#[test]
fn f64_case_on_single_precision_device_is_skipped() {
    let caps = DeviceCaps {
        supports_f64: false,
        ..DeviceCaps::default()
    };
    let ctx = DeviceContext::new(caps);
    let reference = NaiveReference::new();
    let engine = MockAcceleratedEngine::new();
    let orchestrator = Orchestrator::<f64>::new(&ctx, &reference, &engine);

    let params = TestParams::gemv(Order::ColMajor, 8, 8, 0);
    assert_eq!(
        orchestrator.run_gemv_correctness(&params),
        CaseOutcome::Skipped(SkipReason::UnsupportedCapability)
    );
    assert_eq!(engine.call_count(), 0);
}

#[test]
fn oversized_case_is_gated_before_any_allocation() {
    let caps = DeviceCaps {
        max_alloc_bytes: 1024,
        total_mem_bytes: 4096,
        ..DeviceCaps::default()
    };
    let ctx = DeviceContext::new(caps);
    let reference = NaiveReference::new();
    let engine = MockAcceleratedEngine::new();
    let orchestrator = Orchestrator::<f32>::new(&ctx, &reference, &engine);

    let params = TestParams::gemv(Order::ColMajor, 64, 64, 0);
    assert_eq!(
        orchestrator.run_gemv_correctness(&params),
        CaseOutcome::Skipped(SkipReason::Resources)
    );
    assert_eq!(engine.call_count(), 0);
    assert_eq!(ctx.live_allocations(), 0);
    assert_eq!(ctx.allocated_bytes(), 0);
}

#[test]
#[serial]
fn late_allocation_failure_is_a_skip_with_full_release() {
    // The gate passes but the platform refuses the second buffer; the
    // first buffer must be released and the outcome is a skip.
    let ctx = default_context();
    ctx.fail_allocations_after(1);
    let reference = NaiveReference::new();
    let engine = MockAcceleratedEngine::new();
    let orchestrator = Orchestrator::<f32>::new(&ctx, &reference, &engine);

    let params = TestParams::gemv(Order::ColMajor, 8, 8, 0);
    assert_eq!(
        orchestrator.run_gemv_correctness(&params),
        CaseOutcome::Skipped(SkipReason::Resources)
    );
    assert_eq!(ctx.live_allocations(), 0);
    assert_eq!(engine.call_count(), 0);
}

#[test]
fn reduced_coverage_skips_redundant_combination() {
    let ctx = default_context();
    let reference = NaiveReference::new();
    let engine = MockAcceleratedEngine::new();
    let orchestrator = Orchestrator::<f32>::new(&ctx, &reference, &engine);

    let mut params = TestParams::gemv(Order::ColMajor, 8, 8, 0);
    params.coverage = CoverageLevel::Reduced;
    params.off_a = 4;
    params.incy = 2;
    assert_eq!(
        orchestrator.run_gemv_correctness(&params),
        CaseOutcome::Skipped(SkipReason::Coverage)
    );

    // The same combination runs under full coverage.
    params.coverage = CoverageLevel::Full;
    assert_eq!(orchestrator.run_gemv_correctness(&params), CaseOutcome::Passed);
}

// ============================================================================
// FAILURE SCENARIOS
// ============================================================================

#[test]
#[serial]
fn engine_invocation_failure_releases_every_buffer() {
    let ctx = default_context();
    let reference = NaiveReference::new();
    let engine = MockAcceleratedEngine::new().with_invoke_failure();
    let orchestrator = Orchestrator::<f32>::new(&ctx, &reference, &engine);

    let params = TestParams::gemv(Order::ColMajor, 8, 8, 0);
    let outcome = orchestrator.run_gemv_correctness(&params);
    assert!(matches!(
        outcome,
        CaseOutcome::Failed(VerificarError::GpuError { .. })
    ));
    assert_eq!(ctx.live_allocations(), 0);
    assert_eq!(ctx.allocated_bytes(), 0);
}

#[test]
#[serial]
fn queue_sync_failure_is_a_hard_failure() {
    let ctx = default_context();
    ctx.inject_sync_failure();
    let reference = NaiveReference::new();
    let engine = MockAcceleratedEngine::new();
    let orchestrator = Orchestrator::<f64>::new(&ctx, &reference, &engine);

    let params = TestParams::gemv(Order::ColMajor, 4, 4, 0);
    let outcome = orchestrator.run_gemv_correctness(&params);
    match outcome {
        CaseOutcome::Failed(VerificarError::GpuError { reason }) => {
            assert!(reason.contains("sync_all_queues"));
        }
        other => panic!("expected sync failure, got {other:?}"),
    }
    assert_eq!(ctx.live_allocations(), 0);
}

#[test]
fn out_of_pattern_write_is_attributed_to_its_index() {
    // The engine scribbles on a strided gap of the output allocation;
    // the sentinel check names the exact clobbered index.
    let ctx = default_context();
    let reference = NaiveReference::new();
    let engine = MockAcceleratedEngine::new().with_clobber_at(3);
    let orchestrator = Orchestrator::<f32>::new(&ctx, &reference, &engine);

    let mut params = TestParams::gemv(Order::ColMajor, 3, 3, 5);
    params.incy = 2; // Y pattern reaches 0, 2, 4; index 3 is a gap
    let outcome = orchestrator.run_gemv_correctness(&params);
    assert!(matches!(
        outcome,
        CaseOutcome::Failed(VerificarError::SentinelClobbered { index: 3, .. })
    ));
}

#[test]
fn one_failing_case_does_not_poison_siblings() {
    let ctx = default_context();
    let reference = NaiveReference::new();
    let bad = MockAcceleratedEngine::new().with_invoke_failure();
    let good = MockAcceleratedEngine::new();

    let params = TestParams::gemv(Order::ColMajor, 4, 4, 1);
    let failing = Orchestrator::<f32>::new(&ctx, &reference, &bad);
    assert!(failing.run_gemv_correctness(&params).is_failed());

    let passing = Orchestrator::<f32>::new(&ctx, &reference, &good);
    assert_eq!(passing.run_gemv_correctness(&params), CaseOutcome::Passed);
}

// ============================================================================
// PERFORMANCE SCENARIOS
// ============================================================================

#[test]
fn gemv_performance_measures_both_paths() {
    let ctx = default_context();
    let reference = NaiveReference::new();
    let engine = MockAcceleratedEngine::new();
    let orchestrator = Orchestrator::<f32>::new(&ctx, &reference, &engine);
    let mut reporter = SpeedupReporter::new(1000.0);

    let params = TestParams::gemv(Order::ColMajor, 32, 32, 7);
    let config = TimingConfig::default();
    let report = orchestrator.run_gemv_performance(&params, config, &mut reporter);

    assert_eq!(report.outcome, CaseOutcome::Passed);
    assert!(report.reference.is_valid());
    assert!(report.accelerated.is_valid());
    // Every invocation happens inside the timed loop
    assert_eq!(engine.call_count(), config.iterations as usize);
    assert_eq!(reporter.verdicts().len(), 1);
    assert_eq!(ctx.live_allocations(), 0);
}

#[test]
fn hpr_performance_reuses_the_snapshot_accumulator() {
    use num_complex::Complex32;
    let ctx = default_context();
    let reference = NaiveReference::new();
    let engine = MockAcceleratedEngine::new();
    let orchestrator = Orchestrator::<Complex32>::new(&ctx, &reference, &engine);
    let mut reporter = SpeedupReporter::new(1000.0);

    let params = TestParams::hpr(Uplo::Lower, 16, 3);
    let report =
        orchestrator.run_hpr_performance(&params, TimingConfig { iterations: 5 }, &mut reporter);
    assert_eq!(report.outcome, CaseOutcome::Passed);
    assert!(report.accelerated.is_valid());
    assert_eq!(ctx.live_allocations(), 0);
}

#[test]
#[serial]
fn failing_engine_in_performance_mode_is_advisory_not_fatal() {
    let ctx = default_context();
    let reference = NaiveReference::new();
    let engine = MockAcceleratedEngine::new().with_invoke_failure();
    let orchestrator = Orchestrator::<f32>::new(&ctx, &reference, &engine);
    let mut reporter = SpeedupReporter::default();

    let params = TestParams::gemv(Order::ColMajor, 8, 8, 0);
    let report =
        orchestrator.run_gemv_performance(&params, TimingConfig::default(), &mut reporter);
    assert_eq!(report.outcome, CaseOutcome::Passed);
    assert_eq!(report.accelerated, Measurement::Failed);
    assert_eq!(report.verdict, Verdict::NotMeasured);
    assert_eq!(ctx.live_allocations(), 0);
}

#[test]
fn oversized_performance_case_is_skipped() {
    let caps = DeviceCaps {
        max_alloc_bytes: 256,
        total_mem_bytes: 512,
        ..DeviceCaps::default()
    };
    let ctx = DeviceContext::new(caps);
    let reference = NaiveReference::new();
    let engine = MockAcceleratedEngine::new();
    let orchestrator = Orchestrator::<f64>::new(&ctx, &reference, &engine);
    let mut reporter = SpeedupReporter::default();

    let params = TestParams::gemv(Order::ColMajor, 100, 100, 0);
    let report =
        orchestrator.run_gemv_performance(&params, TimingConfig::default(), &mut reporter);
    assert_eq!(report.outcome, CaseOutcome::Skipped(SkipReason::Resources));
    assert_eq!(report.verdict, Verdict::NotMeasured);
    assert_eq!(engine.call_count(), 0);
}
