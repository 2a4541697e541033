//! Engine traits and test doubles
//!
//! The harness never computes BLAS mathematics itself; it drives two
//! collaborators over the same operands. [`ReferenceEngine`] is the
//! trusted single-threaded oracle on host slices. [`AcceleratedEngine`]
//! is the device-side implementation under test, invoked with device
//! handles and queue ids. The reference backend is selected at
//! configuration time through the trait, so the orchestrator never
//! cares which implementation is linked.
//!
//! [`MockAcceleratedEngine`] plays the accelerated role in this
//! crate's own tests: it delegates the math to a [`NaiveReference`]
//! and offers failure and out-of-pattern clobber injection, the same
//! role `MockExecutor` plays for GPU host code elsewhere.

use crate::device::{DeviceBuffer, QueueId};
use crate::element::Element;
use crate::error::{Result, VerificarError};
use crate::generate::packed_index;
use crate::params::{AccessPattern, TestParams, Transpose, Uplo};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Trusted host-side oracle computing the same operation as the
/// accelerated engine, column-major only
pub trait ReferenceEngine<T: Element>: Send + Sync {
    /// General matrix-vector multiply: `y := alpha * op(A) * x + beta * y`
    #[allow(clippy::too_many_arguments)]
    fn gemv(
        &self,
        trans: Transpose,
        m: usize,
        n: usize,
        alpha: T,
        a: &[T],
        off_a: usize,
        lda: usize,
        x: &[T],
        x_pat: &AccessPattern,
        beta: T,
        y: &mut [T],
        y_pat: &AccessPattern,
    );

    /// Hermitian packed rank-1 update: `A := alpha * x * conj(x)^T + A`
    ///
    /// `alpha` is real by definition of the operation.
    #[allow(clippy::too_many_arguments)]
    fn hpr(
        &self,
        uplo: Uplo,
        n: usize,
        alpha: f64,
        x: &[T],
        x_pat: &AccessPattern,
        ap: &mut [T],
        off_ap: usize,
    );
}

/// Straightforward loop-nest reference implementation
///
/// Slow on purpose; correctness is its only job.
#[derive(Debug, Default, Clone, Copy)]
pub struct NaiveReference;

impl NaiveReference {
    /// Create the reference engine
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl<T: Element> ReferenceEngine<T> for NaiveReference {
    fn gemv(
        &self,
        trans: Transpose,
        m: usize,
        n: usize,
        alpha: T,
        a: &[T],
        off_a: usize,
        lda: usize,
        x: &[T],
        x_pat: &AccessPattern,
        beta: T,
        y: &mut [T],
        y_pat: &AccessPattern,
    ) {
        let x_len = match trans {
            Transpose::No => n,
            Transpose::Trans | Transpose::ConjTrans => m,
        };
        debug_assert_eq!(x_pat.len, x_len);
        let xs: Vec<T> = x_pat.positions().map(|p| x[p]).collect();

        for (iy, pos) in y_pat.positions().enumerate() {
            let mut acc = T::zero();
            for (jx, &xv) in xs.iter().enumerate() {
                let aij = match trans {
                    Transpose::No => a[off_a + jx * lda + iy],
                    Transpose::Trans => a[off_a + iy * lda + jx],
                    Transpose::ConjTrans => a[off_a + iy * lda + jx].conj(),
                };
                acc = acc + aij * xv;
            }
            y[pos] = alpha * acc + beta * y[pos];
        }
    }

    fn hpr(
        &self,
        uplo: Uplo,
        n: usize,
        alpha: f64,
        x: &[T],
        x_pat: &AccessPattern,
        ap: &mut [T],
        off_ap: usize,
    ) {
        let xs: Vec<T> = x_pat.positions().map(|p| x[p]).collect();
        debug_assert_eq!(xs.len(), n);
        let alpha_t = T::from_real(alpha);

        for j in 0..n {
            let (lo, hi) = match uplo {
                Uplo::Upper => (0, j + 1),
                Uplo::Lower => (j, n),
            };
            for i in lo..hi {
                let idx = off_ap + packed_index(uplo, n, i, j);
                let update = alpha_t * xs[i] * xs[j].conj();
                let next = ap[idx] + update;
                // Hermitian diagonal stays real
                ap[idx] = if i == j { next.forced_real() } else { next };
            }
        }
    }
}

/// Reorder a stored row-major matrix into a tight column-major copy
///
/// The reference engine is column-major only, mirroring the library it
/// stands in for; row-major cases are reordered before the reference
/// call. The accelerated engine never sees the reordered copy.
#[must_use]
pub fn reorder_to_col_major<T: Element>(
    a: &[T],
    m: usize,
    n: usize,
    lda: usize,
    off_a: usize,
) -> Vec<T> {
    let mut out = vec![T::zero(); m * n];
    for i in 0..m {
        for j in 0..n {
            out[j * m + i] = a[off_a + i * lda + j];
        }
    }
    out
}

/// Device-side implementation under test
///
/// Invocations take device handles, the parameter record and the queue
/// set, and return a status; completion is observed only through the
/// context's wait-for-all-queues call.
pub trait AcceleratedEngine<T: Element>: Send + Sync {
    /// Engine name for failure messages
    fn name(&self) -> &str;

    /// Enqueue GEMV on the given queues
    ///
    /// # Errors
    ///
    /// Returns [`VerificarError::GpuError`] when the engine reports a
    /// non-success status.
    fn gemv(
        &self,
        params: &TestParams,
        a: &DeviceBuffer<T>,
        x: &DeviceBuffer<T>,
        y: &DeviceBuffer<T>,
        queues: &[QueueId],
    ) -> Result<()>;

    /// Enqueue HPR on the given queues
    ///
    /// # Errors
    ///
    /// Returns [`VerificarError::GpuError`] when the engine reports a
    /// non-success status.
    fn hpr(
        &self,
        params: &TestParams,
        x: &DeviceBuffer<T>,
        ap: &DeviceBuffer<T>,
        queues: &[QueueId],
    ) -> Result<()>;
}

/// Mock accelerated engine backed by the naive reference
///
/// Computes correct results by default so the harness plumbing can be
/// exercised end to end without hardware. Injection knobs turn it into
/// a misbehaving engine for negative tests.
#[derive(Debug, Default)]
pub struct MockAcceleratedEngine {
    fail_invoke: bool,
    clobber_index: Option<usize>,
    calls: AtomicUsize,
}

impl MockAcceleratedEngine {
    /// Create a well-behaved mock engine
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every invocation report a non-success status
    #[must_use]
    pub fn with_invoke_failure(mut self) -> Self {
        self.fail_invoke = true;
        self
    }

    /// Make the engine write a stray value at the given flat index of
    /// its output buffer, simulating an out-of-bounds access
    #[must_use]
    pub fn with_clobber_at(mut self, index: usize) -> Self {
        self.clobber_index = Some(index);
        self
    }

    /// Number of invocations so far
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn check_invoke(&self, call: &str) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_invoke {
            return Err(VerificarError::GpuError {
                reason: format!("{call} invocation returned failure status"),
            });
        }
        Ok(())
    }

    fn apply_clobber<T: Element>(&self, out: &mut [T]) {
        if let Some(idx) = self.clobber_index {
            if idx < out.len() {
                out[idx] = T::from_real(0.5);
            }
        }
    }
}

impl<T: Element> AcceleratedEngine<T> for MockAcceleratedEngine {
    fn name(&self) -> &str {
        "MockAcceleratedEngine"
    }

    fn gemv(
        &self,
        params: &TestParams,
        a: &DeviceBuffer<T>,
        x: &DeviceBuffer<T>,
        y: &DeviceBuffer<T>,
        queues: &[QueueId],
    ) -> Result<()> {
        self.check_invoke("gemv")?;
        debug_assert!(!queues.is_empty());

        let a_data = a.lock();
        let x_data = x.lock();
        let mut y_data = y.lock();
        let alpha = T::from_scalar(params.effective_alpha());
        let beta = T::from_scalar(params.effective_beta());
        let reference = NaiveReference::new();

        match params.order {
            crate::params::Order::ColMajor => {
                reference.gemv(
                    params.trans_a,
                    params.m,
                    params.n,
                    alpha,
                    &a_data,
                    params.off_a,
                    params.lda,
                    &x_data,
                    &params.x_pattern(),
                    beta,
                    &mut y_data,
                    &params.y_pattern(),
                );
            }
            crate::params::Order::RowMajor => {
                let col_a =
                    reorder_to_col_major(&a_data, params.m, params.n, params.lda, params.off_a);
                reference.gemv(
                    params.trans_a,
                    params.m,
                    params.n,
                    alpha,
                    &col_a,
                    0,
                    params.m,
                    &x_data,
                    &params.x_pattern(),
                    beta,
                    &mut y_data,
                    &params.y_pattern(),
                );
            }
        }

        self.apply_clobber(&mut y_data);
        Ok(())
    }

    fn hpr(
        &self,
        params: &TestParams,
        x: &DeviceBuffer<T>,
        ap: &DeviceBuffer<T>,
        queues: &[QueueId],
    ) -> Result<()> {
        self.check_invoke("hpr")?;
        debug_assert!(!queues.is_empty());

        let x_data = x.lock();
        let mut ap_data = ap.lock();
        let reference = NaiveReference::new();

        match params.order {
            crate::params::Order::ColMajor => {
                reference.hpr(
                    params.uplo,
                    params.n,
                    params.alpha.re,
                    &x_data,
                    &params.x_pattern(),
                    &mut ap_data,
                    params.off_a,
                );
            }
            crate::params::Order::RowMajor => {
                // Row-major packed storage is the column-major storage of
                // the conjugated matrix with the opposite triangle.
                let flipped = match params.uplo {
                    Uplo::Upper => Uplo::Lower,
                    Uplo::Lower => Uplo::Upper,
                };
                let conj_x: Vec<T> = x_data.iter().map(|v| v.conj()).collect();
                reference.hpr(
                    flipped,
                    params.n,
                    params.alpha.re,
                    &conj_x,
                    &params.x_pattern(),
                    &mut ap_data,
                    params.off_a,
                );
            }
        }

        self.apply_clobber(&mut ap_data);
        Ok(())
    }
}
