//! Operand generation: sentinel poisoning and seeded random fills
//!
//! Every host buffer starts fully poisoned with the type's sentinel
//! (a NaN-class value). The random generator then overwrites exactly
//! the positions the routine under test is defined to touch, so any
//! out-of-pattern read or write by the accelerated engine is caught
//! later by the sentinel check.
//!
//! Determinism: the generator is seeded with `StdRng::seed_from_u64`,
//! so identical seed and parameters produce byte-identical buffers.

use crate::element::Element;
use crate::params::{AccessPattern, Order, TestParams, Uplo};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::ops::Range;

/// Overwrite every position of `buf` with the sentinel
pub fn poison_all<T: Element>(buf: &mut [T]) {
    for slot in buf.iter_mut() {
        *slot = T::sentinel();
    }
}

/// Poison every position of `buf` the pattern does not reach
///
/// Used when a strided vector lives inside a larger allocation: the
/// gaps between strided slots and the tail beyond the last logical
/// element must never be touched by the routine.
pub fn poison_outside_pattern<T: Element>(buf: &mut [T], pattern: &AccessPattern) {
    for (idx, slot) in buf.iter_mut().enumerate() {
        if !pattern.contains(idx) {
            *slot = T::sentinel();
        }
    }
}

/// Poison only the positions inside `range`, leaving the rest alone
pub fn poison_range<T: Element>(buf: &mut [T], range: Range<usize>) {
    for slot in &mut buf[range] {
        *slot = T::sentinel();
    }
}

/// Seeded random operand generator
///
/// One instance per test case; the seed comes from
/// [`TestParams::seed`].
#[derive(Debug)]
pub struct OperandGenerator {
    rng: StdRng,
    integer_values: bool,
}

impl OperandGenerator {
    /// Create a generator for one test case
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            integer_values: false,
        }
    }

    /// Create a generator from case parameters, honoring the
    /// integer-representable value mode
    #[must_use]
    pub fn for_params(params: &TestParams) -> Self {
        Self {
            rng: StdRng::seed_from_u64(params.seed),
            integer_values: params.integer_values,
        }
    }

    fn draw<T: Element>(&mut self) -> T {
        if self.integer_values {
            T::random_integer(&mut self.rng)
        } else {
            T::random(&mut self.rng)
        }
    }

    /// Fill the logical `rows x cols` region of a dense matrix,
    /// leaving leading-dimension padding poisoned
    pub fn fill_matrix<T: Element>(
        &mut self,
        buf: &mut [T],
        rows: usize,
        cols: usize,
        ld: usize,
        order: Order,
        offset: usize,
    ) {
        match order {
            Order::ColMajor => {
                for j in 0..cols {
                    for i in 0..rows {
                        buf[offset + j * ld + i] = self.draw();
                    }
                }
            }
            Order::RowMajor => {
                for i in 0..rows {
                    for j in 0..cols {
                        buf[offset + i * ld + j] = self.draw();
                    }
                }
            }
        }
    }

    /// Fill exactly the pattern positions of a strided vector
    pub fn fill_strided<T: Element>(&mut self, buf: &mut [T], pattern: &AccessPattern) {
        for idx in pattern.positions() {
            buf[idx] = self.draw();
        }
    }

    /// Write zeros at the pattern positions (beta-independent start
    /// state when the beta multiplier is unused)
    pub fn zero_strided<T: Element>(buf: &mut [T], pattern: &AccessPattern) {
        for idx in pattern.positions() {
            buf[idx] = T::zero();
        }
    }

    /// Fill all three GEMV operands for one case
    ///
    /// `a` holds the matrix, `bx` the allocation embedding X, `cy` the
    /// allocation embedding Y. All buffers must already be poisoned;
    /// only the logical regions are overwritten. When beta is unused
    /// the Y start state is zeroed instead of randomized, so the
    /// result never depends on a multiplier the case declared unused.
    pub fn fill_gemv_operands<T: Element>(
        &mut self,
        params: &TestParams,
        a: &mut [T],
        bx: &mut [T],
        cy: &mut [T],
    ) {
        self.fill_matrix(a, params.m, params.n, params.lda, params.order, params.off_a);
        self.fill_strided(bx, &params.x_pattern());
        if params.use_beta {
            self.fill_strided(cy, &params.y_pattern());
        } else {
            Self::zero_strided(cy, &params.y_pattern());
        }
    }

    /// Fill a packed Hermitian matrix and its companion vector
    ///
    /// Packed storage holds one triangle, so conjugate symmetry is
    /// implicit; the generator's obligation is a real diagonal.
    pub fn fill_hermitian_packed<T: Element>(
        &mut self,
        uplo: Uplo,
        n: usize,
        ap: &mut [T],
        off_ap: usize,
        x: &mut [T],
        x_pattern: &AccessPattern,
    ) {
        for j in 0..n {
            let (col_range, diag_in_col) = match uplo {
                // Column j stores rows 0..=j; diagonal is last.
                Uplo::Upper => (j + 1, j),
                // Column j stores rows j..n; diagonal is first.
                Uplo::Lower => (n - j, 0),
            };
            let col_start = match uplo {
                Uplo::Upper => j * (j + 1) / 2,
                Uplo::Lower => j * (2 * n - j + 1) / 2,
            };
            for r in 0..col_range {
                let value: T = self.draw();
                let value = if r == diag_in_col {
                    value.forced_real()
                } else {
                    value
                };
                ap[off_ap + col_start + r] = value;
            }
        }
        self.fill_strided(x, x_pattern);
    }
}

/// Flat index of packed element (i, j) of the stored triangle
///
/// Column-major packed layout; callers must pass (i, j) inside the
/// stored triangle (`i <= j` for upper, `i >= j` for lower).
#[must_use]
pub fn packed_index(uplo: Uplo, n: usize, i: usize, j: usize) -> usize {
    match uplo {
        Uplo::Upper => j * (j + 1) / 2 + i,
        Uplo::Lower => j * (2 * n - j + 1) / 2 + (i - j),
    }
}
