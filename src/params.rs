//! Test case parameter records and access patterns
//!
//! [`TestParams`] is the single record describing one test case. It is
//! supplied by an external parameter source (suite driver, JSON file);
//! this crate only consumes it.

use crate::element::Scalar;
use crate::error::{Result, VerificarError};
use serde::{Deserialize, Serialize};

/// Storage layout of dense matrices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Order {
    /// Rows are contiguous
    RowMajor,
    /// Columns are contiguous
    ColMajor,
}

/// Transpose / conjugate flag for one matrix operand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transpose {
    /// Operate on the matrix as stored
    No,
    /// Operate on the transpose
    Trans,
    /// Operate on the conjugate transpose
    ConjTrans,
}

/// Which triangle a packed matrix stores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Uplo {
    /// Upper triangle stored
    Upper,
    /// Lower triangle stored
    Lower,
}

/// Test depth for the coverage skip decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoverageLevel {
    /// Run every parameter combination
    Full,
    /// Skip combinations that add little coverage (non-trivial offset
    /// plus non-unit stride on the same case)
    Reduced,
}

/// Strided access pattern of a vector embedded in a larger buffer
///
/// Logical position `i` lives at flat index `offset + i * inc.abs()`.
/// BLAS negative increments traverse the same index set in reverse, so
/// the pattern is defined over the magnitude of the increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessPattern {
    /// First flat index of the pattern
    pub offset: usize,
    /// Element increment (nonzero; sign ignored for position math)
    pub inc: isize,
    /// Number of logical positions
    pub len: usize,
}

impl AccessPattern {
    /// Create a pattern; `inc` must be nonzero
    #[must_use]
    pub fn new(offset: usize, inc: isize, len: usize) -> Self {
        debug_assert!(inc != 0, "increment must be nonzero");
        Self { offset, inc, len }
    }

    /// Contiguous pattern starting at zero
    #[must_use]
    pub fn dense(len: usize) -> Self {
        Self {
            offset: 0,
            inc: 1,
            len,
        }
    }

    /// Stride magnitude
    #[must_use]
    pub fn stride(&self) -> usize {
        self.inc.unsigned_abs()
    }

    /// Iterator over the flat indices the pattern reaches
    pub fn positions(&self) -> impl Iterator<Item = usize> + '_ {
        let stride = self.stride();
        (0..self.len).map(move |i| self.offset + i * stride)
    }

    /// Whether the pattern reaches `index`
    #[must_use]
    pub fn contains(&self, index: usize) -> bool {
        if index < self.offset {
            return false;
        }
        let rel = index - self.offset;
        rel % self.stride() == 0 && rel / self.stride() < self.len
    }

    /// One past the last reachable flat index (0 for empty patterns)
    #[must_use]
    pub fn extent(&self) -> usize {
        if self.len == 0 {
            0
        } else {
            self.offset + (self.len - 1) * self.stride() + 1
        }
    }
}

/// Parameters describing one test case
///
/// Mirrors the knobs a BLAS level-2 routine exposes: logical
/// dimensions, layout, transpose flags, leading dimensions, offsets,
/// vector increments, scalar multipliers, seed and queue count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestParams {
    /// Logical row count
    pub m: usize,
    /// Logical column count
    pub n: usize,
    /// Inner dimension (level-3 routines; unused by GEMV/HPR)
    pub k: usize,
    /// Matrix storage layout
    pub order: Order,
    /// Transpose flag for operand A
    pub trans_a: Transpose,
    /// Transpose flag for operand B
    pub trans_b: Transpose,
    /// Stored triangle for packed routines
    pub uplo: Uplo,
    /// Leading dimension of A
    pub lda: usize,
    /// Leading dimension of B
    pub ldb: usize,
    /// Leading dimension of C
    pub ldc: usize,
    /// Element offset of A inside its allocation
    pub off_a: usize,
    /// Element offset of the X vector inside its allocation
    pub off_bx: usize,
    /// Element offset of the Y vector inside its allocation
    pub off_cy: usize,
    /// Increment of X (nonzero, may be negative)
    pub incx: isize,
    /// Increment of Y (nonzero, may be negative)
    pub incy: isize,
    /// Alpha multiplier
    pub alpha: Scalar,
    /// Beta multiplier
    pub beta: Scalar,
    /// Whether alpha participates (false treats it as 1)
    pub use_alpha: bool,
    /// Whether beta participates (false treats it as 0)
    pub use_beta: bool,
    /// Seed for deterministic operand generation
    pub seed: u64,
    /// Number of device command queues to drive
    pub num_queues: usize,
    /// Coverage depth for the redundancy skip
    pub coverage: CoverageLevel,
    /// Whether operands are drawn from integer-representable values
    pub integer_values: bool,
}

impl Default for TestParams {
    fn default() -> Self {
        Self {
            m: 0,
            n: 0,
            k: 0,
            order: Order::ColMajor,
            trans_a: Transpose::No,
            trans_b: Transpose::No,
            uplo: Uplo::Upper,
            lda: 0,
            ldb: 0,
            ldc: 0,
            off_a: 0,
            off_bx: 0,
            off_cy: 0,
            incx: 1,
            incy: 1,
            alpha: Scalar::ONE,
            beta: Scalar::ZERO,
            use_alpha: true,
            use_beta: true,
            seed: 0,
            num_queues: 1,
            coverage: CoverageLevel::Full,
            integer_values: false,
        }
    }
}

impl TestParams {
    /// Convenience constructor for a GEMV case with tight leading
    /// dimension, unit strides and zero offsets
    #[must_use]
    pub fn gemv(order: Order, m: usize, n: usize, seed: u64) -> Self {
        let lda = match order {
            Order::ColMajor => m,
            Order::RowMajor => n,
        };
        Self {
            m,
            n,
            order,
            lda,
            seed,
            ..Self::default()
        }
    }

    /// Convenience constructor for a packed HPR case of order `n`
    #[must_use]
    pub fn hpr(uplo: Uplo, n: usize, seed: u64) -> Self {
        Self {
            n,
            uplo,
            alpha: Scalar::real(1.0),
            use_beta: false,
            seed,
            ..Self::default()
        }
    }

    /// Logical length of the X vector after the transpose mapping
    #[must_use]
    pub fn x_len(&self) -> usize {
        match self.trans_a {
            Transpose::No => self.n,
            Transpose::Trans | Transpose::ConjTrans => self.m,
        }
    }

    /// Logical length of the Y vector after the transpose mapping
    #[must_use]
    pub fn y_len(&self) -> usize {
        match self.trans_a {
            Transpose::No => self.m,
            Transpose::Trans | Transpose::ConjTrans => self.n,
        }
    }

    /// Access pattern of X inside its allocation
    #[must_use]
    pub fn x_pattern(&self) -> AccessPattern {
        AccessPattern::new(self.off_bx, self.incx, self.x_len())
    }

    /// Access pattern of Y inside its allocation
    #[must_use]
    pub fn y_pattern(&self) -> AccessPattern {
        AccessPattern::new(self.off_cy, self.incy, self.y_len())
    }

    /// Storage extent of the A matrix including offset and padding
    #[must_use]
    pub fn a_extent(&self) -> usize {
        let count = match self.order {
            Order::ColMajor => self.n,
            Order::RowMajor => self.m,
        };
        self.off_a + self.lda * count
    }

    /// Number of stored elements of an order-`n` packed triangle
    #[must_use]
    pub fn packed_len(n: usize) -> usize {
        n * (n + 1) / 2
    }

    /// Effective alpha: the multiplicative identity when unused
    #[must_use]
    pub fn effective_alpha(&self) -> Scalar {
        if self.use_alpha {
            self.alpha
        } else {
            Scalar::ONE
        }
    }

    /// Effective beta: the additive identity when unused
    #[must_use]
    pub fn effective_beta(&self) -> Scalar {
        if self.use_beta {
            self.beta
        } else {
            Scalar::ZERO
        }
    }

    /// Validate internal consistency of dimensions, layout and strides
    ///
    /// # Errors
    ///
    /// Returns [`VerificarError::InvalidShape`] naming the violated
    /// constraint.
    pub fn validate(&self) -> Result<()> {
        if self.m == 0 || self.n == 0 {
            return Err(VerificarError::InvalidShape {
                reason: format!("dimensions must be positive: m={}, n={}", self.m, self.n),
            });
        }
        if self.incx == 0 || self.incy == 0 {
            return Err(VerificarError::InvalidShape {
                reason: "vector increments must be nonzero".to_string(),
            });
        }
        let min_ld = match self.order {
            Order::ColMajor => self.m,
            Order::RowMajor => self.n,
        };
        if self.lda != 0 && self.lda < min_ld {
            return Err(VerificarError::InvalidShape {
                reason: format!(
                    "lda {} below minimum {} for {:?} storage",
                    self.lda, min_ld, self.order
                ),
            });
        }
        if self.num_queues == 0 {
            return Err(VerificarError::InvalidShape {
                reason: "at least one command queue is required".to_string(),
            });
        }
        Ok(())
    }

    /// Whether this case adds nothing at the current coverage level
    ///
    /// Under reduced coverage, a case that combines a nonzero offset
    /// with a non-unit stride exercises no code path the simpler
    /// variants miss, so it is skipped as redundant.
    #[must_use]
    pub fn redundant_for_coverage(&self) -> bool {
        if self.coverage == CoverageLevel::Full {
            return false;
        }
        let offsets = self.off_a > 0 || self.off_bx > 0 || self.off_cy > 0;
        let strides = self.incx.unsigned_abs() > 1 || self.incy.unsigned_abs() > 1;
        offsets && strides
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gemv_constructor_tight_lda() {
        let col = TestParams::gemv(Order::ColMajor, 4, 3, 42);
        assert_eq!(col.lda, 4);
        let row = TestParams::gemv(Order::RowMajor, 4, 3, 42);
        assert_eq!(row.lda, 3);
    }

    #[test]
    fn test_transpose_swaps_vector_lengths() {
        let mut p = TestParams::gemv(Order::ColMajor, 4, 3, 0);
        assert_eq!(p.x_len(), 3);
        assert_eq!(p.y_len(), 4);
        p.trans_a = Transpose::Trans;
        assert_eq!(p.x_len(), 4);
        assert_eq!(p.y_len(), 3);
        p.trans_a = Transpose::ConjTrans;
        assert_eq!(p.x_len(), 4);
    }

    #[test]
    fn test_validate_rejects_zero_dims() {
        let p = TestParams::default();
        assert!(matches!(
            p.validate(),
            Err(VerificarError::InvalidShape { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_zero_increment() {
        let mut p = TestParams::gemv(Order::ColMajor, 2, 2, 0);
        p.incx = 0;
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_small_lda() {
        let mut p = TestParams::gemv(Order::ColMajor, 4, 3, 0);
        p.lda = 3;
        assert!(p.validate().is_err());
        p.lda = 5;
        assert!(p.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_queues() {
        let mut p = TestParams::gemv(Order::ColMajor, 2, 2, 0);
        p.num_queues = 0;
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_pattern_positions_with_stride() {
        let pat = AccessPattern::new(1, 2, 3);
        let pos: Vec<usize> = pat.positions().collect();
        assert_eq!(pos, vec![1, 3, 5]);
        assert_eq!(pat.extent(), 6);
    }

    #[test]
    fn test_pattern_negative_increment_same_positions() {
        let fwd = AccessPattern::new(2, 3, 4);
        let bwd = AccessPattern::new(2, -3, 4);
        let a: Vec<usize> = fwd.positions().collect();
        let b: Vec<usize> = bwd.positions().collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_pattern_contains() {
        let pat = AccessPattern::new(1, 2, 3);
        assert!(pat.contains(1));
        assert!(pat.contains(3));
        assert!(pat.contains(5));
        assert!(!pat.contains(0));
        assert!(!pat.contains(2));
        assert!(!pat.contains(7));
    }

    #[test]
    fn test_effective_scalars_fall_back_to_identities() {
        let mut p = TestParams::gemv(Order::ColMajor, 2, 2, 0);
        p.alpha = Scalar::new(2.0, 1.0);
        p.beta = Scalar::new(3.0, 0.0);
        p.use_alpha = false;
        p.use_beta = false;
        assert_eq!(p.effective_alpha(), Scalar::ONE);
        assert_eq!(p.effective_beta(), Scalar::ZERO);
    }

    #[test]
    fn test_reduced_coverage_skips_offset_plus_stride() {
        let mut p = TestParams::gemv(Order::ColMajor, 4, 4, 0);
        p.coverage = CoverageLevel::Reduced;
        assert!(!p.redundant_for_coverage());
        p.off_bx = 2;
        assert!(!p.redundant_for_coverage());
        p.incx = 2;
        assert!(p.redundant_for_coverage());
        p.coverage = CoverageLevel::Full;
        assert!(!p.redundant_for_coverage());
    }

    #[test]
    fn test_packed_len() {
        assert_eq!(TestParams::packed_len(1), 1);
        assert_eq!(TestParams::packed_len(4), 10);
    }

    #[test]
    fn test_params_serde_roundtrip() {
        let p = TestParams::gemv(Order::RowMajor, 4, 3, 42);
        let json = serde_json::to_string(&p).unwrap();
        let back: TestParams = serde_json::from_str(&json).unwrap();
        assert_eq!(p, back);
    }
}
