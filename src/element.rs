//! Element type abstraction for the four BLAS element types
//!
//! The harness is generic over a closed set of element types: `f32`,
//! `f64`, [`Complex32`] and [`Complex64`]. Per-type tolerance and
//! comparison rules live on the [`Element`] trait so the comparator
//! never branches on type introspection.

use num_complex::{Complex32, Complex64};
use num_traits::{One, Zero};
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::ops::{Add, Mul, Neg, Sub};

/// Type-erased scalar multiplier (alpha / beta) from test parameters
///
/// Carried as a complex pair; real element types drop the imaginary
/// part when converting via [`Element::from_scalar`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Scalar {
    /// Real part
    pub re: f64,
    /// Imaginary part (ignored by real element types)
    pub im: f64,
}

impl Scalar {
    /// Additive identity
    pub const ZERO: Scalar = Scalar { re: 0.0, im: 0.0 };
    /// Multiplicative identity
    pub const ONE: Scalar = Scalar { re: 1.0, im: 0.0 };

    /// Create a scalar from real and imaginary parts
    #[must_use]
    pub fn new(re: f64, im: f64) -> Self {
        Self { re, im }
    }

    /// Create a purely real scalar
    #[must_use]
    pub fn real(re: f64) -> Self {
        Self { re, im: 0.0 }
    }
}

/// Closed-set element trait for BLAS verification
///
/// Implemented for exactly `f32`, `f64`, `Complex32` and `Complex64`.
pub trait Element:
    Copy
    + Debug
    + PartialEq
    + Zero
    + One
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Neg<Output = Self>
    + Send
    + Sync
    + 'static
{
    /// Whether this type has an imaginary component
    const IS_COMPLEX: bool;

    /// Whether this type needs native double-precision device support
    const REQUIRES_F64: bool;

    /// Relative tolerance for comparator equality checks
    const REL_TOLERANCE: f64;

    /// Short BLAS-style type tag for messages ("s", "d", "c", "z")
    const TAG: &'static str;

    /// The poison value marking storage the routine must never touch
    fn sentinel() -> Self;

    /// Detect the sentinel. NaN compares unequal to itself, so this is
    /// a NaN-class check rather than `==`.
    fn is_sentinel(&self) -> bool;

    /// Draw a uniform random value in [-1, 1] per component
    fn random(rng: &mut StdRng) -> Self;

    /// Draw a small integer-representable random value per component
    ///
    /// Used for bit-exact comparison scenarios where products and
    /// short sums must be exactly representable.
    fn random_integer(rng: &mut StdRng) -> Self;

    /// Convert a type-erased multiplier into this element type
    fn from_scalar(s: Scalar) -> Self;

    /// Construct a purely real element
    fn from_real(re: f64) -> Self;

    /// Complex conjugate (identity for real types)
    #[must_use]
    fn conj(self) -> Self;

    /// Real part as f64
    fn real_part(self) -> f64;

    /// Drop the imaginary component (used for Hermitian diagonals)
    #[must_use]
    fn forced_real(self) -> Self;

    /// Tolerance-aware equality, comparing real and imaginary parts
    /// independently for complex types
    fn approx_eq(self, other: Self, tol: f64) -> bool;

    /// Size of one element in bytes, for resource accounting
    #[must_use]
    fn size_of() -> usize {
        std::mem::size_of::<Self>()
    }
}

/// Per-part closeness check shared by all four implementations
fn close(a: f64, b: f64, tol: f64) -> bool {
    if a == b {
        return true;
    }
    if a.is_nan() || b.is_nan() {
        return false;
    }
    let diff = (a - b).abs();
    let scale = a.abs().max(b.abs()).max(1.0);
    diff <= tol * scale
}

impl Element for f32 {
    const IS_COMPLEX: bool = false;
    const REQUIRES_F64: bool = false;
    const REL_TOLERANCE: f64 = 1e-4;
    const TAG: &'static str = "s";

    fn sentinel() -> Self {
        f32::NAN
    }

    fn is_sentinel(&self) -> bool {
        self.is_nan()
    }

    fn random(rng: &mut StdRng) -> Self {
        rng.gen_range(-1.0f32..1.0f32)
    }

    fn random_integer(rng: &mut StdRng) -> Self {
        rng.gen_range(-8i32..=8) as f32
    }

    fn from_scalar(s: Scalar) -> Self {
        s.re as f32
    }

    fn from_real(re: f64) -> Self {
        re as f32
    }

    fn conj(self) -> Self {
        self
    }

    fn real_part(self) -> f64 {
        f64::from(self)
    }

    fn forced_real(self) -> Self {
        self
    }

    fn approx_eq(self, other: Self, tol: f64) -> bool {
        close(f64::from(self), f64::from(other), tol)
    }
}

impl Element for f64 {
    const IS_COMPLEX: bool = false;
    const REQUIRES_F64: bool = true;
    const REL_TOLERANCE: f64 = 1e-10;
    const TAG: &'static str = "d";

    fn sentinel() -> Self {
        f64::NAN
    }

    fn is_sentinel(&self) -> bool {
        self.is_nan()
    }

    fn random(rng: &mut StdRng) -> Self {
        rng.gen_range(-1.0f64..1.0f64)
    }

    fn random_integer(rng: &mut StdRng) -> Self {
        f64::from(rng.gen_range(-8i32..=8))
    }

    fn from_scalar(s: Scalar) -> Self {
        s.re
    }

    fn from_real(re: f64) -> Self {
        re
    }

    fn conj(self) -> Self {
        self
    }

    fn real_part(self) -> f64 {
        self
    }

    fn forced_real(self) -> Self {
        self
    }

    fn approx_eq(self, other: Self, tol: f64) -> bool {
        close(self, other, tol)
    }
}

impl Element for Complex32 {
    const IS_COMPLEX: bool = true;
    const REQUIRES_F64: bool = false;
    const REL_TOLERANCE: f64 = 1e-4;
    const TAG: &'static str = "c";

    fn sentinel() -> Self {
        Complex32::new(f32::NAN, f32::NAN)
    }

    fn is_sentinel(&self) -> bool {
        self.re.is_nan() || self.im.is_nan()
    }

    fn random(rng: &mut StdRng) -> Self {
        Complex32::new(rng.gen_range(-1.0f32..1.0f32), rng.gen_range(-1.0f32..1.0f32))
    }

    fn random_integer(rng: &mut StdRng) -> Self {
        Complex32::new(
            rng.gen_range(-8i32..=8) as f32,
            rng.gen_range(-8i32..=8) as f32,
        )
    }

    fn from_scalar(s: Scalar) -> Self {
        Complex32::new(s.re as f32, s.im as f32)
    }

    fn from_real(re: f64) -> Self {
        Complex32::new(re as f32, 0.0)
    }

    fn conj(self) -> Self {
        Complex32::new(self.re, -self.im)
    }

    fn real_part(self) -> f64 {
        f64::from(self.re)
    }

    fn forced_real(self) -> Self {
        Complex32::new(self.re, 0.0)
    }

    fn approx_eq(self, other: Self, tol: f64) -> bool {
        close(f64::from(self.re), f64::from(other.re), tol)
            && close(f64::from(self.im), f64::from(other.im), tol)
    }
}

impl Element for Complex64 {
    const IS_COMPLEX: bool = true;
    const REQUIRES_F64: bool = true;
    const REL_TOLERANCE: f64 = 1e-10;
    const TAG: &'static str = "z";

    fn sentinel() -> Self {
        Complex64::new(f64::NAN, f64::NAN)
    }

    fn is_sentinel(&self) -> bool {
        self.re.is_nan() || self.im.is_nan()
    }

    fn random(rng: &mut StdRng) -> Self {
        Complex64::new(rng.gen_range(-1.0f64..1.0f64), rng.gen_range(-1.0f64..1.0f64))
    }

    fn random_integer(rng: &mut StdRng) -> Self {
        Complex64::new(
            f64::from(rng.gen_range(-8i32..=8)),
            f64::from(rng.gen_range(-8i32..=8)),
        )
    }

    fn from_scalar(s: Scalar) -> Self {
        Complex64::new(s.re, s.im)
    }

    fn from_real(re: f64) -> Self {
        Complex64::new(re, 0.0)
    }

    fn conj(self) -> Self {
        Complex64::new(self.re, -self.im)
    }

    fn real_part(self) -> f64 {
        self.re
    }

    fn forced_real(self) -> Self {
        Complex64::new(self.re, 0.0)
    }

    fn approx_eq(self, other: Self, tol: f64) -> bool {
        close(self.re, other.re, tol) && close(self.im, other.im, tol)
    }
}
