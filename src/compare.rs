//! Tolerance-aware result comparison and sentinel verification
//!
//! Two independent checks run against every retrieved output buffer:
//! the logical positions must match the reference within the element
//! type's tolerance, and every position outside the logical pattern
//! must still hold the sentinel poison written before execution. The
//! second check is what turns a silent out-of-bounds write into an
//! attributable failure.

use crate::element::Element;
use crate::error::{Result, VerificarError};
use crate::params::AccessPattern;

/// Compare logical positions of two buffers within tolerance
///
/// Walks only the positions the pattern reaches. Complex values are
/// compared part-by-part. The first mismatch is reported with its flat
/// index and both values.
///
/// # Errors
///
/// Returns [`VerificarError::Mismatch`] for the first differing
/// position.
pub fn compare_strided<T: Element>(
    reference: &[T],
    device: &[T],
    pattern: &AccessPattern,
) -> Result<()> {
    for idx in pattern.positions() {
        let expected = reference[idx];
        let actual = device[idx];
        if !expected.approx_eq(actual, T::REL_TOLERANCE) {
            return Err(VerificarError::Mismatch {
                index: idx,
                expected: format!("{expected:?}"),
                actual: format!("{actual:?}"),
            });
        }
    }
    Ok(())
}

/// Verify that every position outside the pattern is still poisoned
///
/// # Errors
///
/// Returns [`VerificarError::SentinelClobbered`] for the first
/// position that lost its poison value.
pub fn check_sentinels_outside<T: Element>(buf: &[T], pattern: &AccessPattern) -> Result<()> {
    for (idx, value) in buf.iter().enumerate() {
        if !pattern.contains(idx) && !value.is_sentinel() {
            return Err(VerificarError::SentinelClobbered {
                index: idx,
                actual: format!("{value:?}"),
            });
        }
    }
    Ok(())
}

/// Full output verification: numeric equality on the pattern, sentinel
/// integrity everywhere else
///
/// # Errors
///
/// Propagates the first mismatch or clobbered sentinel.
pub fn verify_output<T: Element>(
    reference: &[T],
    device: &[T],
    pattern: &AccessPattern,
) -> Result<()> {
    compare_strided(reference, device, pattern)?;
    check_sentinels_outside(device, pattern)
}
