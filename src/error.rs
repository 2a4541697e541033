//! Error types for the verification harness
//!
//! Skips are not errors: a test case that cannot run on the current
//! device is reported through `CaseOutcome::Skipped`, never through
//! this enum. Everything here is a hard failure of a single case.

use thiserror::Error;

/// Result type alias using [`VerificarError`]
pub type Result<T> = std::result::Result<T, VerificarError>;

/// Errors surfaced by the harness
#[derive(Debug, Clone, PartialEq, Error)]
pub enum VerificarError {
    /// Dimensions, strides or offsets are inconsistent with the layout
    #[error("Invalid shape: {reason}")]
    InvalidShape {
        /// Description of the inconsistency
        reason: String,
    },

    /// An accelerated engine call or queue synchronization failed.
    /// The reason names the failing call.
    #[error("GPU error: {reason}")]
    GpuError {
        /// Description of the failing call
        reason: String,
    },

    /// Operation not supported by the harness or the element type
    #[error("Unsupported operation: {reason}")]
    UnsupportedOperation {
        /// Description of the unsupported operation
        reason: String,
    },

    /// A logical output position differs beyond tolerance
    #[error("Result mismatch at index {index}: reference={expected}, device={actual}")]
    Mismatch {
        /// Flat index into the output buffer
        index: usize,
        /// Reference value (formatted)
        expected: String,
        /// Device value (formatted)
        actual: String,
    },

    /// A position the routine must never touch lost its poison value.
    /// This is an out-of-bounds access, not a numeric tolerance issue.
    #[error("Sentinel clobbered at index {index}: found {actual}")]
    SentinelClobbered {
        /// Flat index into the buffer
        index: usize,
        /// Value found where the sentinel should be (formatted)
        actual: String,
    },

    /// A timing measurement could not be completed
    #[error("Timing failed: {reason}")]
    TimingFailed {
        /// Description of the measurement failure
        reason: String,
    },

    /// Device memory is insufficient for the requested problem size
    #[error("Insufficient resources: {reason}")]
    InsufficientResources {
        /// Which allocation exceeded which limit
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_names_failing_call() {
        let err = VerificarError::GpuError {
            reason: "gemv invocation returned failure".to_string(),
        };
        assert!(err.to_string().contains("gemv"));
    }

    #[test]
    fn test_mismatch_reports_index_and_values() {
        let err = VerificarError::Mismatch {
            index: 7,
            expected: "1.0".to_string(),
            actual: "2.0".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains('7'));
        assert!(msg.contains("1.0"));
        assert!(msg.contains("2.0"));
    }

    #[test]
    fn test_sentinel_clobber_is_distinct_from_mismatch() {
        let clobber = VerificarError::SentinelClobbered {
            index: 3,
            actual: "0.5".to_string(),
        };
        let mismatch = VerificarError::Mismatch {
            index: 3,
            expected: "0.5".to_string(),
            actual: "0.5".to_string(),
        };
        assert_ne!(clobber, mismatch);
    }
}
