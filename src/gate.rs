//! Resource sufficiency gate
//!
//! Evaluated strictly before any allocation attempt: each operand must
//! fit under the device's single-allocation limit, and the sum of all
//! operands must fit under total available memory. Insufficiency is a
//! skip decision, never an error.

use crate::device::DeviceCaps;

/// One planned device allocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationRequest {
    /// Operand label for skip messages ("A", "X", "Y", "AP")
    pub label: &'static str,
    /// Requested size in bytes
    pub bytes: usize,
}

impl AllocationRequest {
    /// Create a request
    #[must_use]
    pub fn new(label: &'static str, bytes: usize) -> Self {
        Self { label, bytes }
    }
}

/// Outcome of the pre-allocation check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Every request fits; allocation may proceed
    Sufficient,
    /// At least one limit would be exceeded
    Insufficient {
        /// Which request exceeded which limit
        reason: String,
    },
}

impl GateDecision {
    /// Whether the case may proceed to allocation
    #[must_use]
    pub fn is_sufficient(&self) -> bool {
        matches!(self, GateDecision::Sufficient)
    }
}

/// Check a set of planned allocations against device limits
#[must_use]
pub fn check(caps: &DeviceCaps, requests: &[AllocationRequest]) -> GateDecision {
    for req in requests {
        if req.bytes > caps.max_alloc_bytes {
            return GateDecision::Insufficient {
                reason: format!(
                    "operand {} needs {} bytes, max single allocation is {}",
                    req.label, req.bytes, caps.max_alloc_bytes
                ),
            };
        }
    }
    let total: usize = requests.iter().map(|r| r.bytes).sum();
    if total > caps.total_mem_bytes {
        return GateDecision::Insufficient {
            reason: format!(
                "case needs {} bytes total, device has {}",
                total, caps.total_mem_bytes
            ),
        };
    }
    GateDecision::Sufficient
}
