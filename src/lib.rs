//! # Verificar
//!
//! Verification and benchmarking harness for accelerated BLAS routines.
//!
//! Verificar (Spanish: "to verify") drives a trusted host-side
//! reference engine and an accelerated device-side engine over
//! identical, deterministically generated operands, then compares the
//! results within per-type tolerances. Buffers are poisoned with NaN
//! sentinels before execution so out-of-bounds device accesses become
//! attributable failures rather than silent corruption.
//!
//! ## Architecture
//!
//! - [`params`]: the per-case parameter record and strided access
//!   patterns
//! - [`generate`]: sentinel poisoning and seeded operand generation
//! - [`gate`]: resource sufficiency pre-check against device limits
//! - [`device`]: capability record, RAII buffer handles, queue sync
//! - [`engine`]: the reference and accelerated engine seams, plus the
//!   mock used by this crate's own tests
//! - [`orchestrator`]: the per-case state machine from generation
//!   through comparison or timing
//! - [`compare`]: tolerance-aware comparison and sentinel verification
//! - [`timing`]: the timed-loop protocol and performance reporting
//! - [`stats`]: stability summaries over repeated measurements
//!
//! ## Example
//!
//! ```rust
//! use verificar::device::{DeviceCaps, DeviceContext};
//! use verificar::engine::{MockAcceleratedEngine, NaiveReference};
//! use verificar::orchestrator::Orchestrator;
//! use verificar::params::{Order, TestParams};
//!
//! let ctx = DeviceContext::new(DeviceCaps::default());
//! let reference = NaiveReference::new();
//! let engine = MockAcceleratedEngine::new();
//! let orchestrator = Orchestrator::<f32>::new(&ctx, &reference, &engine);
//!
//! let params = TestParams::gemv(Order::ColMajor, 16, 8, 42);
//! let outcome = orchestrator.run_gemv_correctness(&params);
//! assert!(outcome.is_passed());
//! ```

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
// Clippy allows (MUST come after deny/warn to override them)
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_precision_loss)] // duration nanos -> f64 is safe here
#![allow(clippy::cast_possible_truncation)] // statistics nanos conversions
#![allow(clippy::cast_sign_loss)] // increment magnitudes
#![allow(clippy::must_use_candidate)] // Not all methods need #[must_use]
#![allow(clippy::missing_panics_doc)] // Allow missing Panics doc sections
#![allow(clippy::float_cmp)] // Allow exact float comparisons in tests
#![allow(clippy::uninlined_format_args)] // Prefer explicit format args

pub mod compare;
pub mod device;
pub mod element;
pub mod engine;
pub mod error;
pub mod gate;
pub mod generate;
pub mod orchestrator;
pub mod params;
pub mod stats;
pub mod timing;

pub use element::{Element, Scalar};
pub use error::{Result, VerificarError};
pub use orchestrator::{CaseOutcome, Orchestrator, PerformanceReport, SkipReason};
pub use params::{AccessPattern, CoverageLevel, Order, TestParams, Transpose, Uplo};
