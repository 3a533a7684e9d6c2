//! # Points-to Analysis
//!
//! Inclusion-based (Andersen-style) pointer analysis with on-the-fly call
//! graph construction for object-oriented bytecode:
//! - **Pluggable contexts**: insensitive, k-call-site, k-object
//! - **Heap abstraction**: per allocation site, optionally per context
//! - **Library stubs**: summaries lowered into the same constraints as bodies
//! - **Cooperative cancellation**: checked once per worklist iteration
//!
//! ## Academic References
//! - Andersen, L. O. "Program Analysis and Specialization for C" (PhD 1994)
//! - Milanova et al. "Parameterized Object Sensitivity" (TOSEM 2005)
//! - Smaragdakis et al. "Pick Your Contexts Well" (POPL 2011)
//!
//! ## Usage
//! ```text
//! let result = PointerAnalysis::build(program, stubs, config)?
//!     .with_plugin(MyObserver::default())
//!     .run(&token)?;
//! assert!(result.may_alias(x, y));
//! ```

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod ports;

// Re-exports for public API
pub use application::{PointerAnalysis, PointerAnalysisResult};
pub use domain::{Diagnostic, DiagnosticKind, FieldId, Local, Pointer, PointsToSet};
pub use infrastructure::{CancellationToken, SolverStats};
pub use ports::{ClientAnalysis, SolverPlugin};
// Re-export infrastructure (internal use - prefer application layer)
#[doc(hidden)]
pub use infrastructure::Solver;
