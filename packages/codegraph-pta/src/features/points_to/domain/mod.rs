//! Domain models for Points-to Analysis
//!
//! Core abstractions independent of the solving loop:
//! - Pointer: local/field/array/static storage under a context
//! - PointsToSet: sorted object set with delta union
//! - Constraint: lowered vocabulary shared by method bodies and stubs
//! - Diagnostic: non-fatal resolution failures

pub mod constraint;
pub mod diagnostic;
pub mod pointer;
pub mod points_to_set;

pub use constraint::{CallConstraint, CallTarget, Constraint};
pub use diagnostic::{Diagnostic, DiagnosticKind};
pub use pointer::{FieldId, FieldTable, Local, Pointer, PointerId, PointerTable};
pub use points_to_set::PointsToSet;
