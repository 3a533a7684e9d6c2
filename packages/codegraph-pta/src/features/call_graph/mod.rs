//! On-the-fly call graph, owned by the solver during a run
pub mod graph;

pub use graph::{CallEdge, CallGraph, DispatchViolation};
