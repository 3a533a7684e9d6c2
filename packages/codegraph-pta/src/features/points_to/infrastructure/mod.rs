//! Infrastructure layer for Points-to Analysis
//!
//! - `lowering`: method bodies and stubs → constraint templates
//! - `pointer_flow_graph`: points-to sets and subset edges
//! - `worklist`: pending deltas and call edges
//! - `solver`: the fixed-point loop

pub mod cancellation;
pub mod lowering;
pub mod pointer_flow_graph;
pub mod solver;
pub mod worklist;

pub use cancellation::CancellationToken;
pub use lowering::{ConstraintLowering, MethodTemplate};
pub use pointer_flow_graph::{FlowEdge, PointerFlowGraph};
pub use solver::{Solver, SolverOutput, SolverStats};
pub use worklist::{WorkItem, WorkList};
