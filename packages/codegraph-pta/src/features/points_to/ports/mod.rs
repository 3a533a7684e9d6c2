//! Ports (Interfaces) for Points-to Analysis
//!
//! - `SolverPlugin`: observes the solver while it runs (newly reachable
//!   methods, points-to deltas, call edges). Plugins see deltas only, never a
//!   partial fixed point as a whole.
//! - `ClientAnalysis`: evaluated against the converged, immutable result.

use crate::features::call_graph::CallEdge;
use crate::features::clients::Finding;
use crate::features::heap_model::CtxId;
use crate::features::points_to::application::PointerAnalysisResult;
use crate::features::points_to::domain::{Pointer, PointsToSet};
use crate::features::points_to::infrastructure::SolverStats;
use crate::shared::models::MethodId;

/// Solver observation hooks. Every hook has an empty default.
///
/// # Example
/// ```ignore
/// struct CountEdges(usize);
///
/// impl SolverPlugin for CountEdges {
///     fn on_new_call_edge(&mut self, _edge: &CallEdge) {
///         self.0 += 1;
///     }
/// }
/// ```
pub trait SolverPlugin: Send {
    /// Name used in logs
    fn name(&self) -> &str {
        "plugin"
    }

    fn on_start(&mut self) {}

    /// A (method, context) pair became reachable
    fn on_new_method(&mut self, _method: MethodId, _ctx: CtxId) {}

    /// `diff` was added to `pointer`'s points-to set
    fn on_new_points_to(&mut self, _pointer: &Pointer, _diff: &PointsToSet) {}

    fn on_new_call_edge(&mut self, _edge: &CallEdge) {}

    /// Called once, after convergence
    fn on_finish(&mut self, _stats: &SolverStats) {}
}

/// Downstream analysis over the converged result
pub trait ClientAnalysis: Send + Sync {
    /// Stable identifier, reported with every finding
    fn id(&self) -> &str;

    fn analyze(&self, result: &PointerAnalysisResult) -> Vec<Finding>;
}
