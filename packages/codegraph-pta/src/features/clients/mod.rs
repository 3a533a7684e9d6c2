//! Client Analyses
//!
//! Consumers of the converged points-to relation and call graph. Every
//! client implements `ClientAnalysis` and runs through an
//! `AnalysisSession`, which refuses clients until a run has converged.
//!
//! Built-in clients:
//! - `TaintAnalysis`: source-to-sink flows, configured in YAML/JSON
//! - `NullDereference`: dereferences of variables that may be null
//! - `MayFailCast`: casts whose operand may hold an incompatible object
//! - `DeadMethods`: method bodies no entry point reaches

pub mod dead_methods;
pub mod finding;
pub mod may_fail_cast;
pub mod null_deref;
pub mod session;
pub mod taint;

pub use dead_methods::DeadMethods;
pub use finding::{ClientReport, Finding, Severity};
pub use may_fail_cast::MayFailCast;
pub use null_deref::NullDereference;
pub use session::{AnalysisSession, SessionState};
pub use taint::{
    CallIndex, TaintAnalysis, TaintConfig, TaintFlow, TaintLabel, TaintSanitizer, TaintSink,
    TaintSource, TaintTransfer,
};

use crate::features::points_to::application::PointerAnalysisResult;
use crate::shared::models::{Stmt, StmtRef};

/// Statements of reachable method bodies, CFG-unreachable blocks excluded
pub(crate) fn reachable_statements(
    result: &PointerAnalysisResult,
) -> impl Iterator<Item = (StmtRef, &Stmt)> + '_ {
    let program = result.program();
    result
        .call_graph()
        .reachable_methods()
        .iter()
        .filter_map(move |&method| {
            program
                .method(method)
                .body
                .as_ref()
                .map(|body| (method, body))
        })
        .flat_map(|(method, body)| {
            body.reachable_stmts()
                .into_iter()
                .map(move |index| (StmtRef::new(method, index), &body.stmts[index as usize]))
        })
}
