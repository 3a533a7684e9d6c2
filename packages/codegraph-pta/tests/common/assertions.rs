//! Assertion helpers over converged results

use codegraph_pta::shared::models::{StmtRef, VarId};
use codegraph_pta::PointerAnalysisResult;

/// Allocation sites a variable may point to, sorted
pub fn alloc_sites(result: &PointerAnalysisResult, var: VarId) -> Vec<StmtRef> {
    use codegraph_pta::features::heap_model::AllocSite;

    let mut sites: Vec<StmtRef> = result
        .points_to(var)
        .iter()
        .filter_map(|obj| match result.object(obj).site {
            AllocSite::Stmt(site) => Some(site),
            _ => None,
        })
        .collect();
    sites.sort_unstable();
    sites.dedup();
    sites
}

/// Every instance-call edge passes the dispatch soundness check
pub fn assert_dispatch_sound(result: &PointerAnalysisResult, stubs: &codegraph_pta::StubModel) {
    let violations = result
        .call_graph()
        .check_dispatch(result.program(), result.hierarchy(), stubs);
    assert!(violations.is_empty(), "dispatch violations: {:?}", violations);
}
