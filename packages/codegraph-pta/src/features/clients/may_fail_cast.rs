//! Casts that may throw at run time
//!
//! A cast `lhs = (T) rhs` may fail when some non-null object `rhs` points to
//! is not a subtype of `T`. Only the operand's points-to set is consulted;
//! the cast's own filter already kept those objects out of `lhs`.

use super::finding::{Finding, Severity};
use super::reachable_statements;
use crate::features::points_to::application::PointerAnalysisResult;
use crate::features::points_to::ports::ClientAnalysis;
use crate::shared::models::Stmt;

pub const MAY_FAIL_CAST_ID: &str = "may-fail-cast";

#[derive(Debug, Clone, Copy, Default)]
pub struct MayFailCast;

impl ClientAnalysis for MayFailCast {
    fn id(&self) -> &str {
        MAY_FAIL_CAST_ID
    }

    fn analyze(&self, result: &PointerAnalysisResult) -> Vec<Finding> {
        let hierarchy = result.hierarchy();
        let mut findings = Vec::new();

        for (site, stmt) in reachable_statements(result) {
            let Stmt::Cast { rhs, ty, .. } = stmt else {
                continue;
            };
            let Some(target) = hierarchy.resolve_type(ty) else {
                continue;
            };

            let failing: Vec<String> = result
                .points_to(*rhs)
                .iter()
                .filter(|&obj| !result.is_null(obj))
                .filter(|&obj| !hierarchy.is_subtype(&result.object(obj).ty, &target))
                .map(|obj| result.describe_object(obj))
                .collect();
            if failing.is_empty() {
                continue;
            }

            let message = format!("cast to {} may fail for {}", ty, failing.join(", "));
            findings.push(Finding::new(MAY_FAIL_CAST_ID, Severity::Medium, site.method, message).at(site));
        }
        findings
    }
}
