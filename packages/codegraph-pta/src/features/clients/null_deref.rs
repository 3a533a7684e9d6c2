//! Null dereference detection
//!
//! Flags every dereference (instance call, field access, array access) in
//! reachable code whose base variable may point to the null object. The
//! points-to relation is flow-insensitive, so a base assigned `null` on one
//! path and a fresh object on another is still reported.

use super::finding::{Finding, Severity};
use super::reachable_statements;
use crate::features::points_to::application::PointerAnalysisResult;
use crate::features::points_to::ports::ClientAnalysis;
use crate::shared::models::{Stmt, VarId};

pub const NULL_DEREF_ID: &str = "null-deref";

#[derive(Debug, Clone, Default)]
pub struct NullDereference {
    /// Skip bases that may also hold a real object
    pub report_definite_only: bool,
}

impl NullDereference {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn definite_only(mut self) -> Self {
        self.report_definite_only = true;
        self
    }
}

fn dereferenced(stmt: &Stmt) -> Option<(VarId, &'static str)> {
    match stmt {
        Stmt::LoadField { base, .. } => Some((*base, "field load")),
        Stmt::StoreField { base, .. } => Some((*base, "field store")),
        Stmt::LoadArray { base, .. } => Some((*base, "array load")),
        Stmt::StoreArray { base, .. } => Some((*base, "array store")),
        Stmt::Invoke(invoke) => invoke.receiver.map(|r| (r, "call receiver")),
        _ => None,
    }
}

impl ClientAnalysis for NullDereference {
    fn id(&self) -> &str {
        NULL_DEREF_ID
    }

    fn analyze(&self, result: &PointerAnalysisResult) -> Vec<Finding> {
        let Some(null) = result.null_object() else {
            return Vec::new();
        };

        let mut findings = Vec::new();
        for (site, stmt) in reachable_statements(result) {
            let Some((base, what)) = dereferenced(stmt) else {
                continue;
            };
            let pts = result.points_to(base);
            if !pts.contains(null) {
                continue;
            }
            let definite = pts.len() == 1;
            if self.report_definite_only && !definite {
                continue;
            }

            let name = &result.program().var(base).name;
            let (severity, message) = if definite {
                (Severity::High, format!("{} '{}' is always null", what, name))
            } else {
                (Severity::Medium, format!("{} '{}' may be null", what, name))
            };
            findings.push(Finding::new(NULL_DEREF_ID, severity, site.method, message).at(site));
        }
        findings
    }
}
