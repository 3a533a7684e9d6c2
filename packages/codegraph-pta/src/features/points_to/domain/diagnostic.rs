//! Non-fatal diagnostics collected during a run
//!
//! Fatal conditions are `PtaError`s and abort the run. Diagnostics describe
//! call sites the solver could not resolve; they do not compromise the
//! points-to sets of everything else.

use crate::shared::models::StmtRef;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// No declaration matches the referenced method
    UnresolvedCall,
    /// A receiver object's type has no implementation of the signature
    UnresolvedDispatch,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub site: StmtRef,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            DiagnosticKind::UnresolvedCall => "unresolved call",
            DiagnosticKind::UnresolvedDispatch => "unresolved dispatch",
        };
        write!(f, "{} at {}: {}", kind, self.site, self.message)
    }
}
