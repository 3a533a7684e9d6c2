//! Methods that never became reachable
//!
//! Method-level dead code: a declared method with a body that no call edge
//! from the entry points reaches. Abstract and library methods have nothing
//! to report and are skipped.

use super::finding::{Finding, Severity};
use crate::features::points_to::application::PointerAnalysisResult;
use crate::features::points_to::ports::ClientAnalysis;

pub const DEAD_METHODS_ID: &str = "dead-methods";

#[derive(Debug, Clone, Default)]
pub struct DeadMethods {
    /// Class name prefixes never reported (generated code, test fixtures)
    pub ignored_prefixes: Vec<String>,
}

impl DeadMethods {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ignore_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.ignored_prefixes.push(prefix.into());
        self
    }

    fn is_ignored(&self, class: &str) -> bool {
        self.ignored_prefixes.iter().any(|p| class.starts_with(p.as_str()))
    }
}

impl ClientAnalysis for DeadMethods {
    fn id(&self) -> &str {
        DEAD_METHODS_ID
    }

    fn analyze(&self, result: &PointerAnalysisResult) -> Vec<Finding> {
        let call_graph = result.call_graph();
        result
            .program()
            .methods()
            .filter(|(_, decl)| decl.has_body() && !self.is_ignored(&decl.class))
            .filter(|(id, _)| !call_graph.is_reachable(*id))
            .map(|(id, decl)| {
                Finding::new(
                    DEAD_METHODS_ID,
                    Severity::Low,
                    id,
                    format!("{} is never reached from the entry points", decl.signature()),
                )
            })
            .collect()
    }
}
