//! Application layer: configured runs and their converged results
pub mod analyzer;
pub mod result;

pub use analyzer::PointerAnalysis;
pub use result::PointerAnalysisResult;
