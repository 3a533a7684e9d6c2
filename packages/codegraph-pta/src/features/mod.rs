//! Feature modules, leaves first
//!
//! Each feature owns its slice of the analysis:
//! - class_hierarchy/ - Subtyping and virtual dispatch index
//! - heap_model/      - Abstract objects and context policies
//! - stubs/           - Library summaries
//! - points_to/       - Solver (domain / ports / application / infrastructure)
//! - call_graph/      - On-the-fly call graph
//! - clients/         - Analyses over the converged result

pub mod call_graph;
pub mod class_hierarchy;
pub mod clients;
pub mod heap_model;
pub mod points_to;
pub mod stubs;
