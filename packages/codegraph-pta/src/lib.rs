/*
 * Codegraph PTA - Pointer Analysis & Call Graph Engine
 *
 * Feature-First Hexagonal Architecture:
 * - shared/      : Program model (classes, methods, IR statements)
 * - features/    : class hierarchy → heap model → stubs → solver → call graph → clients
 * - config/      : Precision presets, entry points (YAML/JSON)
 * - errors       : Fatal diagnostics and cancellation
 *
 * Execution:
 * - Single-threaded worklist solver per run
 * - Rayon work-stealing for client analyses after convergence
 * - Index-based identities, results shareable across threads
 */

// Crate-level lint configuration
#![allow(clippy::too_many_arguments)] // Solver entry points take the whole run context
#![allow(clippy::type_complexity)] // Nested index maps
#![allow(clippy::new_without_default)] // Default impl not always needed
#![allow(clippy::module_inception)] // Module naming intentional

// ═══════════════════════════════════════════════════════════════════════════
// Module Exports - Feature-First Architecture
// ═══════════════════════════════════════════════════════════════════════════

/// Shared program model
pub mod shared;

/// Feature modules (hierarchy, heap, stubs, solver, call graph, clients)
pub mod features;

/// Configuration system
pub mod config;

/// Error types
pub mod errors;

// ═══════════════════════════════════════════════════════════════════════════
// Re-exports for Public API
// ═══════════════════════════════════════════════════════════════════════════

pub use config::{EntryParams, EntryPoints, Preset, PtaConfig};
pub use errors::{PtaError, Result};
pub use features::call_graph::{CallEdge, CallGraph};
pub use features::class_hierarchy::ClassHierarchy;
pub use features::clients::{AnalysisSession, ClientReport, Finding, SessionState, Severity};
pub use features::heap_model::{ContextPolicy, CtxId, HeapAbstraction, ObjId};
pub use features::points_to::{
    CancellationToken, ClientAnalysis, PointerAnalysis, PointerAnalysisResult, PointsToSet,
    SolverPlugin,
};
pub use features::stubs::StubModel;
pub use shared::models::{MethodId, Program, ProgramBuilder, StmtRef, Type, VarId};
