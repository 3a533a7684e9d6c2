//! Inclusion-based Pointer Analysis Solver with On-the-fly Call Graph
//!
//! Andersen-style worklist solver over the pointer flow graph, interleaved
//! with call graph construction:
//!
//! ```text
//! add_reachable(entry, [])
//! while (p, pts) | edge ← worklist:
//!     Δ = pts - pt(p);  pt(p) ∪= Δ
//!     for p → q in PFG: worklist += (q, filter(Δ))
//!     if p is a variable (v, c):
//!         for o in Δ:
//!             x = v.f   →  o.f → x
//!             v.f = x   →  x → o.f
//!             v.m(..)   →  dispatch(o) → (m', c'), this(m', c') ∪= {o}
//!     edge (site, c) → (m, c'):
//!         add_reachable(m, c'), args → params, return → result
//! ```
//!
//! Termination: objects, contexts and fields are finite and every set only
//! grows. Cancellation is checked once per worklist iteration and discards
//! the whole state.
//!
//! # References
//! - Andersen, L. O. "Program Analysis and Specialization for C" (PhD 1994)
//! - Tan et al. "Tai-e: A Developer-Friendly Static Analysis Framework" (ISSTA 2023)

use super::cancellation::CancellationToken;
use super::lowering::ConstraintLowering;
use super::pointer_flow_graph::{FlowEdge, PointerFlowGraph};
use super::worklist::{WorkItem, WorkList};
use crate::config::{EntryParams, PtaConfig};
use crate::errors::{PtaError, Result};
use crate::features::call_graph::{CallEdge, CallGraph};
use crate::features::class_hierarchy::{ClassHierarchy, ResolvedType};
use crate::features::heap_model::{AllocSite, ContextTable, CtxId, ObjId, ObjectTable};
use crate::features::points_to::domain::{
    CallConstraint, CallTarget, Constraint, Diagnostic, DiagnosticKind, FieldTable, Local,
    Pointer, PointerId, PointerTable, PointsToSet,
};
use crate::features::points_to::ports::SolverPlugin;
use crate::features::stubs::StubModel;
use crate::shared::models::{InvokeKind, MethodId, Program, StmtRef};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, trace, warn};

/// Statistics of one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolverStats {
    pub iterations: usize,
    pub reachable_methods: usize,
    pub reachable_contexts: usize,
    pub call_edges: usize,
    pub pointers: usize,
    pub flow_edges: usize,
    pub objects: usize,
    pub contexts: usize,
    pub lowered_methods: usize,
    pub worklist_peak: usize,
    pub diagnostics: usize,
    pub elapsed_ms: u64,
}

/// Everything a converged run produced
#[derive(Debug)]
pub struct SolverOutput {
    pub pointers: PointerTable,
    pub pts: Vec<PointsToSet>,
    pub objects: ObjectTable,
    pub contexts: ContextTable,
    pub fields: FieldTable,
    pub call_graph: CallGraph,
    pub diagnostics: Vec<Diagnostic>,
    pub stats: SolverStats,
}

/// Run-scoped solver state. Nothing here outlives one run.
pub struct Solver<'a> {
    program: &'a Program,
    hierarchy: &'a ClassHierarchy,
    config: &'a PtaConfig,
    lowering: ConstraintLowering<'a>,
    contexts: ContextTable,
    objects: ObjectTable,
    pfg: PointerFlowGraph,
    worklist: WorkList,
    call_graph: CallGraph,
    diagnostics: Vec<Diagnostic>,
    reported: FxHashSet<Diagnostic>,
    plugins: Vec<Box<dyn SolverPlugin>>,
    token: CancellationToken,
    iterations: usize,
}

impl<'a> Solver<'a> {
    pub fn new(
        program: &'a Program,
        hierarchy: &'a ClassHierarchy,
        stubs: &'a StubModel,
        config: &'a PtaConfig,
        token: CancellationToken,
    ) -> Self {
        Self {
            program,
            hierarchy,
            config,
            lowering: ConstraintLowering::new(program, hierarchy, stubs),
            contexts: ContextTable::new(),
            objects: ObjectTable::new(),
            pfg: PointerFlowGraph::new(),
            worklist: WorkList::new(),
            call_graph: CallGraph::new(),
            diagnostics: Vec::new(),
            reported: FxHashSet::default(),
            plugins: Vec::new(),
            token,
            iterations: 0,
        }
    }

    pub fn add_plugin(&mut self, plugin: Box<dyn SolverPlugin>) {
        self.plugins.push(plugin);
    }

    /// Solve to the fixed point from the given entry methods
    pub fn solve(mut self, entries: &[MethodId]) -> Result<SolverOutput> {
        let start = Instant::now();
        info!(
            "Pointer analysis started: {} entry methods, policy {}, heap {:?}",
            entries.len(),
            self.config.context_policy,
            self.config.heap_abstraction
        );
        for plugin in &mut self.plugins {
            plugin.on_start();
        }

        for &entry in entries {
            self.add_reachable(entry, CtxId::EMPTY)?;
            if self.config.entry_params == EntryParams::Mock {
                self.seed_entry_params(entry)?;
            }
        }
        self.analyze()?;

        let stats = SolverStats {
            iterations: self.iterations,
            reachable_methods: self.call_graph.reachable_methods().len(),
            reachable_contexts: self.call_graph.reachable_contexts().len(),
            call_edges: self.call_graph.edge_count(),
            pointers: self.pfg.pointer_count(),
            flow_edges: self.pfg.edge_count(),
            objects: self.objects.len(),
            contexts: self.contexts.len(),
            lowered_methods: self.lowering.lowered_count(),
            worklist_peak: self.worklist.peak(),
            diagnostics: self.diagnostics.len(),
            elapsed_ms: start.elapsed().as_millis() as u64,
        };
        info!(
            "Pointer analysis converged: {} iterations, {} reachable methods, {} call edges, {} objects in {}ms",
            stats.iterations, stats.reachable_methods, stats.call_edges, stats.objects, stats.elapsed_ms
        );
        for plugin in &mut self.plugins {
            plugin.on_finish(&stats);
        }

        let (pointers, pts) = self.pfg.into_parts();
        Ok(SolverOutput {
            pointers,
            pts,
            objects: self.objects,
            contexts: self.contexts,
            fields: self.lowering.into_fields(),
            call_graph: self.call_graph,
            diagnostics: self.diagnostics,
            stats,
        })
    }

    fn analyze(&mut self) -> Result<()> {
        while let Some(item) = self.worklist.pop() {
            if self.token.is_cancelled() {
                info!("Pointer analysis cancelled after {} iterations", self.iterations);
                return Err(PtaError::Cancelled);
            }
            self.iterations += 1;

            match item {
                WorkItem::PointsTo { pointer, pts } => {
                    let diff = self.propagate(pointer, &pts);
                    if diff.is_empty() {
                        continue;
                    }
                    if let Pointer::Var { local, ctx } = *self.pfg.pointer(pointer) {
                        self.process_instance(local, ctx, &diff)?;
                    }
                }
                WorkItem::CallEdge(edge) => self.process_call_edge(edge)?,
            }
        }
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Propagation
    // ═══════════════════════════════════════════════════════════════════════

    fn propagate(&mut self, pointer: PointerId, pts: &PointsToSet) -> PointsToSet {
        let diff = self.pfg.points_to_mut(pointer).add_all_diff(pts);
        if diff.is_empty() {
            return diff;
        }

        let p = *self.pfg.pointer(pointer);
        trace!("{:?} += {} objects", p, diff.len());
        for plugin in &mut self.plugins {
            plugin.on_new_points_to(&p, &diff);
        }

        let succs = self.pfg.successors(pointer).to_vec();
        for edge in succs {
            let flowing = self.filter(&diff, edge.filter.as_ref());
            self.worklist.add_points_to(edge.target, flowing);
        }
        diff
    }

    /// Objects of `pts` that may pass a cast to `filter`
    fn filter(&self, pts: &PointsToSet, filter: Option<&ResolvedType>) -> PointsToSet {
        match filter {
            None => pts.clone(),
            Some(ty) => pts.filter(|o| self.hierarchy.is_subtype(&self.objects.get(o).ty, ty)),
        }
    }

    fn add_flow_edge(&mut self, source: Pointer, target: Pointer, filter: Option<ResolvedType>) {
        let source = self.pfg.node(source);
        let target = self.pfg.node(target);
        let edge = FlowEdge {
            target,
            filter: filter.clone(),
        };
        if self.pfg.add_edge(source, edge) {
            let pts = self.pfg.points_to(source);
            if !pts.is_empty() {
                let flowing = self.filter(pts, filter.as_ref());
                self.worklist.add_points_to(target, flowing);
            }
        }
    }

    fn add_points_to(&mut self, pointer: Pointer, obj: ObjId) {
        let id = self.pfg.node(pointer);
        self.worklist.add_points_to(id, PointsToSet::singleton(obj));
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Reachability and calls
    // ═══════════════════════════════════════════════════════════════════════

    /// Admit (method, ctx) and instantiate its context-independent
    /// constraints. Instance constraints wait for their base to grow.
    fn add_reachable(&mut self, method: MethodId, ctx: CtxId) -> Result<()> {
        if !self.call_graph.add_reachable(method, ctx) {
            return Ok(());
        }
        let template = self.lowering.template(method)?;
        debug!(
            "Reachable: {} in {}",
            self.program.method(method).signature(),
            self.contexts.render(ctx)
        );
        for plugin in &mut self.plugins {
            plugin.on_new_method(method, ctx);
        }

        let var = |local: Local| Pointer::var(local, ctx);
        for constraint in &template.constraints {
            match constraint {
                Constraint::Alloc { lhs, site, ty } => {
                    let heap_ctx = self.config.heap_abstraction.heap_context(ctx);
                    let obj = self.objects.intern(*site, ty.clone(), heap_ctx);
                    self.add_points_to(var(*lhs), obj);
                }
                Constraint::AssignNull { lhs } => {
                    let null = self.objects.null_object();
                    self.add_points_to(var(*lhs), null);
                }
                Constraint::Copy { lhs, rhs } => self.add_flow_edge(var(*rhs), var(*lhs), None),
                Constraint::Cast { lhs, rhs, ty } => {
                    self.add_flow_edge(var(*rhs), var(*lhs), Some(ty.clone()))
                }
                Constraint::StaticLoad { lhs, field } => {
                    self.add_flow_edge(Pointer::StaticField { field: *field }, var(*lhs), None)
                }
                Constraint::StaticStore { field, rhs } => {
                    self.add_flow_edge(var(*rhs), Pointer::StaticField { field: *field }, None)
                }
                Constraint::Call(call) => self.process_static_call(call, ctx),
                Constraint::Load { .. }
                | Constraint::Store { .. }
                | Constraint::ArrayLoad { .. }
                | Constraint::ArrayStore { .. } => {}
            }
        }
        Ok(())
    }

    fn process_static_call(&mut self, call: &CallConstraint, ctx: CtxId) {
        match (call.kind, call.target) {
            (_, CallTarget::Unresolved) => self.report(
                DiagnosticKind::UnresolvedCall,
                call.site,
                "no declaration matches the invoked method".to_string(),
            ),
            (InvokeKind::Static, CallTarget::Fixed(callee)) => {
                let callee_ctx = self.config.context_policy.select(
                    &mut self.contexts,
                    &self.objects,
                    ctx,
                    call.site,
                    None,
                );
                self.worklist.add_call_edge(CallEdge {
                    site: call.site,
                    caller_ctx: ctx,
                    callee,
                    callee_ctx,
                    kind: call.kind,
                });
            }
            _ => {}
        }
    }

    /// Re-trigger instance constraints whose base is `local` for the new
    /// objects in `diff`
    fn process_instance(&mut self, local: Local, ctx: CtxId, diff: &PointsToSet) -> Result<()> {
        let method = self.owner(local);
        let template = self.lowering.template(method)?;
        let objects: Vec<ObjId> = diff.iter().filter(|o| !self.objects.get(*o).is_null()).collect();
        if objects.is_empty() {
            return Ok(());
        }

        let var = |local: Local| Pointer::var(local, ctx);
        for &index in template.uses_as_base(local) {
            match &template.constraints[index] {
                Constraint::Load { lhs, field, .. } => {
                    for &obj in &objects {
                        let field = Pointer::InstanceField { obj, field: *field };
                        self.add_flow_edge(field, var(*lhs), None);
                    }
                }
                Constraint::Store { field, rhs, .. } => {
                    for &obj in &objects {
                        let field = Pointer::InstanceField { obj, field: *field };
                        self.add_flow_edge(var(*rhs), field, None);
                    }
                }
                Constraint::ArrayLoad { lhs, .. } => {
                    for &obj in &objects {
                        self.add_flow_edge(Pointer::ArrayIndex { obj }, var(*lhs), None);
                    }
                }
                Constraint::ArrayStore { rhs, .. } => {
                    for &obj in &objects {
                        self.add_flow_edge(var(*rhs), Pointer::ArrayIndex { obj }, None);
                    }
                }
                Constraint::Call(call) => {
                    for &obj in &objects {
                        self.process_instance_call(call, ctx, obj)?;
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn process_instance_call(&mut self, call: &CallConstraint, ctx: CtxId, obj: ObjId) -> Result<()> {
        let callee = match call.target {
            CallTarget::Fixed(callee) => callee,
            CallTarget::Dispatch(sig) => {
                let ty = &self.objects.get(obj).ty;
                let class = match ty {
                    ResolvedType::Class(class) => Some(*class),
                    ResolvedType::Array(_) => self.hierarchy.root(),
                    ResolvedType::Null => None,
                };
                match class.and_then(|c| self.hierarchy.dispatch(c, sig)) {
                    Some(callee) => callee,
                    None => {
                        let message = format!(
                            "receiver type {} has no implementation of the invoked method",
                            self.hierarchy.type_name(ty)
                        );
                        self.report(DiagnosticKind::UnresolvedDispatch, call.site, message);
                        return Ok(());
                    }
                }
            }
            // Reported once when the caller became reachable
            CallTarget::Unresolved => return Ok(()),
        };

        let callee_ctx = self.config.context_policy.select(
            &mut self.contexts,
            &self.objects,
            ctx,
            call.site,
            Some(obj),
        );
        let callee_template = self.lowering.template(callee)?;
        if let Some(this) = callee_template.this {
            self.add_points_to(Pointer::var(this, callee_ctx), obj);
        }
        self.worklist.add_call_edge(CallEdge {
            site: call.site,
            caller_ctx: ctx,
            callee,
            callee_ctx,
            kind: call.kind,
        });
        Ok(())
    }

    fn process_call_edge(&mut self, edge: CallEdge) -> Result<()> {
        if !self.call_graph.add_edge(edge) {
            return Ok(());
        }
        for plugin in &mut self.plugins {
            plugin.on_new_call_edge(&edge);
        }
        self.add_reachable(edge.callee, edge.callee_ctx)?;

        let caller = self.lowering.template(edge.site.method)?;
        let callee = self.lowering.template(edge.callee)?;
        let Some(call) = caller.call_at(edge.site.index) else {
            return Ok(());
        };
        for (arg, param) in call.args.iter().zip(callee.params.iter()) {
            self.add_flow_edge(
                Pointer::var(*arg, edge.caller_ctx),
                Pointer::var(*param, edge.callee_ctx),
                None,
            );
        }
        if let Some(result) = call.result {
            self.add_flow_edge(
                Pointer::var(callee.ret, edge.callee_ctx),
                Pointer::var(result, edge.caller_ctx),
                None,
            );
        }
        Ok(())
    }

    /// Objects for `this` and parameters of an entry method
    fn seed_entry_params(&mut self, entry: MethodId) -> Result<()> {
        let decl = self.program.method(entry);
        let slots = decl.this_var.iter().chain(decl.params.iter()).copied();
        for (slot, var) in slots.enumerate() {
            let var_decl = self.program.var(var);
            let ty = self.hierarchy.resolve_type(&var_decl.ty).ok_or_else(|| {
                PtaError::unresolved_type(var_decl.ty.to_string(), decl.signature())
            })?;
            let mockable = match &ty {
                ResolvedType::Class(class) => self.hierarchy.class(*class).is_concrete(),
                ResolvedType::Array(_) => true,
                ResolvedType::Null => false,
            };
            if !mockable {
                continue;
            }
            let site = AllocSite::EntryMock {
                method: entry,
                param: slot as u32,
            };
            let obj = self.objects.intern(site, ty, CtxId::EMPTY);
            self.add_points_to(Pointer::var(Local::Var(var), CtxId::EMPTY), obj);
        }
        Ok(())
    }

    fn owner(&self, local: Local) -> MethodId {
        match local {
            Local::Var(var) => self.program.var(var).method,
            Local::Return(method) | Local::StubTemp { method, .. } => method,
        }
    }

    fn report(&mut self, kind: DiagnosticKind, site: StmtRef, message: String) {
        let diagnostic = Diagnostic { kind, site, message };
        if self.reported.insert(diagnostic.clone()) {
            warn!("{} ({})", diagnostic, self.program.method(site.method).signature());
            self.diagnostics.push(diagnostic);
        }
    }
}
