//! Converged pointer analysis result
//!
//! Immutable after construction and `Sync`, so client analyses can read it
//! from several threads. Queries by variable merge every context the
//! variable's method was analyzed in; `*_in` variants select one context.

use crate::config::PtaConfig;
use crate::features::call_graph::CallGraph;
use crate::features::class_hierarchy::ClassHierarchy;
use crate::features::heap_model::{AbstractObject, AllocSite, ContextTable, CtxId, ObjId, ObjectTable};
use crate::features::points_to::domain::{
    Diagnostic, FieldTable, Local, Pointer, PointerId, PointerTable, PointsToSet,
};
use crate::features::points_to::infrastructure::{SolverOutput, SolverStats};
use crate::shared::models::{FieldRef, MethodId, Program, StmtRef, VarId};
use rustc_hash::FxHashMap;
use std::sync::Arc;

#[derive(Debug)]
pub struct PointerAnalysisResult {
    program: Arc<Program>,
    hierarchy: Arc<ClassHierarchy>,
    config: PtaConfig,
    entries: Vec<MethodId>,
    pointers: PointerTable,
    pts: Vec<PointsToSet>,
    objects: ObjectTable,
    contexts: ContextTable,
    fields: FieldTable,
    call_graph: CallGraph,
    diagnostics: Vec<Diagnostic>,
    stats: SolverStats,
    locals: FxHashMap<Local, Vec<PointerId>>,
    null_object: Option<ObjId>,
    empty: PointsToSet,
}

impl PointerAnalysisResult {
    pub(crate) fn new(
        program: Arc<Program>,
        hierarchy: Arc<ClassHierarchy>,
        config: PtaConfig,
        entries: Vec<MethodId>,
        output: SolverOutput,
    ) -> Self {
        let mut locals: FxHashMap<Local, Vec<PointerId>> = FxHashMap::default();
        for (id, pointer) in output.pointers.iter() {
            if let Pointer::Var { local, .. } = pointer {
                locals.entry(*local).or_default().push(id);
            }
        }
        let null_object = output
            .objects
            .iter()
            .find(|(_, o)| o.is_null())
            .map(|(id, _)| id);

        Self {
            program,
            hierarchy,
            config,
            entries,
            pointers: output.pointers,
            pts: output.pts,
            objects: output.objects,
            contexts: output.contexts,
            fields: output.fields,
            call_graph: output.call_graph,
            diagnostics: output.diagnostics,
            stats: output.stats,
            locals,
            null_object,
            empty: PointsToSet::new(),
        }
    }

    #[inline]
    pub fn program(&self) -> &Program {
        &self.program
    }

    #[inline]
    pub fn hierarchy(&self) -> &ClassHierarchy {
        &self.hierarchy
    }

    #[inline]
    pub fn config(&self) -> &PtaConfig {
        &self.config
    }

    #[inline]
    pub fn entry_methods(&self) -> &[MethodId] {
        &self.entries
    }

    #[inline]
    pub fn call_graph(&self) -> &CallGraph {
        &self.call_graph
    }

    #[inline]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    #[inline]
    pub fn stats(&self) -> &SolverStats {
        &self.stats
    }

    #[inline]
    pub fn objects(&self) -> &ObjectTable {
        &self.objects
    }

    #[inline]
    pub fn object(&self, obj: ObjId) -> &AbstractObject {
        self.objects.get(obj)
    }

    #[inline]
    pub fn context_table(&self) -> &ContextTable {
        &self.contexts
    }

    /// The null object, if any `x = null` was reachable
    #[inline]
    pub fn null_object(&self) -> Option<ObjId> {
        self.null_object
    }

    #[inline]
    pub fn is_null(&self, obj: ObjId) -> bool {
        self.null_object == Some(obj)
    }

    /// Points-to set of any pointer; empty if the solver never created it
    pub fn pointer_points_to(&self, pointer: &Pointer) -> &PointsToSet {
        self.pointers
            .get(pointer)
            .map_or(&self.empty, |id| &self.pts[id.index()])
    }

    /// Every pointer with its converged set
    pub fn pointers(&self) -> impl Iterator<Item = (&Pointer, &PointsToSet)> {
        self.pointers
            .iter()
            .map(move |(id, pointer)| (pointer, &self.pts[id.index()]))
    }

    fn local_points_to(&self, local: Local) -> PointsToSet {
        let mut merged = PointsToSet::new();
        for id in self.locals.get(&local).into_iter().flatten() {
            merged.add_all_diff(&self.pts[id.index()]);
        }
        merged
    }

    /// Objects a variable may point to, over all contexts
    pub fn points_to(&self, var: VarId) -> PointsToSet {
        self.local_points_to(Local::Var(var))
    }

    /// Objects a variable may point to under one context
    pub fn points_to_in(&self, var: VarId, ctx: CtxId) -> &PointsToSet {
        self.pointer_points_to(&Pointer::var(Local::Var(var), ctx))
    }

    /// Objects a method may return, over all contexts
    pub fn return_points_to(&self, method: MethodId) -> PointsToSet {
        self.local_points_to(Local::Return(method))
    }

    /// Whether two variables may refer to the same non-null object
    pub fn may_alias(&self, a: VarId, b: VarId) -> bool {
        let a = self.points_to(a);
        let b = self.points_to(b);
        let aliased = a.iter().any(|o| !self.is_null(o) && b.contains(o));
        aliased
    }

    /// Objects stored in instance field `field` of `obj`
    pub fn field_points_to(&self, obj: ObjId, field: &str) -> &PointsToSet {
        match self.fields.lookup_instance(field) {
            Some(field) => self.pointer_points_to(&Pointer::InstanceField { obj, field }),
            None => &self.empty,
        }
    }

    pub fn static_field_points_to(&self, field: &FieldRef) -> &PointsToSet {
        match self.fields.lookup_static(field) {
            Some(field) => self.pointer_points_to(&Pointer::StaticField { field }),
            None => &self.empty,
        }
    }

    /// Objects stored in the elements of array object `obj`
    pub fn array_points_to(&self, obj: ObjId) -> &PointsToSet {
        self.pointer_points_to(&Pointer::ArrayIndex { obj })
    }

    /// Contexts a method was analyzed in; empty if unreachable
    pub fn contexts_of(&self, method: MethodId) -> Vec<CtxId> {
        self.call_graph.contexts_of(method)
    }

    /// Resolved targets of a call site, all contexts merged
    pub fn callees_of(&self, site: StmtRef) -> Vec<MethodId> {
        self.call_graph.callees_of(site)
    }

    /// Objects allocated at a `new` statement, one per heap context
    pub fn objects_at(&self, site: StmtRef) -> Vec<ObjId> {
        self.objects
            .iter()
            .filter(|(_, o)| o.site == AllocSite::Stmt(site))
            .map(|(id, _)| id)
            .collect()
    }

    /// Human-readable object description, e.g. `new B@Main.main()V#1`
    pub fn describe_object(&self, obj: ObjId) -> String {
        let object = self.objects.get(obj);
        let ty = self.hierarchy.type_name(&object.ty);
        let site = match object.site {
            AllocSite::Stmt(site) => {
                format!("new {}@{}#{}", ty, self.program.method(site.method).signature(), site.index)
            }
            AllocSite::Stub { method, index } => {
                format!("new {}@stub:{}#{}", ty, self.program.method(method).signature(), index)
            }
            AllocSite::EntryMock { method, param } => {
                format!("mock {}@{}#{}", ty, self.program.method(method).signature(), param)
            }
            AllocSite::Null => return "null".to_string(),
        };
        if object.heap_ctx == CtxId::EMPTY {
            site
        } else {
            format!("{}{}", site, self.contexts.render(object.heap_ctx))
        }
    }

    /// Human-readable pointer description
    pub fn describe_pointer(&self, pointer: &Pointer) -> String {
        match pointer {
            Pointer::Var { local, ctx } => {
                let name = match local {
                    Local::Var(var) => {
                        let decl = self.program.var(*var);
                        format!("{}/{}", self.program.method(decl.method).signature(), decl.name)
                    }
                    Local::Return(method) => {
                        format!("{}/<return>", self.program.method(*method).signature())
                    }
                    Local::StubTemp { method, index } => {
                        format!("{}/<temp{}>", self.program.method(*method).signature(), index)
                    }
                };
                format!("{}{}", name, self.contexts.render(*ctx))
            }
            Pointer::InstanceField { obj, field } => {
                format!("{}.{}", self.describe_object(*obj), self.fields.name(*field))
            }
            Pointer::StaticField { field } => self.fields.name(*field).to_string(),
            Pointer::ArrayIndex { obj } => format!("{}[*]", self.describe_object(*obj)),
        }
    }
}
