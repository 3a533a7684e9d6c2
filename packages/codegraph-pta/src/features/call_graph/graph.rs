//! Call Graph with petgraph
//!
//! Context-sensitive call graph built on the fly by the solver:
//! - Nodes are reachable (method, context) pairs
//! - Edges go from (call site, caller context) to (callee, callee context)
//!
//! The solver is the only writer. Nothing is ever removed, so after
//! convergence the graph is a plain read-only index. `to_petgraph` gives the
//! context-insensitive projection for SCC and export.

use crate::features::class_hierarchy::ClassHierarchy;
use crate::features::heap_model::CtxId;
use crate::features::stubs::{StubConstraint, StubModel};
use crate::shared::models::{InvokeKind, MethodId, MethodSig, Program, StmtRef};
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

/// (call site, caller context) → (callee, callee context)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CallEdge {
    pub site: StmtRef,
    pub caller_ctx: CtxId,
    pub callee: MethodId,
    pub callee_ctx: CtxId,
    pub kind: InvokeKind,
}

impl CallEdge {
    #[inline]
    pub fn caller(&self) -> MethodId {
        self.site.method
    }
}

/// Instance call edge whose target dispatch could never select
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchViolation {
    pub edge: CallEdge,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct CallGraph {
    reachable: FxHashSet<(MethodId, CtxId)>,
    reachable_order: Vec<(MethodId, CtxId)>,
    methods: FxHashSet<MethodId>,
    method_order: Vec<MethodId>,
    edge_set: FxHashSet<CallEdge>,
    edges: Vec<CallEdge>,
    by_site: FxHashMap<StmtRef, Vec<usize>>,
    by_callee: FxHashMap<MethodId, Vec<usize>>,
}

impl CallGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark (method, ctx) reachable. Returns true if it is new.
    pub fn add_reachable(&mut self, method: MethodId, ctx: CtxId) -> bool {
        if !self.reachable.insert((method, ctx)) {
            return false;
        }
        self.reachable_order.push((method, ctx));
        if self.methods.insert(method) {
            self.method_order.push(method);
        }
        true
    }

    /// Record an edge. Returns true if it is new.
    pub fn add_edge(&mut self, edge: CallEdge) -> bool {
        if !self.edge_set.insert(edge) {
            return false;
        }
        let index = self.edges.len();
        self.edges.push(edge);
        self.by_site.entry(edge.site).or_default().push(index);
        self.by_callee.entry(edge.callee).or_default().push(index);
        true
    }

    #[inline]
    pub fn is_reachable(&self, method: MethodId) -> bool {
        self.methods.contains(&method)
    }

    #[inline]
    pub fn is_reachable_in(&self, method: MethodId, ctx: CtxId) -> bool {
        self.reachable.contains(&(method, ctx))
    }

    /// Reachable methods in discovery order (context-insensitive)
    #[inline]
    pub fn reachable_methods(&self) -> &[MethodId] {
        &self.method_order
    }

    /// Reachable (method, context) pairs in discovery order
    #[inline]
    pub fn reachable_contexts(&self) -> &[(MethodId, CtxId)] {
        &self.reachable_order
    }

    pub fn contexts_of(&self, method: MethodId) -> Vec<CtxId> {
        self.reachable_order
            .iter()
            .filter(|(m, _)| *m == method)
            .map(|(_, ctx)| *ctx)
            .collect()
    }

    #[inline]
    pub fn edges(&self) -> &[CallEdge] {
        &self.edges
    }

    #[inline]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Resolved targets of a call site, all contexts merged
    pub fn callees_of(&self, site: StmtRef) -> Vec<MethodId> {
        let mut callees: Vec<MethodId> = self
            .edges_at(site)
            .map(|e| e.callee)
            .collect();
        callees.sort_unstable();
        callees.dedup();
        callees
    }

    /// Edges of a call site under one caller context
    pub fn edges_in_context(&self, site: StmtRef, ctx: CtxId) -> Vec<CallEdge> {
        self.edges_at(site).filter(|e| e.caller_ctx == ctx).collect()
    }

    fn edges_at(&self, site: StmtRef) -> impl Iterator<Item = CallEdge> + '_ {
        self.by_site
            .get(&site)
            .into_iter()
            .flatten()
            .map(|&i| self.edges[i])
    }

    /// Predecessors of a method: (call site, caller context) pairs
    pub fn callers_of(&self, method: MethodId) -> Vec<(StmtRef, CtxId)> {
        let mut callers: Vec<(StmtRef, CtxId)> = self
            .by_callee
            .get(&method)
            .into_iter()
            .flatten()
            .map(|&i| (self.edges[i].site, self.edges[i].caller_ctx))
            .collect();
        callers.sort_unstable();
        callers.dedup();
        callers
    }

    /// Every instance-call edge must target a method that dispatch could
    /// select for some concrete subtype of the site's static receiver type.
    pub fn check_dispatch(
        &self,
        program: &Program,
        hierarchy: &ClassHierarchy,
        stubs: &StubModel,
    ) -> Vec<DispatchViolation> {
        let mut violations = Vec::new();
        let mut candidates_cache: FxHashMap<StmtRef, Option<Vec<MethodId>>> = FxHashMap::default();

        for edge in self.edges.iter().filter(|e| e.kind.is_dynamic()) {
            let candidates = candidates_cache.entry(edge.site).or_insert_with(|| {
                let (class, sig) = site_target(program, stubs, edge.site)?;
                let class = hierarchy.class_id(&class)?;
                let sig = hierarchy.sig_id(&sig)?;
                let mut targets = hierarchy.virtual_candidates(class, sig);
                // Arrays dispatch through the root class
                if let Some(root) = hierarchy.root() {
                    if class == root || hierarchy.class(class).is_interface {
                        targets.extend(hierarchy.dispatch(root, sig));
                    }
                }
                Some(targets)
            });

            match candidates {
                None => violations.push(DispatchViolation {
                    edge: *edge,
                    reason: "call site has no resolvable static target".to_string(),
                }),
                Some(targets) if !targets.contains(&edge.callee) => {
                    violations.push(DispatchViolation {
                        edge: *edge,
                        reason: format!(
                            "{} is not a dispatch candidate of the static receiver type",
                            program.method(edge.callee).signature()
                        ),
                    })
                }
                Some(_) => {}
            }
        }
        violations
    }

    /// Context-insensitive projection: one node per reachable method, one
    /// edge per (caller, callee, site)
    pub fn to_petgraph(&self) -> (DiGraph<MethodId, StmtRef>, FxHashMap<MethodId, NodeIndex>) {
        let mut graph = DiGraph::new();
        let mut nodes = FxHashMap::default();
        for &method in &self.method_order {
            nodes.insert(method, graph.add_node(method));
        }

        let mut seen = FxHashSet::default();
        for edge in &self.edges {
            if !seen.insert((edge.site, edge.callee)) {
                continue;
            }
            if let (Some(&from), Some(&to)) = (nodes.get(&edge.caller()), nodes.get(&edge.callee)) {
                graph.add_edge(from, to, edge.site);
            }
        }
        (graph, nodes)
    }

    /// Methods on a call-graph cycle (Tarjan SCC), sorted
    pub fn recursive_methods(&self) -> Vec<MethodId> {
        let (graph, _) = self.to_petgraph();
        let mut recursive: Vec<MethodId> = tarjan_scc(&graph)
            .into_iter()
            .filter(|scc| scc.len() > 1 || graph.contains_edge(scc[0], scc[0]))
            .flat_map(|scc| scc.into_iter().map(|idx| graph[idx]))
            .collect();
        recursive.sort_unstable();
        recursive
    }
}

/// Static receiver class and signature of an instance call site
fn site_target(program: &Program, stubs: &StubModel, site: StmtRef) -> Option<(String, MethodSig)> {
    let decl = program.method(site.method);
    if let Some(stub) = stubs.stub_for(&decl.signature()) {
        return match stub.get(site.index as usize)? {
            StubConstraint::CallsBack { class, method, .. } => Some((class.clone(), method.clone())),
            _ => None,
        };
    }
    let invoke = decl.body.as_ref()?.stmts.get(site.index as usize)?.as_invoke()?;
    Some((invoke.method.class.clone(), invoke.method.sig.clone()))
}
