//! Pointer Flow Graph
//!
//! Points-to sets per pointer plus subset edges between pointers. Both only
//! grow. An edge may carry a type filter (casts): only objects assignable to
//! the filter type flow along it.

use crate::features::class_hierarchy::ResolvedType;
use crate::features::points_to::domain::{Pointer, PointerId, PointerTable, PointsToSet};
use rustc_hash::FxHashSet;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FlowEdge {
    pub target: PointerId,
    pub filter: Option<ResolvedType>,
}

#[derive(Debug, Default)]
pub struct PointerFlowGraph {
    pointers: PointerTable,
    pts: Vec<PointsToSet>,
    succs: Vec<Vec<FlowEdge>>,
    edge_set: FxHashSet<(PointerId, FlowEdge)>,
}

impl PointerFlowGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Node for a pointer, created empty on first use
    pub fn node(&mut self, pointer: Pointer) -> PointerId {
        let (id, created) = self.pointers.get_or_insert(pointer);
        if created {
            self.pts.push(PointsToSet::new());
            self.succs.push(Vec::new());
        }
        id
    }

    #[inline]
    pub fn pointer(&self, id: PointerId) -> &Pointer {
        self.pointers.pointer(id)
    }

    #[inline]
    pub fn points_to(&self, id: PointerId) -> &PointsToSet {
        &self.pts[id.index()]
    }

    #[inline]
    pub fn points_to_mut(&mut self, id: PointerId) -> &mut PointsToSet {
        &mut self.pts[id.index()]
    }

    /// Add `source → edge.target`. Returns false if it already existed.
    pub fn add_edge(&mut self, source: PointerId, edge: FlowEdge) -> bool {
        if !self.edge_set.insert((source, edge.clone())) {
            return false;
        }
        self.succs[source.index()].push(edge);
        true
    }

    #[inline]
    pub fn successors(&self, id: PointerId) -> &[FlowEdge] {
        &self.succs[id.index()]
    }

    #[inline]
    pub fn pointer_count(&self) -> usize {
        self.pointers.len()
    }

    #[inline]
    pub fn edge_count(&self) -> usize {
        self.edge_set.len()
    }

    /// Hand the converged tables to the result
    pub fn into_parts(self) -> (PointerTable, Vec<PointsToSet>) {
        (self.pointers, self.pts)
    }
}
