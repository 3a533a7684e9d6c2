//! Solver worklist
//!
//! FIFO queue of pending points-to deltas and call edges. Processing order
//! only affects how often pointers are revisited, never the fixed point.

use crate::features::call_graph::CallEdge;
use crate::features::points_to::domain::{PointerId, PointsToSet};
use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub enum WorkItem {
    /// `pts` must be added to the pointer's set
    PointsTo { pointer: PointerId, pts: PointsToSet },
    /// Call edge waiting to be admitted
    CallEdge(CallEdge),
}

#[derive(Debug, Default)]
pub struct WorkList {
    queue: VecDeque<WorkItem>,
    peak: usize,
}

impl WorkList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_points_to(&mut self, pointer: PointerId, pts: PointsToSet) {
        if !pts.is_empty() {
            self.push(WorkItem::PointsTo { pointer, pts });
        }
    }

    pub fn add_call_edge(&mut self, edge: CallEdge) {
        self.push(WorkItem::CallEdge(edge));
    }

    fn push(&mut self, item: WorkItem) {
        self.queue.push_back(item);
        self.peak = self.peak.max(self.queue.len());
    }

    #[inline]
    pub fn pop(&mut self) -> Option<WorkItem> {
        self.queue.pop_front()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Largest queue length seen
    #[inline]
    pub fn peak(&self) -> usize {
        self.peak
    }
}
