//! Points-to Sets
//!
//! Sorted vector of object ids. Solving only ever adds objects, and the
//! solver needs the newly added part of every union to propagate deltas, so
//! the central operation is `add_all_diff`.
//!
//! # Performance Characteristics
//! - Insert: O(n) worst case, O(log n) when present
//! - Contains: O(log n)
//! - Union with diff: O(n + m) merge

use crate::features::heap_model::ObjId;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Set of abstract objects, kept sorted and deduplicated
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PointsToSet {
    elements: Vec<ObjId>,
}

impl PointsToSet {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn singleton(obj: ObjId) -> Self {
        Self {
            elements: vec![obj],
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    #[inline]
    pub fn contains(&self, obj: ObjId) -> bool {
        self.elements.binary_search(&obj).is_ok()
    }

    /// Insert an element. Returns true if it was not present.
    pub fn insert(&mut self, obj: ObjId) -> bool {
        match self.elements.binary_search(&obj) {
            Ok(_) => false,
            Err(pos) => {
                self.elements.insert(pos, obj);
                true
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = ObjId> + '_ {
        self.elements.iter().copied()
    }

    #[inline]
    pub fn as_slice(&self) -> &[ObjId] {
        &self.elements
    }

    /// Union `other` into `self`, returning the objects that were new
    pub fn add_all_diff(&mut self, other: &PointsToSet) -> PointsToSet {
        if other.is_empty() {
            return PointsToSet::new();
        }
        if self.is_empty() {
            self.elements = other.elements.clone();
            return other.clone();
        }

        // Merge two sorted arrays, collecting the right-only part
        let mut merged = Vec::with_capacity(self.elements.len() + other.elements.len());
        let mut diff = Vec::new();
        let mut i = 0;
        let mut j = 0;
        while i < self.elements.len() && j < other.elements.len() {
            match self.elements[i].cmp(&other.elements[j]) {
                Ordering::Less => {
                    merged.push(self.elements[i]);
                    i += 1;
                }
                Ordering::Greater => {
                    merged.push(other.elements[j]);
                    diff.push(other.elements[j]);
                    j += 1;
                }
                Ordering::Equal => {
                    merged.push(self.elements[i]);
                    i += 1;
                    j += 1;
                }
            }
        }
        merged.extend_from_slice(&self.elements[i..]);
        merged.extend_from_slice(&other.elements[j..]);
        diff.extend_from_slice(&other.elements[j..]);

        if !diff.is_empty() {
            self.elements = merged;
        }
        PointsToSet { elements: diff }
    }

    /// Check if any element is shared
    pub fn intersects(&self, other: &PointsToSet) -> bool {
        let (mut i, mut j) = (0, 0);
        while i < self.elements.len() && j < other.elements.len() {
            match self.elements[i].cmp(&other.elements[j]) {
                Ordering::Less => i += 1,
                Ordering::Greater => j += 1,
                Ordering::Equal => return true,
            }
        }
        false
    }

    pub fn is_subset(&self, other: &PointsToSet) -> bool {
        self.elements.iter().all(|o| other.contains(*o))
    }

    /// Keep only elements satisfying the predicate
    pub fn filter(&self, mut keep: impl FnMut(ObjId) -> bool) -> PointsToSet {
        PointsToSet {
            elements: self.elements.iter().copied().filter(|o| keep(*o)).collect(),
        }
    }
}

impl FromIterator<ObjId> for PointsToSet {
    fn from_iter<I: IntoIterator<Item = ObjId>>(iter: I) -> Self {
        let mut elements: Vec<ObjId> = iter.into_iter().collect();
        elements.sort_unstable();
        elements.dedup();
        Self { elements }
    }
}
