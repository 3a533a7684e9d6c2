//! Heap Abstraction
//!
//! Concrete heap objects are abstracted to their allocation site, optionally
//! paired with a heap context. `new T()` at one statement is one abstract
//! object under the insensitive abstraction, and one per context of the
//! allocating method under the sensitive one.

use super::context::CtxId;
use crate::features::class_hierarchy::ResolvedType;
use crate::shared::models::{MethodId, StmtRef};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for abstract objects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjId(pub u32);

impl ObjId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Where an abstract object comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AllocSite {
    /// `new` statement in a method body
    Stmt(StmtRef),

    /// `Allocates` constraint `index` of a library stub
    Stub { method: MethodId, index: u32 },

    /// Object supplied for slot `param` of an entry method. Slots number
    /// `this` first when the method has one, then the parameters, so in a
    /// static entry slot 0 is the first parameter.
    EntryMock { method: MethodId, param: u32 },

    /// The `null` literal
    Null,
}

impl fmt::Display for AllocSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocSite::Stmt(site) => write!(f, "{}", site),
            AllocSite::Stub { method, index } => write!(f, "m{}$stub{}", method.0, index),
            AllocSite::EntryMock { method, param } => write!(f, "m{}$mock{}", method.0, param),
            AllocSite::Null => write!(f, "null"),
        }
    }
}

/// Heap abstraction policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeapAbstraction {
    /// One object per allocation site. Paired with an object-sensitive
    /// policy this merges allocations made under different receivers.
    #[default]
    Insensitive,

    /// One object per (allocation site, allocating method context)
    Sensitive,
}

impl HeapAbstraction {
    /// Heap context for an allocation performed under `method_ctx`
    #[inline]
    pub fn heap_context(self, method_ctx: CtxId) -> CtxId {
        match self {
            HeapAbstraction::Insensitive => CtxId::EMPTY,
            HeapAbstraction::Sensitive => method_ctx,
        }
    }
}

/// Abstract object: allocation site, type and heap context
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AbstractObject {
    pub site: AllocSite,
    pub ty: ResolvedType,
    pub heap_ctx: CtxId,
}

impl AbstractObject {
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self.site, AllocSite::Null)
    }
}

/// Run-scoped object interner
#[derive(Debug, Clone, Default)]
pub struct ObjectTable {
    objects: Vec<AbstractObject>,
    index: FxHashMap<(AllocSite, CtxId), ObjId>,
}

impl ObjectTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Object for `site` under `heap_ctx`. The type is fixed by the site, so
    /// it is recorded on first creation only.
    pub fn intern(&mut self, site: AllocSite, ty: ResolvedType, heap_ctx: CtxId) -> ObjId {
        let next = ObjId(self.objects.len() as u32);
        let id = *self.index.entry((site, heap_ctx)).or_insert(next);
        if id == next {
            self.objects.push(AbstractObject { site, ty, heap_ctx });
        }
        id
    }

    /// The single null object
    pub fn null_object(&mut self) -> ObjId {
        self.intern(AllocSite::Null, ResolvedType::Null, CtxId::EMPTY)
    }

    #[inline]
    pub fn get(&self, id: ObjId) -> &AbstractObject {
        &self.objects[id.index()]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ObjId, &AbstractObject)> {
        self.objects
            .iter()
            .enumerate()
            .map(|(i, o)| (ObjId(i as u32), o))
    }
}
