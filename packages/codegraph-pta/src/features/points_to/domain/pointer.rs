//! Pointers of the analysis
//!
//! A pointer is either a local (variable, return slot or stub temporary)
//! under a context, or an abstract location inside an object: an instance
//! field, the merged elements of an array, or a static field.
//!
//! Identity is structural; the `PointerTable` interns each pointer once per
//! run into a dense `PointerId`.

use crate::features::heap_model::{CtxId, ObjId};
use crate::shared::models::{FieldRef, MethodId, VarId};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Context-free local storage of a method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Local {
    /// Declared variable (parameters and `this` included)
    Var(VarId),
    /// Merged return value of a method
    Return(MethodId),
    /// Temporary introduced by a library stub
    StubTemp { method: MethodId, index: u32 },
}

/// Interned field identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FieldId(pub u32);

/// Field interner.
///
/// Instance fields are keyed by name alone: the program model carries no
/// field declarations, so an access written as `B.f` has to meet `A.f` when
/// `B` inherits `f` from `A`. Static fields are keyed by owner and name.
#[derive(Debug, Clone, Default)]
pub struct FieldTable {
    names: Vec<String>,
    instance: FxHashMap<String, FieldId>,
    statics: FxHashMap<FieldRef, FieldId>,
}

impl FieldTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn instance_field(&mut self, field: &FieldRef) -> FieldId {
        if let Some(&id) = self.instance.get(&field.name) {
            return id;
        }
        let id = FieldId(self.names.len() as u32);
        self.names.push(field.name.clone());
        self.instance.insert(field.name.clone(), id);
        id
    }

    pub fn static_field(&mut self, field: &FieldRef) -> FieldId {
        if let Some(&id) = self.statics.get(field) {
            return id;
        }
        let id = FieldId(self.names.len() as u32);
        self.names.push(field.to_string());
        self.statics.insert(field.clone(), id);
        id
    }

    pub fn lookup_instance(&self, name: &str) -> Option<FieldId> {
        self.instance.get(name).copied()
    }

    pub fn lookup_static(&self, field: &FieldRef) -> Option<FieldId> {
        self.statics.get(field).copied()
    }

    #[inline]
    pub fn name(&self, field: FieldId) -> &str {
        &self.names[field.0 as usize]
    }
}

/// A node of the pointer flow graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Pointer {
    Var { local: Local, ctx: CtxId },
    InstanceField { obj: ObjId, field: FieldId },
    StaticField { field: FieldId },
    ArrayIndex { obj: ObjId },
}

impl Pointer {
    #[inline]
    pub fn var(local: Local, ctx: CtxId) -> Self {
        Pointer::Var { local, ctx }
    }
}

/// Unique identifier for pointers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PointerId(pub u32);

impl PointerId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Run-scoped pointer interner
#[derive(Debug, Clone, Default)]
pub struct PointerTable {
    pointers: Vec<Pointer>,
    index: FxHashMap<Pointer, PointerId>,
}

impl PointerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a pointer. Returns the id and whether it was created.
    pub fn get_or_insert(&mut self, pointer: Pointer) -> (PointerId, bool) {
        if let Some(&id) = self.index.get(&pointer) {
            return (id, false);
        }
        let id = PointerId(self.pointers.len() as u32);
        self.pointers.push(pointer);
        self.index.insert(pointer, id);
        (id, true)
    }

    #[inline]
    pub fn get(&self, pointer: &Pointer) -> Option<PointerId> {
        self.index.get(pointer).copied()
    }

    #[inline]
    pub fn pointer(&self, id: PointerId) -> &Pointer {
        &self.pointers[id.index()]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.pointers.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pointers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PointerId, &Pointer)> {
        self.pointers
            .iter()
            .enumerate()
            .map(|(i, p)| (PointerId(i as u32), p))
    }
}
