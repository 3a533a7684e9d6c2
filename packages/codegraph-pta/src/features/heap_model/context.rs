//! Analysis Contexts and Context Sensitivity Policies
//!
//! A context is a k-limited string of context elements:
//! - **Call-site sensitivity (k-CFA)**: the k most recent call sites
//! - **Object sensitivity**: allocation sites of the receiver object and of
//!   the objects it was allocated under
//!
//! Contexts are interned per run into dense `CtxId`s. The element domain is
//! finite (statements of the program), so with a bounded `k` the context
//! domain is finite too.
//!
//! # References
//! - Milanova et al. "Parameterized Object Sensitivity" (TOSEM 2005)
//! - Smaragdakis et al. "Pick Your Contexts Well" (POPL 2011)

use super::heap::{AllocSite, ObjId, ObjectTable};
use crate::shared::models::StmtRef;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Interned context; `CtxId::EMPTY` is the sentinel context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CtxId(pub u32);

impl CtxId {
    pub const EMPTY: CtxId = CtxId(0);

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// One element of a context string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ContextElem {
    CallSite(StmtRef),
    AllocSite(AllocSite),
}

impl fmt::Display for ContextElem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextElem::CallSite(site) => write!(f, "call@{}", site),
            ContextElem::AllocSite(site) => write!(f, "obj@{}", site),
        }
    }
}

/// Run-scoped context interner
#[derive(Debug, Clone)]
pub struct ContextTable {
    contexts: Vec<Vec<ContextElem>>,
    index: FxHashMap<Vec<ContextElem>, CtxId>,
}

impl Default for ContextTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextTable {
    pub fn new() -> Self {
        let mut index = FxHashMap::default();
        index.insert(Vec::new(), CtxId::EMPTY);
        Self {
            contexts: vec![Vec::new()],
            index,
        }
    }

    pub fn intern(&mut self, elems: Vec<ContextElem>) -> CtxId {
        if let Some(&id) = self.index.get(&elems) {
            return id;
        }
        let id = CtxId(self.contexts.len() as u32);
        self.contexts.push(elems.clone());
        self.index.insert(elems, id);
        id
    }

    #[inline]
    pub fn elems(&self, ctx: CtxId) -> &[ContextElem] {
        &self.contexts[ctx.index()]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        // The empty context is always present
        false
    }

    /// `base` extended by `elem`, keeping the last `k` elements
    pub fn append(&mut self, base: CtxId, elem: ContextElem, k: usize) -> CtxId {
        let mut elems = self.elems(base).to_vec();
        elems.push(elem);
        if elems.len() > k {
            elems.drain(..elems.len() - k);
        }
        self.intern(elems)
    }

    /// Human-readable rendering, e.g. `[call@m0#3, obj@m1#0]`
    pub fn render(&self, ctx: CtxId) -> String {
        let parts: Vec<String> = self.elems(ctx).iter().map(ToString::to_string).collect();
        format!("[{}]", parts.join(", "))
    }
}

/// Context sensitivity policy, selected once per run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContextPolicy {
    /// Single global context
    #[default]
    Insensitive,

    /// Last `k` call sites
    CallSite { k: usize },

    /// Last `k` receiver allocation sites
    Object { k: usize },
}

impl ContextPolicy {
    /// Context depth bound, `None` for the insensitive policy
    pub fn depth(&self) -> Option<usize> {
        match self {
            ContextPolicy::Insensitive => None,
            ContextPolicy::CallSite { k } | ContextPolicy::Object { k } => Some(*k),
        }
    }

    /// Callee context for a call from `caller` at `site`. `receiver` is the
    /// receiver object for instance calls and `None` for static calls.
    pub fn select(
        &self,
        contexts: &mut ContextTable,
        objects: &ObjectTable,
        caller: CtxId,
        site: StmtRef,
        receiver: Option<ObjId>,
    ) -> CtxId {
        match *self {
            ContextPolicy::Insensitive => CtxId::EMPTY,
            ContextPolicy::CallSite { k } => contexts.append(caller, ContextElem::CallSite(site), k),
            ContextPolicy::Object { k } => match receiver {
                Some(obj) => {
                    let obj = objects.get(obj);
                    contexts.append(obj.heap_ctx, ContextElem::AllocSite(obj.site), k)
                }
                None => caller,
            },
        }
    }
}

impl fmt::Display for ContextPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextPolicy::Insensitive => write!(f, "ci"),
            ContextPolicy::CallSite { k } => write!(f, "{}-call", k),
            ContextPolicy::Object { k } => write!(f, "{}-obj", k),
        }
    }
}
