//! Points-to Analysis Constraints
//!
//! Method bodies and library stubs are lowered into one vocabulary:
//! - ALLOC:  x = new T()      → x ⊇ {o}
//! - COPY:   x = y            → x ⊇ y
//! - CAST:   x = (T) y        → x ⊇ { o ∈ y | type(o) <: T }
//! - LOAD:   x = y.f          → ∀o ∈ y: x ⊇ o.f
//! - STORE:  y.f = x          → ∀o ∈ y: o.f ⊇ x
//! - ARRAY:  same as LOAD/STORE on the merged element slot
//! - STATIC: x = C.f / C.f = x
//! - CALL:   resolved statically or per receiver object
//!
//! Constraints are context-free; the solver instantiates them per context
//! when a method becomes reachable.

use super::pointer::{FieldId, Local};
use crate::features::class_hierarchy::{ResolvedType, SigId};
use crate::features::heap_model::AllocSite;
use crate::shared::models::{InvokeKind, MethodId, StmtRef};
use serde::{Deserialize, Serialize};

/// Call target as far as it is known before solving
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallTarget {
    /// Static and special calls
    Fixed(MethodId),
    /// Virtual and interface calls, dispatched per receiver object
    Dispatch(SigId),
    /// The referenced method does not exist anywhere in the hierarchy
    Unresolved,
}

/// A call site after lowering
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallConstraint {
    pub site: StmtRef,
    pub kind: InvokeKind,
    pub target: CallTarget,
    pub receiver: Option<Local>,
    pub args: Vec<Local>,
    pub result: Option<Local>,
}

impl CallConstraint {
    /// Whether edges are created per receiver object
    #[inline]
    pub fn is_instance(&self) -> bool {
        self.kind.has_receiver()
    }
}

/// Lowered constraint
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Constraint {
    Alloc { lhs: Local, site: AllocSite, ty: ResolvedType },
    AssignNull { lhs: Local },
    Copy { lhs: Local, rhs: Local },
    Cast { lhs: Local, rhs: Local, ty: ResolvedType },
    Load { lhs: Local, base: Local, field: FieldId },
    Store { base: Local, field: FieldId, rhs: Local },
    StaticLoad { lhs: Local, field: FieldId },
    StaticStore { field: FieldId, rhs: Local },
    ArrayLoad { lhs: Local, base: Local },
    ArrayStore { base: Local, rhs: Local },
    Call(CallConstraint),
}

impl Constraint {
    /// Local whose points-to growth re-triggers this constraint
    pub fn base(&self) -> Option<Local> {
        match self {
            Constraint::Load { base, .. }
            | Constraint::Store { base, .. }
            | Constraint::ArrayLoad { base, .. }
            | Constraint::ArrayStore { base, .. } => Some(*base),
            Constraint::Call(call) if call.is_instance() => call.receiver,
            _ => None,
        }
    }

    pub fn as_call(&self) -> Option<&CallConstraint> {
        match self {
            Constraint::Call(call) => Some(call),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Constraint::Alloc { .. } => "ALLOC",
            Constraint::AssignNull { .. } => "NULL",
            Constraint::Copy { .. } => "COPY",
            Constraint::Cast { .. } => "CAST",
            Constraint::Load { .. } => "LOAD",
            Constraint::Store { .. } => "STORE",
            Constraint::StaticLoad { .. } => "STATIC_LOAD",
            Constraint::StaticStore { .. } => "STATIC_STORE",
            Constraint::ArrayLoad { .. } => "ARRAY_LOAD",
            Constraint::ArrayStore { .. } => "ARRAY_STORE",
            Constraint::Call(_) => "CALL",
        }
    }
}
