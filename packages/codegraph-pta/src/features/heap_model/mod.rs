//! Heap abstraction and context sensitivity policies
//!
//! Both are closed sets of variants chosen once per run through `PtaConfig`.

pub mod context;
pub mod heap;

pub use context::{ContextElem, ContextPolicy, ContextTable, CtxId};
pub use heap::{AbstractObject, AllocSite, HeapAbstraction, ObjId, ObjectTable};
