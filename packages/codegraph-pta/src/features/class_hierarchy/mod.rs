//! Class hierarchy index: subtype relation and virtual dispatch
pub mod hierarchy;

pub use hierarchy::{ClassHierarchy, ClassNode, ResolvedType, SigId};
