//! Index-based identities for program entities
//!
//! Identities are dense `u32` indexes into the owning table, never pointers,
//! so converged results can be read from several threads at once.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Class declaration index (program classes first, then external types)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClassId(pub u32);

/// Method declaration index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MethodId(pub u32);

/// Variable declaration index (global across methods)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VarId(pub u32);

impl ClassId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl MethodId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl VarId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A statement position: allocation sites and call sites are identified by
/// the statement that creates them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StmtRef {
    pub method: MethodId,
    pub index: u32,
}

impl StmtRef {
    #[inline]
    pub fn new(method: MethodId, index: u32) -> Self {
        Self { method, index }
    }
}

impl fmt::Display for StmtRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m{}#{}", self.method.0, self.index)
    }
}
