//! Program model shared by every feature

pub mod builder;
pub mod ids;
pub mod program;
pub mod types;

pub use builder::{MethodBuilder, ProgramBuilder};
pub use ids::{ClassId, MethodId, StmtRef, VarId};
pub use program::{
    BasicBlock, ClassDecl, Invoke, InvokeKind, MethodBody, MethodDecl, Program, ProgramParts,
    Stmt, VarDecl,
};
pub use types::{FieldRef, MethodRef, MethodSig, Type};
