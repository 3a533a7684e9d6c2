//! Program Model
//!
//! Read-only fact base handed over by the host's bytecode loader: class
//! declarations, method declarations and a control-flow graph of typed IR
//! statements per method body. Immutable for one analysis run and shared
//! (behind `Arc`) between independent runs.

use super::ids::{MethodId, VarId};
use super::types::{FieldRef, MethodRef, MethodSig, Type};
use crate::errors::{PtaError, Result};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Class or interface declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassDecl {
    pub name: String,
    #[serde(default)]
    pub super_class: Option<String>,
    #[serde(default)]
    pub interfaces: Vec<String>,
    #[serde(default)]
    pub is_interface: bool,
    #[serde(default)]
    pub is_abstract: bool,
}

impl ClassDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            super_class: None,
            interfaces: Vec::new(),
            is_interface: false,
            is_abstract: false,
        }
    }

    pub fn extends(mut self, super_class: impl Into<String>) -> Self {
        self.super_class = Some(super_class.into());
        self
    }

    pub fn implements(mut self, interface: impl Into<String>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    pub fn interface(mut self) -> Self {
        self.is_interface = true;
        self.is_abstract = true;
        self
    }

    pub fn abstract_class(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// Whether objects of exactly this type can exist
    #[inline]
    pub fn is_concrete(&self) -> bool {
        !self.is_interface && !self.is_abstract
    }
}

/// Local variable declaration (parameters and `this` included)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VarDecl {
    pub name: String,
    pub ty: Type,
    pub method: MethodId,
}

/// Call instruction flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvokeKind {
    /// No receiver, target resolved statically
    Static,
    /// Constructor, private or `super` call: receiver, static target
    Special,
    /// Receiver, target dispatched on the receiver's dynamic type
    Virtual,
    /// Same as virtual, through an interface type
    Interface,
}

impl InvokeKind {
    #[inline]
    pub fn has_receiver(self) -> bool {
        !matches!(self, InvokeKind::Static)
    }

    #[inline]
    pub fn is_dynamic(self) -> bool {
        matches!(self, InvokeKind::Virtual | InvokeKind::Interface)
    }
}

/// Call statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoke {
    pub kind: InvokeKind,
    pub method: MethodRef,
    #[serde(default)]
    pub receiver: Option<VarId>,
    #[serde(default)]
    pub args: Vec<VarId>,
    #[serde(default)]
    pub result: Option<VarId>,
}

/// Typed IR statement. Statements that do not move references
/// (arithmetic, branches, monitors) are `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Stmt {
    /// `lhs = new T` (also `new T[n]`)
    New { lhs: VarId, ty: Type },
    /// `lhs = rhs`
    Copy { lhs: VarId, rhs: VarId },
    /// `lhs = null`
    AssignNull { lhs: VarId },
    /// `lhs = (T) rhs`
    Cast { lhs: VarId, rhs: VarId, ty: Type },
    /// `lhs = base.f`
    LoadField { lhs: VarId, base: VarId, field: FieldRef },
    /// `base.f = rhs`
    StoreField { base: VarId, field: FieldRef, rhs: VarId },
    /// `lhs = C.f`
    LoadStatic { lhs: VarId, field: FieldRef },
    /// `C.f = rhs`
    StoreStatic { field: FieldRef, rhs: VarId },
    /// `lhs = base[i]`
    LoadArray { lhs: VarId, base: VarId },
    /// `base[i] = rhs`
    StoreArray { base: VarId, rhs: VarId },
    /// Any call
    Invoke(Invoke),
    /// `return value`
    Return { value: Option<VarId> },
    /// Statement without pointer effect
    Other,
}

impl Stmt {
    /// Variables mentioned by this statement
    pub fn vars(&self) -> Vec<VarId> {
        match self {
            Stmt::New { lhs, .. } | Stmt::AssignNull { lhs } | Stmt::LoadStatic { lhs, .. } => {
                vec![*lhs]
            }
            Stmt::Copy { lhs, rhs } | Stmt::Cast { lhs, rhs, .. } => vec![*lhs, *rhs],
            Stmt::LoadField { lhs, base, .. } | Stmt::LoadArray { lhs, base } => vec![*lhs, *base],
            Stmt::StoreField { base, rhs, .. } | Stmt::StoreArray { base, rhs } => {
                vec![*base, *rhs]
            }
            Stmt::StoreStatic { rhs, .. } => vec![*rhs],
            Stmt::Invoke(invoke) => invoke
                .receiver
                .iter()
                .chain(invoke.args.iter())
                .chain(invoke.result.iter())
                .copied()
                .collect(),
            Stmt::Return { value } => value.iter().copied().collect(),
            Stmt::Other => Vec::new(),
        }
    }

    #[inline]
    pub fn as_invoke(&self) -> Option<&Invoke> {
        match self {
            Stmt::Invoke(invoke) => Some(invoke),
            _ => None,
        }
    }
}

/// Basic block: statements `start..end` of the body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicBlock {
    pub start: u32,
    pub end: u32,
    #[serde(default)]
    pub successors: Vec<u32>,
}

/// Method body: statements plus the control-flow graph over them.
///
/// An empty block list means one block spanning every statement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodBody {
    pub stmts: Vec<Stmt>,
    #[serde(default)]
    pub blocks: Vec<BasicBlock>,
}

impl MethodBody {
    /// Indexes of statements in blocks reachable from the entry block,
    /// in ascending order
    pub fn reachable_stmts(&self) -> Vec<u32> {
        if self.blocks.is_empty() {
            return (0..self.stmts.len() as u32).collect();
        }

        let mut visited = vec![false; self.blocks.len()];
        let mut queue = VecDeque::from([0usize]);
        visited[0] = true;
        while let Some(block) = queue.pop_front() {
            for &succ in &self.blocks[block].successors {
                let succ = succ as usize;
                if succ < visited.len() && !visited[succ] {
                    visited[succ] = true;
                    queue.push_back(succ);
                }
            }
        }

        let mut stmts: Vec<u32> = self
            .blocks
            .iter()
            .zip(visited)
            .filter(|(_, reached)| *reached)
            .flat_map(|(block, _)| block.start..block.end)
            .collect();
        stmts.sort_unstable();
        stmts.dedup();
        stmts
    }
}

/// Method declaration. Library and native methods have no body and rely on
/// the library stub model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodDecl {
    pub class: String,
    pub sig: MethodSig,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub is_abstract: bool,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub this_var: Option<VarId>,
    #[serde(default)]
    pub params: Vec<VarId>,
    #[serde(default)]
    pub body: Option<MethodBody>,
}

impl MethodDecl {
    /// Fully qualified signature: `Class.name(descriptor)`
    pub fn signature(&self) -> String {
        format!("{}.{}{}", self.class, self.sig.name, self.sig.descriptor)
    }

    #[inline]
    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }
}

/// Serialized form of a program; indexes are rebuilt on load.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProgramParts {
    #[serde(default)]
    pub root_class: Option<String>,
    pub classes: Vec<ClassDecl>,
    pub methods: Vec<MethodDecl>,
    pub vars: Vec<VarDecl>,
}

/// Immutable, indexed program
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "ProgramParts", into = "ProgramParts")]
pub struct Program {
    root_class: Option<String>,
    classes: Vec<ClassDecl>,
    methods: Vec<MethodDecl>,
    vars: Vec<VarDecl>,
    class_index: FxHashMap<String, usize>,
    signature_index: FxHashMap<String, MethodId>,
}

impl Program {
    /// Index and validate a program. Type names are not resolved here; that
    /// is the class hierarchy's job.
    pub fn new(parts: ProgramParts) -> Result<Self> {
        let ProgramParts {
            root_class,
            classes,
            methods,
            vars,
        } = parts;

        let mut class_index = FxHashMap::default();
        for (i, class) in classes.iter().enumerate() {
            if class_index.insert(class.name.clone(), i).is_some() {
                return Err(PtaError::invalid_program(format!(
                    "class '{}' declared twice",
                    class.name
                )));
            }
        }

        let mut signature_index = FxHashMap::default();
        for (i, method) in methods.iter().enumerate() {
            let id = MethodId(i as u32);
            let signature = method.signature();
            if signature_index.insert(signature.clone(), id).is_some() {
                return Err(PtaError::invalid_program(format!(
                    "method '{}' declared twice",
                    signature
                )));
            }
            Self::check_method(id, method, &vars)?;
        }

        for (i, var) in vars.iter().enumerate() {
            if var.method.index() >= methods.len() {
                return Err(PtaError::invalid_program(format!(
                    "variable v{} ('{}') belongs to unknown method m{}",
                    i, var.name, var.method.0
                )));
            }
        }

        Ok(Self {
            root_class,
            classes,
            methods,
            vars,
            class_index,
            signature_index,
        })
    }

    fn check_method(id: MethodId, method: &MethodDecl, vars: &[VarDecl]) -> Result<()> {
        let owned = |var: VarId| -> Result<()> {
            match vars.get(var.index()) {
                Some(decl) if decl.method == id => Ok(()),
                Some(decl) => Err(PtaError::invalid_program(format!(
                    "{} uses variable '{}' of another method",
                    method.signature(),
                    decl.name
                ))),
                None => Err(PtaError::invalid_program(format!(
                    "{} uses undeclared variable v{}",
                    method.signature(),
                    var.0
                ))),
            }
        };

        if method.is_static && method.this_var.is_some() {
            return Err(PtaError::invalid_program(format!(
                "static method {} declares a this variable",
                method.signature()
            )));
        }
        // Bodyless instance methods may omit `this`; stubs that need it fail at lowering
        if !method.is_static && method.has_body() && method.this_var.is_none() {
            return Err(PtaError::invalid_program(format!(
                "instance method {} has a body but no this variable",
                method.signature()
            )));
        }
        for var in method.this_var.iter().chain(method.params.iter()) {
            owned(*var)?;
        }

        if let Some(body) = &method.body {
            for stmt in &body.stmts {
                for var in stmt.vars() {
                    owned(var)?;
                }
                if let Stmt::Invoke(invoke) = stmt {
                    if invoke.kind.has_receiver() != invoke.receiver.is_some() {
                        return Err(PtaError::invalid_program(format!(
                            "{}: {:?} call to {} with mismatched receiver",
                            method.signature(),
                            invoke.kind,
                            invoke.method
                        )));
                    }
                }
            }
            let len = body.stmts.len() as u32;
            for block in &body.blocks {
                let successors_ok = block
                    .successors
                    .iter()
                    .all(|&s| (s as usize) < body.blocks.len());
                if block.start > block.end || block.end > len || !successors_ok {
                    return Err(PtaError::invalid_program(format!(
                        "{}: malformed basic block {:?}",
                        method.signature(),
                        block
                    )));
                }
            }
        }
        Ok(())
    }

    /// Parse a program serialized as JSON
    pub fn from_json_str(json: &str) -> Result<Self> {
        let parts: ProgramParts = serde_json::from_str(json)
            .map_err(|e| PtaError::invalid_program(format!("malformed program JSON: {}", e)))?;
        Self::new(parts)
    }

    #[inline]
    pub fn root_class(&self) -> Option<&str> {
        self.root_class.as_deref()
    }

    pub fn classes(&self) -> impl Iterator<Item = &ClassDecl> {
        self.classes.iter()
    }

    pub fn class(&self, name: &str) -> Option<&ClassDecl> {
        self.class_index.get(name).map(|&i| &self.classes[i])
    }

    pub fn methods(&self) -> impl Iterator<Item = (MethodId, &MethodDecl)> {
        self.methods
            .iter()
            .enumerate()
            .map(|(i, m)| (MethodId(i as u32), m))
    }

    #[inline]
    pub fn method(&self, id: MethodId) -> &MethodDecl {
        &self.methods[id.index()]
    }

    #[inline]
    pub fn method_count(&self) -> usize {
        self.methods.len()
    }

    pub fn method_by_signature(&self, signature: &str) -> Option<MethodId> {
        self.signature_index.get(signature).copied()
    }

    #[inline]
    pub fn var(&self, id: VarId) -> &VarDecl {
        &self.vars[id.index()]
    }

    pub fn vars(&self) -> impl Iterator<Item = (VarId, &VarDecl)> {
        self.vars
            .iter()
            .enumerate()
            .map(|(i, v)| (VarId(i as u32), v))
    }

    /// Find a variable of a method by name (first match)
    pub fn var_by_name(&self, method: MethodId, name: &str) -> Option<VarId> {
        self.vars()
            .find(|(_, v)| v.method == method && v.name == name)
            .map(|(id, _)| id)
    }
}

impl TryFrom<ProgramParts> for Program {
    type Error = PtaError;

    fn try_from(parts: ProgramParts) -> Result<Self> {
        Program::new(parts)
    }
}

impl From<Program> for ProgramParts {
    fn from(program: Program) -> Self {
        ProgramParts {
            root_class: program.root_class,
            classes: program.classes,
            methods: program.methods,
            vars: program.vars,
        }
    }
}
