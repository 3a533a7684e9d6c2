//! Program construction API
//!
//! Hosts that do not ship a serialized program (and tests) assemble one
//! through `ProgramBuilder`:
//!
//! ```rust,ignore
//! let mut b = ProgramBuilder::new().with_root("Object");
//! b.add_class(ClassDecl::new("Object"));
//! b.add_class(ClassDecl::new("A").extends("Object"));
//!
//! let mut m = b.method("Main", "main", "()V");
//! m.set_static();
//! let x = m.local("x", Type::class("A"));
//! m.new_object(x, "A");
//! m.invoke_virtual(None, x, "A", "m", "()V", &[]);
//! let main = m.finish();
//!
//! let program = b.build()?;
//! ```

use super::ids::{MethodId, VarId};
use super::program::{
    BasicBlock, ClassDecl, Invoke, InvokeKind, MethodBody, MethodDecl, Program, ProgramParts,
    Stmt, VarDecl,
};
use super::types::{FieldRef, MethodRef, MethodSig, Type};
use crate::errors::Result;

/// Incremental program builder
#[derive(Debug, Default)]
pub struct ProgramBuilder {
    parts: ProgramParts,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Class that arrays are subtypes of and dispatch through
    pub fn with_root(mut self, root: impl Into<String>) -> Self {
        self.parts.root_class = Some(root.into());
        self
    }

    pub fn add_class(&mut self, class: ClassDecl) -> &mut Self {
        self.parts.classes.push(class);
        self
    }

    /// Start a method declaration. The method is instance, non-public and
    /// has a body until told otherwise.
    pub fn method(
        &mut self,
        class: impl Into<String>,
        name: impl Into<String>,
        descriptor: impl Into<String>,
    ) -> MethodBuilder<'_> {
        let id = MethodId(self.parts.methods.len() as u32);
        MethodBuilder {
            id,
            decl: MethodDecl {
                class: class.into(),
                sig: MethodSig::new(name, descriptor),
                is_static: false,
                is_abstract: false,
                is_public: false,
                this_var: None,
                params: Vec::new(),
                body: Some(MethodBody::default()),
            },
            program: self,
        }
    }

    pub fn build(self) -> Result<Program> {
        Program::new(self.parts)
    }
}

/// Builder for one method; statements are appended in order and each
/// statement helper returns the statement index.
pub struct MethodBuilder<'a> {
    program: &'a mut ProgramBuilder,
    id: MethodId,
    decl: MethodDecl,
}

impl<'a> MethodBuilder<'a> {
    #[inline]
    pub fn id(&self) -> MethodId {
        self.id
    }

    pub fn set_static(&mut self) -> &mut Self {
        self.decl.is_static = true;
        self
    }

    pub fn set_public(&mut self) -> &mut Self {
        self.decl.is_public = true;
        self
    }

    /// Abstract methods have no body and are never dispatch targets
    pub fn set_abstract(&mut self) -> &mut Self {
        self.decl.is_abstract = true;
        self.decl.body = None;
        self
    }

    /// Library or native method: declared, but summarized by a stub
    pub fn without_body(&mut self) -> &mut Self {
        self.decl.body = None;
        self
    }

    fn new_var(&mut self, name: impl Into<String>, ty: Type) -> VarId {
        let id = VarId(self.program.parts.vars.len() as u32);
        self.program.parts.vars.push(VarDecl {
            name: name.into(),
            ty,
            method: self.id,
        });
        id
    }

    /// The receiver variable, created on first use
    pub fn this_var(&mut self) -> VarId {
        if let Some(this) = self.decl.this_var {
            return this;
        }
        let ty = Type::class(self.decl.class.clone());
        let this = self.new_var("this", ty);
        self.decl.this_var = Some(this);
        this
    }

    pub fn param(&mut self, name: impl Into<String>, ty: Type) -> VarId {
        let var = self.new_var(name, ty);
        self.decl.params.push(var);
        var
    }

    pub fn local(&mut self, name: impl Into<String>, ty: Type) -> VarId {
        self.new_var(name, ty)
    }

    pub fn push(&mut self, stmt: Stmt) -> u32 {
        let body = self.decl.body.get_or_insert_with(MethodBody::default);
        body.stmts.push(stmt);
        (body.stmts.len() - 1) as u32
    }

    /// Declare a basic block over statements `start..end`
    pub fn add_block(&mut self, start: u32, end: u32, successors: Vec<u32>) -> &mut Self {
        let body = self.decl.body.get_or_insert_with(MethodBody::default);
        body.blocks.push(BasicBlock {
            start,
            end,
            successors,
        });
        self
    }

    pub fn new_object(&mut self, lhs: VarId, class: impl Into<String>) -> u32 {
        self.push(Stmt::New {
            lhs,
            ty: Type::class(class),
        })
    }

    pub fn new_array(&mut self, lhs: VarId, element: Type) -> u32 {
        self.push(Stmt::New {
            lhs,
            ty: Type::array(element),
        })
    }

    pub fn copy(&mut self, lhs: VarId, rhs: VarId) -> u32 {
        self.push(Stmt::Copy { lhs, rhs })
    }

    pub fn assign_null(&mut self, lhs: VarId) -> u32 {
        self.push(Stmt::AssignNull { lhs })
    }

    pub fn cast(&mut self, lhs: VarId, rhs: VarId, ty: Type) -> u32 {
        self.push(Stmt::Cast { lhs, rhs, ty })
    }

    pub fn load_field(&mut self, lhs: VarId, base: VarId, class: &str, field: &str) -> u32 {
        self.push(Stmt::LoadField {
            lhs,
            base,
            field: FieldRef::new(class, field),
        })
    }

    pub fn store_field(&mut self, base: VarId, class: &str, field: &str, rhs: VarId) -> u32 {
        self.push(Stmt::StoreField {
            base,
            field: FieldRef::new(class, field),
            rhs,
        })
    }

    pub fn load_static(&mut self, lhs: VarId, class: &str, field: &str) -> u32 {
        self.push(Stmt::LoadStatic {
            lhs,
            field: FieldRef::new(class, field),
        })
    }

    pub fn store_static(&mut self, class: &str, field: &str, rhs: VarId) -> u32 {
        self.push(Stmt::StoreStatic {
            field: FieldRef::new(class, field),
            rhs,
        })
    }

    pub fn load_array(&mut self, lhs: VarId, base: VarId) -> u32 {
        self.push(Stmt::LoadArray { lhs, base })
    }

    pub fn store_array(&mut self, base: VarId, rhs: VarId) -> u32 {
        self.push(Stmt::StoreArray { base, rhs })
    }

    fn invoke(
        &mut self,
        kind: InvokeKind,
        result: Option<VarId>,
        receiver: Option<VarId>,
        method: MethodRef,
        args: &[VarId],
    ) -> u32 {
        self.push(Stmt::Invoke(Invoke {
            kind,
            method,
            receiver,
            args: args.to_vec(),
            result,
        }))
    }

    pub fn invoke_static(
        &mut self,
        result: Option<VarId>,
        class: &str,
        name: &str,
        descriptor: &str,
        args: &[VarId],
    ) -> u32 {
        let method = MethodRef::new(class, name, descriptor);
        self.invoke(InvokeKind::Static, result, None, method, args)
    }

    pub fn invoke_special(
        &mut self,
        result: Option<VarId>,
        receiver: VarId,
        class: &str,
        name: &str,
        descriptor: &str,
        args: &[VarId],
    ) -> u32 {
        let method = MethodRef::new(class, name, descriptor);
        self.invoke(InvokeKind::Special, result, Some(receiver), method, args)
    }

    pub fn invoke_virtual(
        &mut self,
        result: Option<VarId>,
        receiver: VarId,
        class: &str,
        name: &str,
        descriptor: &str,
        args: &[VarId],
    ) -> u32 {
        let method = MethodRef::new(class, name, descriptor);
        self.invoke(InvokeKind::Virtual, result, Some(receiver), method, args)
    }

    pub fn invoke_interface(
        &mut self,
        result: Option<VarId>,
        receiver: VarId,
        class: &str,
        name: &str,
        descriptor: &str,
        args: &[VarId],
    ) -> u32 {
        let method = MethodRef::new(class, name, descriptor);
        self.invoke(InvokeKind::Interface, result, Some(receiver), method, args)
    }

    pub fn ret(&mut self, value: Option<VarId>) -> u32 {
        self.push(Stmt::Return { value })
    }

    /// Register the method; instance methods always get a `this` variable
    pub fn finish(mut self) -> MethodId {
        if !self.decl.is_static {
            self.this_var();
        }
        self.program.parts.methods.push(self.decl);
        self.id
    }
}
