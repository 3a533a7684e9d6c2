/*
 * Constraint Lowering
 *
 * Translates a method into context-free constraints, once per method:
 *
 * ```
 * if stub exists for method:
 *     lower stub constraints (this/paramN/return/tempN → locals)
 * elif method has body:
 *     for stmt in reachable blocks:
 *         New        → Alloc(site = stmt)
 *         x = y      → Copy
 *         x = (T) y  → Cast(filter T)
 *         x = y.f    → Load            y.f = x → Store
 *         x = C.f    → StaticLoad      C.f = x → StaticStore
 *         x = a[i]   → ArrayLoad       a[i] = x → ArrayStore
 *         call       → Call(Fixed | Dispatch | Unresolved)
 *         return v   → Copy(ret ← v)
 * else:
 *     UnsoundConfiguration
 * ```
 *
 * A summary replaces a body when both exist, so hosts can stub library
 * methods they also loaded.
 */

use crate::errors::{PtaError, Result};
use crate::features::class_hierarchy::{ClassHierarchy, ResolvedType};
use crate::features::heap_model::AllocSite;
use crate::features::points_to::domain::{
    CallConstraint, CallTarget, Constraint, FieldTable, Local,
};
use crate::features::stubs::{StubConstraint, StubModel, StubRef};
use crate::shared::models::{
    InvokeKind, MethodDecl, MethodId, MethodSig, Program, Stmt, StmtRef, Type,
};
use rustc_hash::FxHashMap;
use std::sync::Arc;
use tracing::trace;

/// Lowered, context-free form of one method
#[derive(Debug, Clone)]
pub struct MethodTemplate {
    pub method: MethodId,
    pub constraints: Vec<Constraint>,
    pub this: Option<Local>,
    pub params: Vec<Local>,
    pub ret: Local,
    pub from_stub: bool,
    base_uses: FxHashMap<Local, Vec<usize>>,
    calls: FxHashMap<u32, usize>,
}

impl MethodTemplate {
    fn new(method: MethodId, decl: &MethodDecl, from_stub: bool) -> Self {
        Self {
            method,
            constraints: Vec::new(),
            this: decl.this_var.map(Local::Var),
            params: decl.params.iter().copied().map(Local::Var).collect(),
            ret: Local::Return(method),
            from_stub,
            base_uses: FxHashMap::default(),
            calls: FxHashMap::default(),
        }
    }

    fn push(&mut self, constraint: Constraint) {
        let index = self.constraints.len();
        if let Some(base) = constraint.base() {
            self.base_uses.entry(base).or_default().push(index);
        }
        if let Constraint::Call(call) = &constraint {
            self.calls.insert(call.site.index, index);
        }
        self.constraints.push(constraint);
    }

    /// Constraints re-triggered when `local`'s points-to set grows
    pub fn uses_as_base(&self, local: Local) -> &[usize] {
        self.base_uses.get(&local).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Call constraint at a site of this method
    pub fn call_at(&self, site_index: u32) -> Option<&CallConstraint> {
        self.calls
            .get(&site_index)
            .and_then(|&i| self.constraints[i].as_call())
    }

    pub fn calls(&self) -> impl Iterator<Item = &CallConstraint> {
        self.constraints.iter().filter_map(Constraint::as_call)
    }
}

/// Lowers methods on demand and caches the result for the run
pub struct ConstraintLowering<'a> {
    program: &'a Program,
    hierarchy: &'a ClassHierarchy,
    stubs: &'a StubModel,
    fields: FieldTable,
    templates: FxHashMap<MethodId, Arc<MethodTemplate>>,
}

impl<'a> ConstraintLowering<'a> {
    pub fn new(program: &'a Program, hierarchy: &'a ClassHierarchy, stubs: &'a StubModel) -> Self {
        Self {
            program,
            hierarchy,
            stubs,
            fields: FieldTable::new(),
            templates: FxHashMap::default(),
        }
    }

    #[inline]
    pub fn fields(&self) -> &FieldTable {
        &self.fields
    }

    pub fn into_fields(self) -> FieldTable {
        self.fields
    }

    #[inline]
    pub fn lowered_count(&self) -> usize {
        self.templates.len()
    }

    /// Template of `method`, lowering it on first request
    pub fn template(&mut self, method: MethodId) -> Result<Arc<MethodTemplate>> {
        if let Some(template) = self.templates.get(&method) {
            return Ok(Arc::clone(template));
        }

        let (program, stubs) = (self.program, self.stubs);
        let decl = program.method(method);
        let signature = decl.signature();
        let template = if let Some(stub) = stubs.stub_for(&signature) {
            self.lower_stub(method, decl, stub)?
        } else if let Some(body) = &decl.body {
            let mut template = MethodTemplate::new(method, decl, false);
            for index in body.reachable_stmts() {
                let stmt = &body.stmts[index as usize];
                if let Some(c) = self.lower_stmt(method, decl, StmtRef::new(method, index), stmt)? {
                    template.push(c);
                }
            }
            template
        } else {
            let reason = if decl.is_abstract {
                "is abstract and cannot be analyzed".to_string()
            } else {
                "has neither a body nor a library stub".to_string()
            };
            return Err(PtaError::unsound(signature, reason));
        };

        trace!(
            "Lowered {} into {} constraints{}",
            signature,
            template.constraints.len(),
            if template.from_stub { " (stub)" } else { "" }
        );
        let template = Arc::new(template);
        self.templates.insert(method, Arc::clone(&template));
        Ok(template)
    }

    fn resolve(&self, ty: &Type, decl: &MethodDecl) -> Result<ResolvedType> {
        self.hierarchy.resolve_type(ty).ok_or_else(|| {
            PtaError::unresolved_type(ty.to_string(), format!("body of {}", decl.signature()))
        })
    }

    fn lower_stmt(
        &mut self,
        method: MethodId,
        decl: &MethodDecl,
        site: StmtRef,
        stmt: &Stmt,
    ) -> Result<Option<Constraint>> {
        let var = Local::Var;
        let constraint = match stmt {
            Stmt::New { lhs, ty } => Constraint::Alloc {
                lhs: var(*lhs),
                site: AllocSite::Stmt(site),
                ty: self.resolve(ty, decl)?,
            },
            Stmt::Copy { lhs, rhs } => Constraint::Copy {
                lhs: var(*lhs),
                rhs: var(*rhs),
            },
            Stmt::AssignNull { lhs } => Constraint::AssignNull { lhs: var(*lhs) },
            Stmt::Cast { lhs, rhs, ty } => Constraint::Cast {
                lhs: var(*lhs),
                rhs: var(*rhs),
                ty: self.resolve(ty, decl)?,
            },
            Stmt::LoadField { lhs, base, field } => Constraint::Load {
                lhs: var(*lhs),
                base: var(*base),
                field: self.fields.instance_field(field),
            },
            Stmt::StoreField { base, field, rhs } => Constraint::Store {
                base: var(*base),
                field: self.fields.instance_field(field),
                rhs: var(*rhs),
            },
            Stmt::LoadStatic { lhs, field } => Constraint::StaticLoad {
                lhs: var(*lhs),
                field: self.fields.static_field(field),
            },
            Stmt::StoreStatic { field, rhs } => Constraint::StaticStore {
                field: self.fields.static_field(field),
                rhs: var(*rhs),
            },
            Stmt::LoadArray { lhs, base } => Constraint::ArrayLoad {
                lhs: var(*lhs),
                base: var(*base),
            },
            Stmt::StoreArray { base, rhs } => Constraint::ArrayStore {
                base: var(*base),
                rhs: var(*rhs),
            },
            Stmt::Invoke(invoke) => {
                let target = self.call_target(invoke.kind, &invoke.method.class, &invoke.method.sig);
                Constraint::Call(CallConstraint {
                    site,
                    kind: invoke.kind,
                    target,
                    receiver: invoke.receiver.map(var),
                    args: invoke.args.iter().copied().map(var).collect(),
                    result: invoke.result.map(var),
                })
            }
            Stmt::Return { value: Some(v) } => Constraint::Copy {
                lhs: Local::Return(method),
                rhs: var(*v),
            },
            Stmt::Return { value: None } | Stmt::Other => return Ok(None),
        };
        Ok(Some(constraint))
    }

    fn call_target(&self, kind: InvokeKind, class: &str, sig: &MethodSig) -> CallTarget {
        let (Some(class), Some(sig)) = (self.hierarchy.class_id(class), self.hierarchy.sig_id(sig))
        else {
            return CallTarget::Unresolved;
        };
        if kind.is_dynamic() {
            CallTarget::Dispatch(sig)
        } else {
            self.hierarchy
                .resolve_method(class, sig)
                .map_or(CallTarget::Unresolved, CallTarget::Fixed)
        }
    }

    fn lower_stub(
        &mut self,
        method: MethodId,
        decl: &MethodDecl,
        stub: &[StubConstraint],
    ) -> Result<MethodTemplate> {
        let mut template = MethodTemplate::new(method, decl, true);
        let signature = decl.signature();

        let local = |r: StubRef| -> Result<Local> {
            match r {
                StubRef::This => decl.this_var.map(Local::Var).ok_or_else(|| {
                    PtaError::invalid_program(format!("stub for {} uses 'this' on a static method", signature))
                }),
                StubRef::Param(i) => decl.params.get(i).copied().map(Local::Var).ok_or_else(|| {
                    PtaError::invalid_program(format!("stub for {} uses missing parameter {}", signature, i))
                }),
                StubRef::Return => Ok(Local::Return(method)),
                StubRef::Temp(index) => Ok(Local::StubTemp { method, index }),
            }
        };

        for (index, constraint) in stub.iter().enumerate() {
            let index = index as u32;
            let lowered = match constraint {
                StubConstraint::Allocates { target, ty } => {
                    let parsed = Type::parse(ty);
                    let resolved = self.hierarchy.resolve_type(&parsed).ok_or_else(|| {
                        PtaError::unresolved_type(ty.clone(), format!("library stub {}", signature))
                    })?;
                    Constraint::Alloc {
                        lhs: local(*target)?,
                        site: AllocSite::Stub { method, index },
                        ty: resolved,
                    }
                }
                StubConstraint::Copies { from, to } => Constraint::Copy {
                    lhs: local(*to)?,
                    rhs: local(*from)?,
                },
                StubConstraint::StoresField { base, field, value } => Constraint::Store {
                    base: local(*base)?,
                    field: self.fields.instance_field(field),
                    rhs: local(*value)?,
                },
                StubConstraint::LoadsField { base, field, target } => Constraint::Load {
                    lhs: local(*target)?,
                    base: local(*base)?,
                    field: self.fields.instance_field(field),
                },
                StubConstraint::StoresArray { base, value } => Constraint::ArrayStore {
                    base: local(*base)?,
                    rhs: local(*value)?,
                },
                StubConstraint::LoadsArray { base, target } => Constraint::ArrayLoad {
                    lhs: local(*target)?,
                    base: local(*base)?,
                },
                StubConstraint::CallsBack {
                    receiver,
                    class,
                    method: sig,
                    args,
                    result,
                } => Constraint::Call(CallConstraint {
                    site: StmtRef::new(method, index),
                    kind: InvokeKind::Virtual,
                    target: self.call_target(InvokeKind::Virtual, class, sig),
                    receiver: Some(local(*receiver)?),
                    args: args.iter().map(|a| local(*a)).collect::<Result<_>>()?,
                    result: result.map(local).transpose()?,
                }),
            };
            template.push(lowered);
        }
        Ok(template)
    }
}
