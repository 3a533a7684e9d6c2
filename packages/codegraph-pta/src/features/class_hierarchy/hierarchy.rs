//! Class Hierarchy Index
//!
//! Built once per program by a single traversal of the class/interface
//! declaration graph and read-only afterwards, so it can be shared between
//! concurrent runs behind an `Arc`.
//!
//! Every type name the program (or the stub model) mentions must resolve to
//! a declaration or an external stub type. Dropping an unresolved name would
//! silently lose dispatch targets, so it fails the build instead.

use crate::errors::{PtaError, Result};
use crate::features::stubs::{StubConstraint, StubModel};
use crate::shared::models::{ClassId, MethodId, MethodSig, Program, Stmt, Type};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::debug;

/// Interned method subsignature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SigId(pub u32);

/// A type after name resolution
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResolvedType {
    Class(ClassId),
    Array(Box<ResolvedType>),
    Null,
}

/// One class or interface of the index
#[derive(Debug, Clone)]
pub struct ClassNode {
    pub name: String,
    pub super_class: Option<ClassId>,
    pub interfaces: Vec<ClassId>,
    pub is_interface: bool,
    pub is_abstract: bool,
    /// Known only through the stub model
    pub is_external: bool,
    methods: FxHashMap<SigId, MethodId>,
}

impl ClassNode {
    #[inline]
    pub fn is_concrete(&self) -> bool {
        !self.is_interface && !self.is_abstract
    }

    /// Method declared (not inherited) with the given subsignature
    #[inline]
    pub fn declared_method(&self, sig: SigId) -> Option<MethodId> {
        self.methods.get(&sig).copied()
    }
}

#[derive(Debug, Clone, Copy)]
struct MethodInfo {
    class: ClassId,
    sig: SigId,
    is_abstract: bool,
    is_static: bool,
}

/// Immutable class hierarchy index
#[derive(Debug, Clone)]
pub struct ClassHierarchy {
    classes: Vec<ClassNode>,
    by_name: FxHashMap<String, ClassId>,
    sigs: FxHashMap<MethodSig, SigId>,
    methods: Vec<MethodInfo>,
    /// Transitive supertypes, superclass chain before interfaces, self excluded
    supertypes: Vec<Vec<ClassId>>,
    supertype_sets: Vec<FxHashSet<ClassId>>,
    direct_subtypes: Vec<Vec<ClassId>>,
    root: Option<ClassId>,
}

impl ClassHierarchy {
    /// Build the index from the program and the stub model's external types
    pub fn build(program: &Program, stubs: &StubModel) -> Result<Self> {
        let mut hierarchy = Self {
            classes: Vec::new(),
            by_name: FxHashMap::default(),
            sigs: FxHashMap::default(),
            methods: Vec::with_capacity(program.method_count()),
            supertypes: Vec::new(),
            supertype_sets: Vec::new(),
            direct_subtypes: Vec::new(),
            root: None,
        };

        // Phase 1: register names
        for class in program.classes() {
            hierarchy.register(&class.name, class.is_interface, class.is_abstract, false);
        }
        for ext in &stubs.external_types {
            if hierarchy.by_name.contains_key(&ext.name) {
                debug!("External type {} is also declared by the program", ext.name);
                continue;
            }
            hierarchy.register(&ext.name, ext.is_interface, ext.is_interface, true);
        }

        // Phase 2: link supertypes
        for class in program.classes() {
            hierarchy.link(&class.name, class.super_class.as_deref(), &class.interfaces)?;
        }
        for ext in &stubs.external_types {
            let id = hierarchy.by_name[&ext.name];
            if hierarchy.classes[id.index()].is_external {
                hierarchy.link(&ext.name, ext.super_class.as_deref(), &ext.interfaces)?;
            }
        }

        // Phase 3: methods
        for (id, method) in program.methods() {
            let class = hierarchy.lookup(&method.class, || {
                format!("declaring class of {}", method.signature())
            })?;
            let sig = hierarchy.intern_sig(&method.sig);
            hierarchy.classes[class.index()].methods.insert(sig, id);
            hierarchy.methods.push(MethodInfo {
                class,
                sig,
                is_abstract: method.is_abstract,
                is_static: method.is_static,
            });
        }

        // Phase 4: every other type reference
        hierarchy.check_references(program, stubs)?;

        if let Some(root) = program.root_class() {
            hierarchy.root = Some(hierarchy.lookup(root, || "root class".to_string())?);
        }

        hierarchy.compute_closure()?;

        debug!(
            "Class hierarchy built: {} classes ({} external), {} methods, {} signatures",
            hierarchy.classes.len(),
            hierarchy.classes.iter().filter(|c| c.is_external).count(),
            hierarchy.methods.len(),
            hierarchy.sigs.len()
        );
        Ok(hierarchy)
    }

    fn register(&mut self, name: &str, is_interface: bool, is_abstract: bool, is_external: bool) {
        let id = ClassId(self.classes.len() as u32);
        self.classes.push(ClassNode {
            name: name.to_string(),
            super_class: None,
            interfaces: Vec::new(),
            is_interface,
            is_abstract: is_abstract || is_interface,
            is_external,
            methods: FxHashMap::default(),
        });
        self.by_name.insert(name.to_string(), id);
    }

    fn link(&mut self, name: &str, super_class: Option<&str>, interfaces: &[String]) -> Result<()> {
        let id = self.by_name[name];
        let super_id = match super_class {
            Some(s) => Some(self.lookup(s, || format!("superclass of {}", name))?),
            None => None,
        };
        let mut interface_ids = Vec::with_capacity(interfaces.len());
        for i in interfaces {
            interface_ids.push(self.lookup(i, || format!("interface of {}", name))?);
        }
        let node = &mut self.classes[id.index()];
        node.super_class = super_id;
        node.interfaces = interface_ids;
        Ok(())
    }

    fn lookup(&self, name: &str, referenced_from: impl FnOnce() -> String) -> Result<ClassId> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| PtaError::unresolved_type(name, referenced_from()))
    }

    fn intern_sig(&mut self, sig: &MethodSig) -> SigId {
        let next = SigId(self.sigs.len() as u32);
        *self.sigs.entry(sig.clone()).or_insert(next)
    }

    fn check_type(&self, ty: &Type, referenced_from: &dyn Fn() -> String) -> Result<()> {
        match ty.base_class() {
            Some(name) => self.lookup(name, referenced_from).map(|_| ()),
            None => Ok(()),
        }
    }

    fn check_references(&self, program: &Program, stubs: &StubModel) -> Result<()> {
        for (_, var) in program.vars() {
            let method = program.method(var.method);
            self.check_type(&var.ty, &|| {
                format!("variable '{}' of {}", var.name, method.signature())
            })?;
        }

        for (_, method) in program.methods() {
            let Some(body) = &method.body else { continue };
            let from = || format!("body of {}", method.signature());
            for stmt in &body.stmts {
                match stmt {
                    Stmt::New { ty, .. } | Stmt::Cast { ty, .. } => self.check_type(ty, &from)?,
                    Stmt::LoadField { field, .. }
                    | Stmt::StoreField { field, .. }
                    | Stmt::LoadStatic { field, .. }
                    | Stmt::StoreStatic { field, .. } => {
                        self.lookup(&field.class, from)?;
                    }
                    Stmt::Invoke(invoke) => {
                        self.lookup(&invoke.method.class, from)?;
                    }
                    _ => {}
                }
            }
        }

        for (signature, constraints) in &stubs.stubs {
            let from = || format!("library stub {}", signature);
            for constraint in constraints {
                match constraint {
                    StubConstraint::Allocates { ty, .. } => {
                        self.check_type(&Type::parse(ty), &from)?;
                    }
                    StubConstraint::StoresField { field, .. }
                    | StubConstraint::LoadsField { field, .. } => {
                        self.lookup(&field.class, from)?;
                    }
                    StubConstraint::CallsBack { class, .. } => {
                        self.lookup(class, from)?;
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }

    /// Transitive supertypes in BFS order plus the reverse edges
    fn compute_closure(&mut self) -> Result<()> {
        let n = self.classes.len();
        self.direct_subtypes = vec![Vec::new(); n];
        for (i, class) in self.classes.iter().enumerate() {
            for sup in class.super_class.iter().chain(class.interfaces.iter()) {
                self.direct_subtypes[sup.index()].push(ClassId(i as u32));
            }
        }

        self.supertypes = Vec::with_capacity(n);
        self.supertype_sets = Vec::with_capacity(n);
        for i in 0..n {
            let start = ClassId(i as u32);
            let mut order = Vec::new();
            let mut seen = FxHashSet::default();

            // Superclass chain first, then interfaces breadth-first
            let mut queue: VecDeque<ClassId> = VecDeque::new();
            let mut current = self.classes[i].super_class;
            while let Some(sup) = current {
                if sup == start {
                    return Err(PtaError::invalid_program(format!(
                        "cyclic inheritance through {}",
                        self.classes[i].name
                    )));
                }
                if !seen.insert(sup) {
                    break;
                }
                order.push(sup);
                current = self.classes[sup.index()].super_class;
            }
            queue.push_back(start);
            queue.extend(order.iter().copied());
            while let Some(c) = queue.pop_front() {
                for &iface in &self.classes[c.index()].interfaces {
                    if iface == start {
                        return Err(PtaError::invalid_program(format!(
                            "cyclic inheritance through {}",
                            self.classes[i].name
                        )));
                    }
                    if seen.insert(iface) {
                        order.push(iface);
                        queue.push_back(iface);
                    }
                }
            }

            self.supertype_sets.push(order.iter().copied().collect());
            self.supertypes.push(order);
        }
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Queries
    // ═══════════════════════════════════════════════════════════════════════

    #[inline]
    pub fn class_id(&self, name: &str) -> Option<ClassId> {
        self.by_name.get(name).copied()
    }

    #[inline]
    pub fn class(&self, id: ClassId) -> &ClassNode {
        &self.classes[id.index()]
    }

    #[inline]
    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    #[inline]
    pub fn root(&self) -> Option<ClassId> {
        self.root
    }

    #[inline]
    pub fn sig_id(&self, sig: &MethodSig) -> Option<SigId> {
        self.sigs.get(sig).copied()
    }

    #[inline]
    pub fn declaring_class(&self, method: MethodId) -> ClassId {
        self.methods[method.index()].class
    }

    #[inline]
    pub fn method_sig(&self, method: MethodId) -> SigId {
        self.methods[method.index()].sig
    }

    /// Resolve a declared type; `None` if the name is unknown
    pub fn resolve_type(&self, ty: &Type) -> Option<ResolvedType> {
        match ty {
            Type::Class(name) => self.class_id(name).map(ResolvedType::Class),
            Type::Array(elem) => self
                .resolve_type(elem)
                .map(|e| ResolvedType::Array(Box::new(e))),
            Type::Null => Some(ResolvedType::Null),
        }
    }

    pub fn type_name(&self, ty: &ResolvedType) -> String {
        match ty {
            ResolvedType::Class(id) => self.class(*id).name.clone(),
            ResolvedType::Array(elem) => format!("{}[]", self.type_name(elem)),
            ResolvedType::Null => "null".to_string(),
        }
    }

    /// Ordered transitive supertypes (superclass chain, then interfaces)
    #[inline]
    pub fn supertypes(&self, class: ClassId) -> &[ClassId] {
        &self.supertypes[class.index()]
    }

    /// Ordered transitive subtypes (breadth-first), self excluded
    pub fn subtypes(&self, class: ClassId) -> Vec<ClassId> {
        let mut order = Vec::new();
        let mut seen = FxHashSet::default();
        let mut queue = VecDeque::from([class]);
        seen.insert(class);
        while let Some(c) = queue.pop_front() {
            for &sub in &self.direct_subtypes[c.index()] {
                if seen.insert(sub) {
                    order.push(sub);
                    queue.push_back(sub);
                }
            }
        }
        order
    }

    /// `sub` equals `sup` or inherits from it
    #[inline]
    pub fn is_subclass(&self, sub: ClassId, sup: ClassId) -> bool {
        sub == sup || self.supertype_sets[sub.index()].contains(&sup)
    }

    /// Assignability between resolved types. `null` is assignable to every
    /// reference type; arrays are covariant and assignable to the root class.
    pub fn is_subtype(&self, sub: &ResolvedType, sup: &ResolvedType) -> bool {
        match (sub, sup) {
            (ResolvedType::Null, _) => true,
            (_, ResolvedType::Null) => false,
            (ResolvedType::Class(a), ResolvedType::Class(b)) => self.is_subclass(*a, *b),
            (ResolvedType::Array(a), ResolvedType::Array(b)) => self.is_subtype(a, b),
            (ResolvedType::Array(_), ResolvedType::Class(b)) => self.root == Some(*b),
            (ResolvedType::Class(_), ResolvedType::Array(_)) => false,
        }
    }

    /// Virtual dispatch: the implementation an object of exactly `class`
    /// runs for `sig`. Superclass chain first, then default methods of the
    /// implemented interfaces.
    pub fn dispatch(&self, class: ClassId, sig: SigId) -> Option<MethodId> {
        let is_target = |m: MethodId| {
            let info = &self.methods[m.index()];
            !info.is_abstract && !info.is_static
        };

        let mut current = Some(class);
        while let Some(c) = current {
            let node = &self.classes[c.index()];
            if let Some(m) = node.declared_method(sig) {
                if is_target(m) {
                    return Some(m);
                }
            }
            current = node.super_class;
        }

        self.supertypes(class)
            .iter()
            .filter(|c| self.classes[c.index()].is_interface)
            .filter_map(|c| self.classes[c.index()].declared_method(sig))
            .find(|&m| is_target(m))
    }

    /// Static resolution for static and special calls: the closest
    /// declaration visible from `class`
    pub fn resolve_method(&self, class: ClassId, sig: SigId) -> Option<MethodId> {
        if let Some(m) = self.classes[class.index()].declared_method(sig) {
            return Some(m);
        }
        self.supertypes(class)
            .iter()
            .filter_map(|c| self.classes[c.index()].declared_method(sig))
            .find(|m| !self.methods[m.index()].is_abstract)
    }

    /// Class-hierarchy candidate set: every implementation dispatch could
    /// select for a receiver declared as `static_type`
    pub fn virtual_candidates(&self, static_type: ClassId, sig: SigId) -> Vec<MethodId> {
        let mut candidates = Vec::new();
        let types = std::iter::once(static_type).chain(self.subtypes(static_type));
        for t in types {
            if !self.classes[t.index()].is_concrete() {
                continue;
            }
            if let Some(m) = self.dispatch(t, sig) {
                if !candidates.contains(&m) {
                    candidates.push(m);
                }
            }
        }
        candidates
    }
}
