//! Library Stub Model
//!
//! Summaries for methods outside the analyzable program, written in the same
//! constraint vocabulary the solver lowers method bodies into:
//! - `Allocates`:   target ⊇ {new T}
//! - `Copies`:      to ⊇ from (e.g. parameter 0 to return)
//! - `StoresField`: base.f ⊇ value
//! - `LoadsField`:  target ⊇ base.f
//! - `StoresArray` / `LoadsArray`: element of base
//! - `CallsBack`:   virtual call through a parameter (listeners, comparators)
//!
//! Operands name the stubbed method's receiver, parameters, return value or
//! a stub-local temporary. Read-only configuration, loaded once per run.

use crate::config::{ConfigError, ConfigResult};
use crate::errors::{PtaError, Result};
use crate::shared::models::{FieldRef, MethodSig, Program};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Operand of a stub constraint. Written as `this`, `return`, `param<i>`
/// or `temp<i>` in YAML/JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum StubRef {
    This,
    Param(usize),
    Return,
    Temp(u32),
}

impl TryFrom<String> for StubRef {
    type Error = String;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        let s = s.trim();
        match s {
            "this" => return Ok(StubRef::This),
            "return" => return Ok(StubRef::Return),
            _ => {}
        }
        if let Some(i) = s.strip_prefix("param") {
            return i
                .parse()
                .map(StubRef::Param)
                .map_err(|_| format!("bad parameter index in stub operand '{}'", s));
        }
        if let Some(i) = s.strip_prefix("temp") {
            return i
                .parse()
                .map(StubRef::Temp)
                .map_err(|_| format!("bad temporary index in stub operand '{}'", s));
        }
        Err(format!(
            "unknown stub operand '{}' (expected this, return, param<i> or temp<i>)",
            s
        ))
    }
}

impl From<StubRef> for String {
    fn from(r: StubRef) -> Self {
        r.to_string()
    }
}

impl fmt::Display for StubRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StubRef::This => write!(f, "this"),
            StubRef::Param(i) => write!(f, "param{}", i),
            StubRef::Return => write!(f, "return"),
            StubRef::Temp(i) => write!(f, "temp{}", i),
        }
    }
}

/// One effect of a stubbed method
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StubConstraint {
    /// `target = new ty`; `ty` is a type name such as `A` or `A[]`
    Allocates { target: StubRef, ty: String },
    Copies { from: StubRef, to: StubRef },
    StoresField { base: StubRef, field: FieldRef, value: StubRef },
    LoadsField { base: StubRef, field: FieldRef, target: StubRef },
    StoresArray { base: StubRef, value: StubRef },
    LoadsArray { base: StubRef, target: StubRef },
    CallsBack {
        receiver: StubRef,
        class: String,
        method: MethodSig,
        #[serde(default)]
        args: Vec<StubRef>,
        #[serde(default)]
        result: Option<StubRef>,
    },
}

impl StubConstraint {
    /// Operands mentioned by this constraint
    pub fn operands(&self) -> Vec<StubRef> {
        match self {
            StubConstraint::Allocates { target, .. } => vec![*target],
            StubConstraint::Copies { from, to } => vec![*from, *to],
            StubConstraint::StoresField { base, value, .. }
            | StubConstraint::StoresArray { base, value } => vec![*base, *value],
            StubConstraint::LoadsField { base, target, .. }
            | StubConstraint::LoadsArray { base, target } => vec![*base, *target],
            StubConstraint::CallsBack {
                receiver,
                args,
                result,
                ..
            } => std::iter::once(*receiver)
                .chain(args.iter().copied())
                .chain(result.iter().copied())
                .collect(),
        }
    }
}

/// Type known only through stubs (no declaration in the program)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalType {
    pub name: String,
    #[serde(default)]
    pub super_class: Option<String>,
    #[serde(default)]
    pub interfaces: Vec<String>,
    #[serde(default)]
    pub is_interface: bool,
}

impl ExternalType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            super_class: None,
            interfaces: Vec::new(),
            is_interface: false,
        }
    }

    pub fn extends(mut self, super_class: impl Into<String>) -> Self {
        self.super_class = Some(super_class.into());
        self
    }
}

/// Stub summaries keyed by method signature (`Class.name(descriptor)`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StubModel {
    #[serde(default)]
    pub external_types: Vec<ExternalType>,
    #[serde(default)]
    pub stubs: BTreeMap<String, Vec<StubConstraint>>,
}

impl StubModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a summary. An empty list is a valid "no pointer effect"
    /// summary and is different from a missing stub.
    pub fn with_stub(mut self, signature: impl Into<String>, constraints: Vec<StubConstraint>) -> Self {
        self.stubs.insert(signature.into(), constraints);
        self
    }

    pub fn with_external_type(mut self, ty: ExternalType) -> Self {
        self.external_types.push(ty);
        self
    }

    pub fn stub_for(&self, signature: &str) -> Option<&[StubConstraint]> {
        self.stubs.get(signature).map(Vec::as_slice)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.stubs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.stubs.is_empty()
    }

    /// Parse from YAML
    pub fn from_yaml_str(yaml: &str) -> ConfigResult<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Parse from JSON
    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Check operands of stubs against the declarations they summarize.
    /// Stubs for methods the program does not declare are inert.
    pub fn validate(&self, program: &Program) -> Result<()> {
        for (signature, constraints) in &self.stubs {
            let Some(id) = program.method_by_signature(signature) else {
                continue;
            };
            let method = program.method(id);
            for constraint in constraints {
                for operand in constraint.operands() {
                    let bad = match operand {
                        StubRef::This => method.is_static,
                        StubRef::Param(i) => i >= method.params.len(),
                        StubRef::Return | StubRef::Temp(_) => false,
                    };
                    if bad {
                        return Err(PtaError::Config(ConfigError::Validation(format!(
                            "stub for {} uses operand '{}' the method does not have",
                            signature, operand
                        ))));
                    }
                }
            }
        }
        Ok(())
    }
}
