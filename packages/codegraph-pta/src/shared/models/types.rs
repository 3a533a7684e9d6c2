//! Type and member references used by the program model
//!
//! References are by name; the class hierarchy resolves them once per run and
//! reports names it cannot resolve.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared type of a variable, allocation or cast
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Type {
    /// Class or interface type, by fully qualified name
    Class(String),

    /// Array of the element type
    Array(Box<Type>),

    /// Type of the `null` literal
    Null,
}

impl Type {
    #[inline]
    pub fn class(name: impl Into<String>) -> Self {
        Type::Class(name.into())
    }

    #[inline]
    pub fn array(element: Type) -> Self {
        Type::Array(Box::new(element))
    }

    /// Parse a type name: `A`, `A[]`, `A[][]` or `null`
    pub fn parse(name: &str) -> Self {
        let name = name.trim();
        if let Some(element) = name.strip_suffix("[]") {
            Type::array(Type::parse(element))
        } else if name == "null" {
            Type::Null
        } else {
            Type::class(name)
        }
    }

    /// Innermost class name, if any (`A[][]` → `A`)
    pub fn base_class(&self) -> Option<&str> {
        match self {
            Type::Class(name) => Some(name),
            Type::Array(elem) => elem.base_class(),
            Type::Null => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Class(name) => write!(f, "{}", name),
            Type::Array(elem) => write!(f, "{}[]", elem),
            Type::Null => write!(f, "null"),
        }
    }
}

/// Method subsignature: name plus descriptor, e.g. `m` + `()V`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MethodSig {
    pub name: String,
    pub descriptor: String,
}

impl MethodSig {
    pub fn new(name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            descriptor: descriptor.into(),
        }
    }
}

impl fmt::Display for MethodSig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, self.descriptor)
    }
}

/// Symbolic method reference at a call site
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodRef {
    pub class: String,
    pub sig: MethodSig,
}

impl MethodRef {
    pub fn new(class: impl Into<String>, name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            sig: MethodSig::new(name, descriptor),
        }
    }
}

impl fmt::Display for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.class, self.sig)
    }
}

/// Symbolic field reference
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FieldRef {
    pub class: String,
    pub name: String,
}

impl FieldRef {
    pub fn new(class: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.class, self.name)
    }
}
