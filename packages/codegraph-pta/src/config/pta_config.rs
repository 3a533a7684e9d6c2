//! Pointer analysis run configuration
//!
//! Injected before a run starts and never changed mid-run: contexts produced
//! by different policies are not comparable, so switching policy means a
//! fresh run.

use super::{
    error::{ConfigError, ConfigResult},
    preset::Preset,
};
use crate::features::heap_model::{ContextPolicy, HeapAbstraction};
use crate::shared::models::{MethodId, Program};
use serde::{Deserialize, Serialize};

/// Upper bound for `k` in k-limited policies
pub const MAX_CONTEXT_DEPTH: usize = 8;

/// Entry-point selection. Always an explicit host decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntryPoints {
    /// Methods named by signature (`Class.name(descriptor)`)
    Explicit { signatures: Vec<String> },

    /// Every static method named `main` that has a body
    MainMethods,

    /// Every public method that has a body
    AllPublic,
}

impl EntryPoints {
    pub fn explicit<I, S>(signatures: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Explicit {
            signatures: signatures.into_iter().map(Into::into).collect(),
        }
    }

    /// Resolve to method ids, in declaration order for the implicit
    /// policies and in the given order for explicit signatures.
    pub fn resolve(&self, program: &Program) -> ConfigResult<Vec<MethodId>> {
        let methods: Vec<MethodId> = match self {
            Self::Explicit { signatures } => {
                let mut resolved = Vec::with_capacity(signatures.len());
                for signature in signatures {
                    match program.method_by_signature(signature) {
                        Some(id) => {
                            if !resolved.contains(&id) {
                                resolved.push(id);
                            }
                        }
                        None => {
                            let declared: Vec<String> =
                                program.methods().map(|(_, m)| m.signature()).collect();
                            return Err(ConfigError::unknown_entry_point(signature, &declared));
                        }
                    }
                }
                resolved
            }
            Self::MainMethods => program
                .methods()
                .filter(|(_, m)| m.is_static && m.sig.name == "main" && m.body.is_some())
                .map(|(id, _)| id)
                .collect(),
            Self::AllPublic => program
                .methods()
                .filter(|(_, m)| m.is_public && m.body.is_some())
                .map(|(id, _)| id)
                .collect(),
        };

        if methods.is_empty() {
            return Err(ConfigError::Validation(format!(
                "entry point policy {:?} selects no method",
                self
            )));
        }
        Ok(methods)
    }
}

/// Objects supplied for `this` and parameters of entry methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryParams {
    /// Entry parameters point to nothing
    #[default]
    Empty,

    /// One mock object of the declared type per concrete reference parameter
    Mock,
}

/// Pointer analysis configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PtaConfig {
    /// Context sensitivity policy
    #[serde(default)]
    pub context_policy: ContextPolicy,

    /// Heap abstraction
    #[serde(default)]
    pub heap_abstraction: HeapAbstraction,

    /// Entry-point selection (required)
    pub entry_points: EntryPoints,

    /// Entry parameter objects
    #[serde(default)]
    pub entry_params: EntryParams,
}

impl PtaConfig {
    /// Context-insensitive configuration for the given entry points
    pub fn new(entry_points: EntryPoints) -> Self {
        Self::from_preset(Preset::Fast, entry_points)
    }

    /// Policies of `preset`, entry parameters left empty
    pub fn from_preset(preset: Preset, entry_points: EntryPoints) -> Self {
        Self {
            context_policy: preset.context_policy(),
            heap_abstraction: preset.heap_abstraction(),
            entry_points,
            entry_params: EntryParams::Empty,
        }
    }

    /// Parse from YAML
    pub fn from_yaml_str(yaml: &str) -> ConfigResult<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse from JSON
    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(k) = self.context_policy.depth() {
            if k == 0 || k > MAX_CONTEXT_DEPTH {
                return Err(ConfigError::range_with_hint(
                    "context_policy.k",
                    k,
                    1,
                    MAX_CONTEXT_DEPTH,
                    "Use the insensitive policy for k = 0",
                ));
            }
        }

        if let EntryPoints::Explicit { signatures } = &self.entry_points {
            if signatures.is_empty() {
                return Err(ConfigError::Validation(
                    "explicit entry points must name at least one method".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Builder: Set context policy
    pub fn context_policy(mut self, v: ContextPolicy) -> Self {
        self.context_policy = v;
        self
    }

    /// Builder: Set heap abstraction
    pub fn heap_abstraction(mut self, v: HeapAbstraction) -> Self {
        self.heap_abstraction = v;
        self
    }

    /// Builder: Set entry parameter objects
    pub fn entry_params(mut self, v: EntryParams) -> Self {
        self.entry_params = v;
        self
    }
}
