//! Preset configurations
//!
//! Presets pick a precision policy; entry points are always supplied by the
//! host.

use super::error::{ConfigError, ConfigResult};
use crate::features::heap_model::{ContextPolicy, HeapAbstraction};
use serde::{Deserialize, Serialize};

/// Configuration preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    /// Context-insensitive, allocation-site heap
    Fast,

    /// 1-object sensitivity; objects keep the receiver context they were
    /// allocated under
    Balanced,

    /// 2-object sensitivity with heap contexts
    Thorough,
}

impl Preset {
    /// Parse preset from string
    pub fn from_str(s: &str) -> ConfigResult<Self> {
        match s.to_lowercase().as_str() {
            "fast" => Ok(Self::Fast),
            "balanced" => Ok(Self::Balanced),
            "thorough" => Ok(Self::Thorough),
            _ => Err(ConfigError::UnknownPreset(s.to_string())),
        }
    }

    pub fn context_policy(&self) -> ContextPolicy {
        match self {
            Self::Fast => ContextPolicy::Insensitive,
            Self::Balanced => ContextPolicy::Object { k: 1 },
            Self::Thorough => ContextPolicy::Object { k: 2 },
        }
    }

    pub fn heap_abstraction(&self) -> HeapAbstraction {
        match self {
            Self::Fast => HeapAbstraction::Insensitive,
            Self::Balanced | Self::Thorough => HeapAbstraction::Sensitive,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Balanced => "balanced",
            Self::Thorough => "thorough",
        }
    }
}
