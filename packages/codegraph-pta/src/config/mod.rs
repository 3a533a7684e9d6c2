//! Configuration system
//!
//! Presets pick a precision policy; everything is overridable through the
//! builder setters or a YAML/JSON document supplied by the host.
//!
//! ```rust,ignore
//! use codegraph_pta::config::{EntryPoints, PtaConfig, Preset};
//!
//! let config = PtaConfig::from_preset(Preset::Balanced, EntryPoints::MainMethods);
//! let config = PtaConfig::from_yaml_str(&yaml)?;
//! ```

pub mod error;
pub mod preset;
pub mod pta_config;

// Re-exports
pub use error::{ConfigError, ConfigResult};
pub use preset::Preset;
pub use pta_config::{EntryParams, EntryPoints, PtaConfig, MAX_CONTEXT_DEPTH};
