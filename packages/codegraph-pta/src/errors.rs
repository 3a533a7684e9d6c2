//! Error types for codegraph-pta
//!
//! Every fatal condition aborts the whole run: a partially solved points-to
//! relation is unsound and is never handed to a client.

use crate::config::ConfigError;
use thiserror::Error;

/// Main error type for pointer analysis runs
#[derive(Debug, Error)]
pub enum PtaError {
    /// A referenced type has no declaration and no external stub
    #[error("Unresolved type '{type_name}' referenced from {referenced_from}")]
    UnresolvedType {
        type_name: String,
        referenced_from: String,
    },

    /// A reachable method has neither a body nor a library stub
    #[error("Unsound configuration: method '{method}' {reason}")]
    UnsoundConfiguration { method: String, reason: String },

    /// Host-requested abort. Not a failure; no partial results exist.
    #[error("Analysis cancelled")]
    Cancelled,

    /// Results queried (or a client registered) before convergence
    #[error("Analysis not ready: session is {state}")]
    AnalysisNotReady { state: String },

    /// Structurally broken program model (cyclic hierarchy, bad ids)
    #[error("Invalid program model: {0}")]
    InvalidProgram(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl PtaError {
    pub fn unresolved_type(type_name: impl Into<String>, referenced_from: impl Into<String>) -> Self {
        PtaError::UnresolvedType {
            type_name: type_name.into(),
            referenced_from: referenced_from.into(),
        }
    }

    pub fn unsound(method: impl Into<String>, reason: impl Into<String>) -> Self {
        PtaError::UnsoundConfiguration {
            method: method.into(),
            reason: reason.into(),
        }
    }

    pub fn not_ready(state: impl Into<String>) -> Self {
        PtaError::AnalysisNotReady {
            state: state.into(),
        }
    }

    pub fn invalid_program(msg: impl Into<String>) -> Self {
        PtaError::InvalidProgram(msg.into())
    }

    /// Fatal diagnostics abort a run. Cancellation and contract violations
    /// by the caller are not diagnostics about the analyzed program.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, PtaError::Cancelled | PtaError::AnalysisNotReady { .. })
    }
}

/// Result type alias for pointer analysis operations
pub type Result<T> = std::result::Result<T, PtaError>;
