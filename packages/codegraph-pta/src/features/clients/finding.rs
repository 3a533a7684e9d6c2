//! Client findings
//!
//! Findings point at a method and, when there is one, the statement that
//! triggered them. Rendering to source locations is the host's job.

use crate::shared::models::{MethodId, StmtRef};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Finding severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One issue reported by a client analysis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// Id of the reporting client
    pub client: String,
    pub severity: Severity,
    pub method: MethodId,
    #[serde(default)]
    pub site: Option<StmtRef>,
    pub message: String,
}

impl Finding {
    pub fn new(client: &str, severity: Severity, method: MethodId, message: impl Into<String>) -> Self {
        Self {
            client: client.to_string(),
            severity,
            method,
            site: None,
            message: message.into(),
        }
    }

    pub fn at(mut self, site: StmtRef) -> Self {
        self.site = Some(site);
        self
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.site {
            Some(site) => write!(f, "[{}] {} at {}: {}", self.severity, self.client, site, self.message),
            None => write!(f, "[{}] {}: {}", self.severity, self.client, self.message),
        }
    }
}

/// Findings of one client over one converged result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientReport {
    pub client: String,
    pub findings: Vec<Finding>,
    pub elapsed_ms: u64,
}

impl ClientReport {
    #[inline]
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }

    /// Findings at or above `severity`
    pub fn at_least(&self, severity: Severity) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(move |f| f.severity <= severity)
    }
}
