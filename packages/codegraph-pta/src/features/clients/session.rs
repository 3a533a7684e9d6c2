//! Analysis session
//!
//! Owns the inputs of one analysis target and the latest converged result.
//! State machine:
//!
//! ```text
//! Configured ──run──> Converged
//!      │                  │
//!      └──────run─────────┴──> Cancelled | Failed
//! ```
//!
//! Every `run` starts from scratch and drops the previous result first, so
//! no stale fixed point survives a cancelled or failed re-analysis. Clients
//! can only be registered once a result exists; registrations then survive
//! later runs.

use super::finding::ClientReport;
use crate::config::PtaConfig;
use crate::errors::{PtaError, Result};
use crate::features::class_hierarchy::ClassHierarchy;
use crate::features::points_to::application::{PointerAnalysis, PointerAnalysisResult};
use crate::features::points_to::infrastructure::CancellationToken;
use crate::features::points_to::ports::{ClientAnalysis, SolverPlugin};
use crate::features::stubs::StubModel;
use crate::shared::models::Program;
use rayon::prelude::*;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Configured,
    Converged,
    Cancelled,
    /// Run aborted by a fatal diagnostic (message kept for the host)
    Failed(String),
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Configured => "configured",
            SessionState::Converged => "converged",
            SessionState::Cancelled => "cancelled",
            SessionState::Failed(_) => "failed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct AnalysisSession {
    program: Arc<Program>,
    hierarchy: Arc<ClassHierarchy>,
    stubs: Arc<StubModel>,
    config: PtaConfig,
    state: SessionState,
    result: Option<PointerAnalysisResult>,
    clients: Vec<Box<dyn ClientAnalysis>>,
}

impl AnalysisSession {
    /// Build the class hierarchy once; it is reused by every run
    pub fn new(program: Arc<Program>, stubs: Arc<StubModel>, config: PtaConfig) -> Result<Self> {
        let hierarchy = Arc::new(ClassHierarchy::build(&program, &stubs)?);
        Ok(Self::with_hierarchy(program, hierarchy, stubs, config))
    }

    pub fn with_hierarchy(
        program: Arc<Program>,
        hierarchy: Arc<ClassHierarchy>,
        stubs: Arc<StubModel>,
        config: PtaConfig,
    ) -> Self {
        Self {
            program,
            hierarchy,
            stubs,
            config,
            state: SessionState::Configured,
            result: None,
            clients: Vec::new(),
        }
    }

    #[inline]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    #[inline]
    pub fn config(&self) -> &PtaConfig {
        &self.config
    }

    #[inline]
    pub fn hierarchy(&self) -> &ClassHierarchy {
        &self.hierarchy
    }

    pub fn run(&mut self, token: &CancellationToken) -> Result<&PointerAnalysisResult> {
        self.run_with_plugins(token, Vec::new())
    }

    /// Solve with solver plugins attached to this run only
    pub fn run_with_plugins(
        &mut self,
        token: &CancellationToken,
        plugins: Vec<Box<dyn SolverPlugin>>,
    ) -> Result<&PointerAnalysisResult> {
        self.result = None;

        let mut analysis = PointerAnalysis::new(
            Arc::clone(&self.program),
            Arc::clone(&self.hierarchy),
            Arc::clone(&self.stubs),
            self.config.clone(),
        );
        for plugin in plugins {
            analysis = analysis.with_boxed_plugin(plugin);
        }

        match analysis.run(token) {
            Ok(result) => {
                self.state = SessionState::Converged;
                Ok(self.result.insert(result))
            }
            Err(PtaError::Cancelled) => {
                info!("Analysis cancelled, results discarded");
                self.state = SessionState::Cancelled;
                Err(PtaError::Cancelled)
            }
            Err(e) => {
                warn!("Analysis failed: {}", e);
                self.state = SessionState::Failed(e.to_string());
                Err(e)
            }
        }
    }

    /// The converged result; `AnalysisNotReady` in every other state
    pub fn result(&self) -> Result<&PointerAnalysisResult> {
        match (&self.state, &self.result) {
            (SessionState::Converged, Some(result)) => Ok(result),
            (state, _) => Err(PtaError::not_ready(state.as_str())),
        }
    }

    /// Register a client analysis. Rejected until the session converged.
    pub fn register_client(&mut self, client: impl ClientAnalysis + 'static) -> Result<()> {
        self.result()?;
        if self.clients.iter().any(|c| c.id() == client.id()) {
            warn!("Client '{}' registered twice", client.id());
        }
        self.clients.push(Box::new(client));
        Ok(())
    }

    #[inline]
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Run every registered client in parallel over the converged result
    pub fn run_clients(&self) -> Result<Vec<ClientReport>> {
        let result = self.result()?;
        let reports: Vec<ClientReport> = self
            .clients
            .par_iter()
            .map(|client| {
                let start = Instant::now();
                let findings = client.analyze(result);
                ClientReport {
                    client: client.id().to_string(),
                    findings,
                    elapsed_ms: start.elapsed().as_millis() as u64,
                }
            })
            .collect();

        info!(
            "Ran {} clients: {} findings",
            reports.len(),
            reports.iter().map(|r| r.findings.len()).sum::<usize>()
        );
        Ok(reports)
    }
}
