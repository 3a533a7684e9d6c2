//! High-Level Pointer Analysis
//!
//! Wires configuration, entry-point resolution, stub validation and the
//! solver into one run.
//!
//! # Usage
//! ```text
//! use codegraph_pta::{PointerAnalysis, PtaConfig, EntryPoints, CancellationToken};
//!
//! let config = PtaConfig::new(EntryPoints::explicit(["Main.main()V"]));
//! let result = PointerAnalysis::build(program, stubs, config)?
//!     .run(&CancellationToken::new())?;
//!
//! let x = result.program().var_by_name(main, "x").unwrap();
//! for obj in result.points_to(x).iter() {
//!     println!("{}", result.describe_object(obj));
//! }
//! ```

use super::result::PointerAnalysisResult;
use crate::config::PtaConfig;
use crate::errors::Result;
use crate::features::class_hierarchy::ClassHierarchy;
use crate::features::points_to::infrastructure::{CancellationToken, Solver};
use crate::features::points_to::ports::SolverPlugin;
use crate::features::stubs::StubModel;
use crate::shared::models::Program;
use std::sync::Arc;
use tracing::debug;

/// One configured pointer analysis run
pub struct PointerAnalysis {
    program: Arc<Program>,
    hierarchy: Arc<ClassHierarchy>,
    stubs: Arc<StubModel>,
    config: PtaConfig,
    plugins: Vec<Box<dyn SolverPlugin>>,
}

impl PointerAnalysis {
    /// Run over an already built class hierarchy (shared between runs)
    pub fn new(
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
            plugins: Vec::new(),
        }
    }

    /// Build the class hierarchy, then configure a run
    pub fn build(program: Arc<Program>, stubs: Arc<StubModel>, config: PtaConfig) -> Result<Self> {
        let hierarchy = Arc::new(ClassHierarchy::build(&program, &stubs)?);
        Ok(Self::new(program, hierarchy, stubs, config))
    }

    /// Builder: observe the solver
    pub fn with_plugin(mut self, plugin: impl SolverPlugin + 'static) -> Self {
        self.plugins.push(Box::new(plugin));
        self
    }

    pub fn with_boxed_plugin(mut self, plugin: Box<dyn SolverPlugin>) -> Self {
        self.plugins.push(plugin);
        self
    }

    /// Solve to the fixed point. Any error discards the run's state.
    pub fn run(self, token: &CancellationToken) -> Result<PointerAnalysisResult> {
        self.config.validate()?;
        self.stubs.validate(&self.program)?;
        let entries = self.config.entry_points.resolve(&self.program)?;
        debug!("Resolved {} entry methods", entries.len());

        let output = {
            let mut solver = Solver::new(
                &self.program,
                &self.hierarchy,
                &self.stubs,
                &self.config,
                token.clone(),
            );
            for plugin in self.plugins {
                debug!("Registered solver plugin '{}'", plugin.name());
                solver.add_plugin(plugin);
            }
            solver.solve(&entries)?
        };

        Ok(PointerAnalysisResult::new(
            self.program,
            self.hierarchy,
            self.config,
            entries,
            output,
        ))
    }
}
