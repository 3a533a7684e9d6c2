/*
 * Taint Analysis Client
 *
 * Tracks data flow from sources (method results, entry parameters) to sinks
 * (arguments of dangerous calls) over the converged points-to relation.
 *
 * Taint objects:
 * - Every source point, i.e. one call site of a source method or one
 *   source parameter, creates its own taint object. Ordinary objects the
 *   variable already points to are never marked.
 * - Taint objects move along copies, casts, returns and call bindings.
 *   Field, static and array accesses go through the converged points-to
 *   sets of their base variables.
 * - Calls into library methods move taint only through configured
 *   transfers (e.g. `StringBuilder.append`)
 * - A sanitized parameter never holds taint
 *
 * Configuration is YAML/JSON:
 *
 * ```yaml
 * sources:
 *   - { kind: call, method: "Web.param(LString;)LString;" }
 *   - { kind: param, method: "App.handle(LRequest;)V", index: 0 }
 * sinks:
 *   - { method: "Db.query(LString;)V", index: 0, severity: high }
 * transfers:
 *   - { method: "Sb.append(LString;)LSb;", from: 0, to: result }
 * sanitizers:
 *   - { method: "Html.escape(LString;)LString;", index: 0 }
 * ```
 */

use super::finding::{Finding, Severity};
use super::reachable_statements;
use crate::config::{ConfigError, ConfigResult};
use crate::features::heap_model::ObjId;
use crate::features::points_to::application::PointerAnalysisResult;
use crate::features::points_to::ports::ClientAnalysis;
use crate::shared::models::{FieldRef, Invoke, MethodDecl, MethodId, Stmt, StmtRef, VarId};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};
use std::fmt;
use tracing::{debug, warn};

pub const TAINT_ID: &str = "taint";

/// Call operand: receiver, result or argument `i`. Written as `base`,
/// `result` or an integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawIndex", into = "RawIndex")]
pub enum CallIndex {
    Base,
    Result,
    Arg(usize),
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawIndex {
    Arg(usize),
    Name(String),
}

impl TryFrom<RawIndex> for CallIndex {
    type Error = String;

    fn try_from(raw: RawIndex) -> Result<Self, Self::Error> {
        match raw {
            RawIndex::Arg(i) => Ok(CallIndex::Arg(i)),
            RawIndex::Name(name) => match name.trim() {
                "base" => Ok(CallIndex::Base),
                "result" => Ok(CallIndex::Result),
                other => other
                    .parse()
                    .map(CallIndex::Arg)
                    .map_err(|_| format!("unknown call index '{}' (expected base, result or a number)", other)),
            },
        }
    }
}

impl From<CallIndex> for RawIndex {
    fn from(index: CallIndex) -> Self {
        match index {
            CallIndex::Arg(i) => RawIndex::Arg(i),
            other => RawIndex::Name(other.to_string()),
        }
    }
}

impl fmt::Display for CallIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallIndex::Base => write!(f, "base"),
            CallIndex::Result => write!(f, "result"),
            CallIndex::Arg(i) => write!(f, "{}", i),
        }
    }
}

impl CallIndex {
    fn var(self, invoke: &Invoke) -> Option<VarId> {
        match self {
            CallIndex::Base => invoke.receiver,
            CallIndex::Result => invoke.result,
            CallIndex::Arg(i) => invoke.args.get(i).copied(),
        }
    }
}

/// Where taint enters the program
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaintSource {
    /// Objects returned by calls to `method`
    Call { method: String },
    /// Objects passed as parameter `index` of `method`
    Param { method: String, index: usize },
}

impl TaintSource {
    pub fn method(&self) -> &str {
        match self {
            TaintSource::Call { method } | TaintSource::Param { method, .. } => method,
        }
    }
}

/// Argument of a call that must not receive tainted objects
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaintSink {
    pub method: String,
    pub index: CallIndex,
    #[serde(default = "default_sink_severity")]
    pub severity: Severity,
}

fn default_sink_severity() -> Severity {
    Severity::High
}

/// Taint moves from one call operand to another
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaintTransfer {
    pub method: String,
    pub from: CallIndex,
    pub to: CallIndex,
}

/// Parameter of a method body that taint never enters: `base` for the
/// receiver, or a parameter index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaintSanitizer {
    pub method: String,
    pub index: CallIndex,
}

impl TaintSanitizer {
    fn var(&self, decl: &MethodDecl) -> Option<VarId> {
        match self.index {
            CallIndex::Base => decl.this_var,
            CallIndex::Arg(i) => decl.params.get(i).copied(),
            CallIndex::Result => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaintConfig {
    #[serde(default)]
    pub sources: Vec<TaintSource>,
    #[serde(default)]
    pub sinks: Vec<TaintSink>,
    #[serde(default)]
    pub transfers: Vec<TaintTransfer>,
    #[serde(default)]
    pub sanitizers: Vec<TaintSanitizer>,
}

impl TaintConfig {
    pub fn from_yaml_str(yaml: &str) -> ConfigResult<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(t) = self.transfers.iter().find(|t| t.from == t.to) {
            return Err(ConfigError::Validation(format!(
                "taint transfer of {} moves {} onto itself",
                t.method, t.from
            )));
        }
        if let Some(s) = self.sanitizers.iter().find(|s| s.index == CallIndex::Result) {
            return Err(ConfigError::Validation(format!(
                "sanitizer of {} must name base or a parameter, not result",
                s.method
            )));
        }
        Ok(())
    }

    /// Union of two configs; entries present in both are kept once
    pub fn merge(mut self, other: TaintConfig) -> Self {
        fn extend_distinct<T: PartialEq>(into: &mut Vec<T>, from: Vec<T>) {
            for item in from {
                if !into.contains(&item) {
                    into.push(item);
                }
            }
        }
        extend_distinct(&mut self.sources, other.sources);
        extend_distinct(&mut self.sinks, other.sinks);
        extend_distinct(&mut self.transfers, other.transfers);
        extend_distinct(&mut self.sanitizers, other.sanitizers);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty() && self.sinks.is_empty()
    }
}

/// Taint object: one per source call site, or one per source parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaintLabel {
    /// Index into `TaintConfig::sources`
    pub source: usize,
    /// Call site for call sources, `None` for parameter sources
    pub site: Option<StmtRef>,
}

/// Taint object reaching a sink argument
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaintFlow {
    pub label: TaintLabel,
    pub sink_site: StmtRef,
    pub sink_index: CallIndex,
    /// Index into `TaintConfig::sinks`
    pub sink: usize,
}

type CallSites<'r> = FxHashMap<MethodId, Vec<(StmtRef, &'r Invoke)>>;

/// Holder of taint objects during propagation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum TaintNode<'r> {
    Var(VarId),
    Return(MethodId),
    /// Instance field, keyed by name
    Field(ObjId, &'r str),
    Static(&'r FieldRef),
    Array(ObjId),
}

/// Value-flow edges between taint holders, fixed once the points-to
/// relation has converged
#[derive(Debug, Default)]
struct TaintGraph<'r> {
    succs: FxHashMap<TaintNode<'r>, Vec<TaintNode<'r>>>,
    blocked: FxHashSet<TaintNode<'r>>,
}

impl<'r> TaintGraph<'r> {
    fn build(
        result: &'r PointerAnalysisResult,
        sites: &CallSites<'r>,
        transfers: &[(MethodId, &TaintTransfer)],
    ) -> Self {
        use TaintNode::*;

        let program = result.program();
        let mut graph = Self::default();
        for (site, stmt) in reachable_statements(result) {
            match stmt {
                Stmt::Copy { lhs, rhs } | Stmt::Cast { lhs, rhs, .. } => graph.add_edge(Var(*rhs), Var(*lhs)),
                Stmt::LoadField { lhs, base, field } => {
                    for obj in heap_objects(result, *base) {
                        graph.add_edge(Field(obj, field.name.as_str()), Var(*lhs));
                    }
                }
                Stmt::StoreField { base, field, rhs } => {
                    for obj in heap_objects(result, *base) {
                        graph.add_edge(Var(*rhs), Field(obj, field.name.as_str()));
                    }
                }
                Stmt::LoadStatic { lhs, field } => graph.add_edge(Static(field), Var(*lhs)),
                Stmt::StoreStatic { field, rhs } => graph.add_edge(Var(*rhs), Static(field)),
                Stmt::LoadArray { lhs, base } => {
                    for obj in heap_objects(result, *base) {
                        graph.add_edge(Array(obj), Var(*lhs));
                    }
                }
                Stmt::StoreArray { base, rhs } => {
                    for obj in heap_objects(result, *base) {
                        graph.add_edge(Var(*rhs), Array(obj));
                    }
                }
                Stmt::Return { value: Some(value) } => graph.add_edge(Var(*value), Return(site.method)),
                Stmt::Invoke(invoke) => {
                    for callee in result.callees_of(site) {
                        graph.bind_call(callee, program.method(callee), invoke);
                    }
                }
                _ => {}
            }
        }

        for (method, transfer) in transfers {
            for (_, invoke) in sites.get(method).into_iter().flatten() {
                if let (Some(from), Some(to)) = (transfer.from.var(invoke), transfer.to.var(invoke)) {
                    graph.add_edge(Var(from), Var(to));
                }
            }
        }
        graph
    }

    /// Receiver, arguments and result of a call into a method body
    fn bind_call(&mut self, callee: MethodId, decl: &MethodDecl, invoke: &Invoke) {
        if !decl.has_body() {
            return;
        }
        if let (Some(receiver), Some(this)) = (invoke.receiver, decl.this_var) {
            self.add_edge(TaintNode::Var(receiver), TaintNode::Var(this));
        }
        for (&arg, &param) in invoke.args.iter().zip(&decl.params) {
            self.add_edge(TaintNode::Var(arg), TaintNode::Var(param));
        }
        if let Some(var) = invoke.result {
            self.add_edge(TaintNode::Return(callee), TaintNode::Var(var));
        }
    }

    fn add_edge(&mut self, from: TaintNode<'r>, to: TaintNode<'r>) {
        let succs = self.succs.entry(from).or_default();
        if !succs.contains(&to) {
            succs.push(to);
        }
    }

    fn block(&mut self, var: VarId) {
        self.blocked.insert(TaintNode::Var(var));
    }

    fn successors(&self, node: &TaintNode<'r>) -> &[TaintNode<'r>] {
        self.succs.get(node).map(Vec::as_slice).unwrap_or(&[])
    }

    fn edge_count(&self) -> usize {
        self.succs.values().map(Vec::len).sum()
    }

    /// Taint objects held by every node, from the seeded source points
    fn propagate(
        &self,
        seeds: Vec<(TaintNode<'r>, TaintLabel)>,
    ) -> FxHashMap<TaintNode<'r>, BTreeSet<TaintLabel>> {
        let mut taint: FxHashMap<TaintNode<'r>, BTreeSet<TaintLabel>> = FxHashMap::default();
        let mut worklist = VecDeque::new();
        for (node, label) in seeds {
            if !self.blocked.contains(&node) && taint.entry(node).or_default().insert(label) {
                worklist.push_back(node);
            }
        }

        while let Some(node) = worklist.pop_front() {
            let Some(labels) = taint.get(&node).cloned() else {
                continue;
            };
            for &succ in self.successors(&node) {
                if self.blocked.contains(&succ) {
                    continue;
                }
                let held = taint.entry(succ).or_default();
                let before = held.len();
                held.extend(labels.iter().copied());
                if held.len() > before {
                    worklist.push_back(succ);
                }
            }
        }
        taint
    }
}

#[derive(Debug, Clone)]
pub struct TaintAnalysis {
    config: TaintConfig,
}

impl TaintAnalysis {
    pub fn new(config: TaintConfig) -> Self {
        Self { config }
    }

    #[inline]
    pub fn config(&self) -> &TaintConfig {
        &self.config
    }

    /// Every source-to-sink flow, sorted and deduplicated
    pub fn flows(&self, result: &PointerAnalysisResult) -> Vec<TaintFlow> {
        let program = result.program();
        let resolve = |signature: &str| {
            let method = program.method_by_signature(signature);
            if method.is_none() {
                warn!("Taint config names unknown method '{}'", signature);
            }
            method
        };

        let sites = call_sites(result);
        let transfers: Vec<(MethodId, &TaintTransfer)> = self
            .config
            .transfers
            .iter()
            .filter_map(|t| resolve(&t.method).map(|m| (m, t)))
            .collect();
        let mut graph = TaintGraph::build(result, &sites, &transfers);
        for sanitizer in &self.config.sanitizers {
            if let Some(var) = resolve(&sanitizer.method).and_then(|m| sanitizer.var(program.method(m))) {
                graph.block(var);
            }
        }

        // One taint object per source point
        let mut seeds = Vec::new();
        for (index, source) in self.config.sources.iter().enumerate() {
            let Some(method) = resolve(source.method()) else {
                continue;
            };
            match source {
                TaintSource::Call { .. } => {
                    for (site, invoke) in sites.get(&method).into_iter().flatten() {
                        if let Some(var) = invoke.result {
                            let label = TaintLabel { source: index, site: Some(*site) };
                            seeds.push((TaintNode::Var(var), label));
                        }
                    }
                }
                TaintSource::Param { index: param, .. } => {
                    if !result.call_graph().is_reachable(method) {
                        continue;
                    }
                    if let Some(&var) = program.method(method).params.get(*param) {
                        seeds.push((TaintNode::Var(var), TaintLabel { source: index, site: None }));
                    }
                }
            }
        }

        let seeded = seeds.len();
        let taint = graph.propagate(seeds);
        debug!(
            "Taint propagation: {} taint objects over {} edges reached {} holders",
            seeded,
            graph.edge_count(),
            taint.len()
        );

        // Sinks
        let mut flows = BTreeSet::new();
        for (sink_index, sink) in self.config.sinks.iter().enumerate() {
            let Some(method) = resolve(&sink.method) else {
                continue;
            };
            for (site, invoke) in sites.get(&method).into_iter().flatten() {
                let Some(labels) = sink.index.var(invoke).and_then(|var| taint.get(&TaintNode::Var(var))) else {
                    continue;
                };
                for &label in labels {
                    flows.insert(TaintFlow {
                        label,
                        sink_site: *site,
                        sink_index: sink.index,
                        sink: sink_index,
                    });
                }
            }
        }
        flows.into_iter().collect()
    }

    fn describe(&self, result: &PointerAnalysisResult, flow: &TaintFlow) -> String {
        let program = result.program();
        let source = &self.config.sources[flow.label.source];
        let origin = match (source, flow.label.site) {
            (TaintSource::Call { method }, Some(site)) => {
                format!("result of {} in {}", method, program.method(site.method).signature())
            }
            (TaintSource::Param { method, index }, _) => format!("parameter {} of {}", index, method),
            (TaintSource::Call { method }, None) => format!("result of {}", method),
        };
        format!(
            "{} flows to argument {} of {}",
            origin, flow.sink_index, self.config.sinks[flow.sink].method
        )
    }
}

impl ClientAnalysis for TaintAnalysis {
    fn id(&self) -> &str {
        TAINT_ID
    }

    fn analyze(&self, result: &PointerAnalysisResult) -> Vec<Finding> {
        self.flows(result)
            .iter()
            .map(|flow| {
                let severity = self.config.sinks[flow.sink].severity;
                Finding::new(TAINT_ID, severity, flow.sink_site.method, self.describe(result, flow))
                    .at(flow.sink_site)
            })
            .collect()
    }
}

/// Reachable call sites grouped by resolved callee
fn call_sites(result: &PointerAnalysisResult) -> CallSites<'_> {
    let mut sites: CallSites<'_> = FxHashMap::default();
    for (site, stmt) in reachable_statements(result) {
        if let Stmt::Invoke(invoke) = stmt {
            for callee in result.callees_of(site) {
                sites.entry(callee).or_default().push((site, invoke));
            }
        }
    }
    sites
}

fn heap_objects(result: &PointerAnalysisResult, base: VarId) -> Vec<ObjId> {
    result
        .points_to(base)
        .iter()
        .filter(|&obj| !result.is_null(obj))
        .collect()
}
