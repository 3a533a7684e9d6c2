//! Property-based tests for the solver
//!
//! Invariants that must hold for ALL generated programs:
//! - Monotonicity: every observed delta is new, and the deltas add up to
//!   the converged sets
//! - Determinism: identical input and configuration give identical results
//! - Dispatch soundness: every instance edge is a CHA dispatch candidate
//! - Precision: object sensitivity never adds allocation sites

#[path = "../common/mod.rs"]
mod common;
use common::*;

use codegraph_pta::config::{EntryPoints, Preset, PtaConfig};
use codegraph_pta::features::heap_model::ContextPolicy;
use codegraph_pta::features::points_to::{Pointer, PointsToSet};
use codegraph_pta::features::stubs::StubModel;
use codegraph_pta::shared::models::{ClassDecl, Program, Type, VarId};
use codegraph_pta::{CancellationToken, PointerAnalysis, SolverPlugin};
use proptest::prelude::*;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

const VARS: usize = 5;
const CLASSES: [&str; 3] = ["A", "B", "C"];

#[derive(Debug, Clone, Copy)]
enum Op {
    New(usize, usize),
    Copy(usize, usize),
    Store(usize, usize),
    Load(usize, usize),
    Call(usize, usize, usize),
    Null(usize),
    Cast(usize, usize),
}

fn op() -> impl Strategy<Value = Op> {
    let var = 0..VARS;
    prop_oneof![
        (var.clone(), 0..CLASSES.len()).prop_map(|(a, c)| Op::New(a, c)),
        (var.clone(), var.clone()).prop_map(|(a, b)| Op::Copy(a, b)),
        (var.clone(), var.clone()).prop_map(|(a, b)| Op::Store(a, b)),
        (var.clone(), var.clone()).prop_map(|(a, b)| Op::Load(a, b)),
        (var.clone(), var.clone(), var.clone()).prop_map(|(a, b, c)| Op::Call(a, b, c)),
        var.clone().prop_map(Op::Null),
        (var.clone(), var).prop_map(|(a, b)| Op::Cast(a, b)),
    ]
}

/// `A` with `m` returning its argument, `B extends A` overriding `m` with a
/// fresh allocation, `C extends A` inheriting; `main` runs `ops` over
/// `VARS` variables of type `A`.
fn build(ops: &[Op]) -> (Arc<Program>, Vec<VarId>) {
    let mut b = base_builder();
    b.add_class(ClassDecl::new("A").extends("Object"));
    b.add_class(ClassDecl::new("B").extends("A"));
    b.add_class(ClassDecl::new("C").extends("A"));

    let mut am = b.method("A", "m", "(LA;)LA;");
    let p = am.param("p", Type::class("A"));
    am.store_field(p, "A", "f", p);
    am.ret(Some(p));
    am.finish();

    let mut bm = b.method("B", "m", "(LA;)LA;");
    bm.param("p", Type::class("A"));
    let fresh = bm.local("fresh", Type::class("A"));
    bm.new_object(fresh, "B");
    bm.ret(Some(fresh));
    bm.finish();

    let mut m = b.method("Main", "main", "()V");
    m.set_static();
    let vars: Vec<VarId> = (0..VARS).map(|i| m.local(format!("v{}", i), Type::class("A"))).collect();
    for op in ops {
        match *op {
            Op::New(a, c) => {
                m.new_object(vars[a], CLASSES[c]);
            }
            Op::Copy(a, b) => {
                m.copy(vars[a], vars[b]);
            }
            Op::Store(a, b) => {
                m.store_field(vars[a], "A", "f", vars[b]);
            }
            Op::Load(a, b) => {
                m.load_field(vars[a], vars[b], "A", "f");
            }
            Op::Call(a, b, c) => {
                m.invoke_virtual(Some(vars[a]), vars[b], "A", "m", "(LA;)LA;", &[vars[c]]);
            }
            Op::Null(a) => {
                m.assign_null(vars[a]);
            }
            Op::Cast(a, b) => {
                m.cast(vars[a], vars[b], Type::class("B"));
            }
        }
    }
    m.finish();

    (Arc::new(b.build().expect("generated program is valid")), vars)
}

fn policies() -> impl Strategy<Value = ContextPolicy> {
    prop_oneof![
        Just(ContextPolicy::Insensitive),
        (1usize..3).prop_map(|k| ContextPolicy::CallSite { k }),
        (1usize..3).prop_map(|k| ContextPolicy::Object { k }),
    ]
}

#[derive(Default)]
struct Observed {
    sets: HashMap<Pointer, PointsToSet>,
    stale_delta: bool,
}

/// Accumulates every delta the solver announces
struct DeltaLog(Arc<Mutex<Observed>>);

impl SolverPlugin for DeltaLog {
    fn on_new_points_to(&mut self, pointer: &Pointer, diff: &PointsToSet) {
        let mut observed = self.0.lock().unwrap();
        let set = observed.sets.entry(*pointer).or_default();
        let grown = set.add_all_diff(diff);
        if diff.is_empty() || grown.len() != diff.len() {
            observed.stale_delta = true;
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_points_to_sets_only_grow(ops in prop::collection::vec(op(), 1..24), policy in policies()) {
        let (program, _) = build(&ops);
        let log = Arc::new(Mutex::new(Observed::default()));
        let result = PointerAnalysis::build(program, Arc::new(StubModel::new()), main_config().context_policy(policy))
            .unwrap()
            .with_plugin(DeltaLog(log.clone()))
            .run(&CancellationToken::new())
            .unwrap();

        let observed = log.lock().unwrap();
        prop_assert!(!observed.stale_delta);
        for (pointer, pts) in result.pointers() {
            let accumulated = observed.sets.get(pointer).cloned().unwrap_or_default();
            prop_assert_eq!(&accumulated, pts);
        }
    }

    #[test]
    fn prop_fixed_point_is_deterministic(ops in prop::collection::vec(op(), 1..24), policy in policies()) {
        let (program, vars) = build(&ops);
        let config = main_config().context_policy(policy);
        let first = analyze(program.clone(), StubModel::new(), config.clone()).unwrap();
        let second = analyze(program, StubModel::new(), config).unwrap();

        for &var in &vars {
            prop_assert_eq!(first.points_to(var), second.points_to(var));
        }
        prop_assert_eq!(first.call_graph().edges(), second.call_graph().edges());
        prop_assert_eq!(first.stats().objects, second.stats().objects);
    }

    #[test]
    fn prop_dispatch_is_sound(ops in prop::collection::vec(op(), 1..24), policy in policies()) {
        let (program, _) = build(&ops);
        let result = analyze(program, StubModel::new(), main_config().context_policy(policy)).unwrap();
        let violations = result
            .call_graph()
            .check_dispatch(result.program(), result.hierarchy(), &StubModel::new());
        prop_assert!(violations.is_empty(), "{:?}", violations);
    }

    #[test]
    fn prop_object_sensitivity_refines_insensitive(ops in prop::collection::vec(op(), 1..24)) {
        let (program, vars) = build(&ops);
        let entry = || EntryPoints::explicit(["Main.main()V"]);
        let ci = analyze(program.clone(), StubModel::new(), PtaConfig::from_preset(Preset::Fast, entry())).unwrap();
        let obj = analyze(program, StubModel::new(), PtaConfig::from_preset(Preset::Balanced, entry())).unwrap();

        for &var in &vars {
            let coarse = alloc_sites(&ci, var);
            for site in alloc_sites(&obj, var) {
                prop_assert!(coarse.contains(&site));
            }
        }
    }
}
