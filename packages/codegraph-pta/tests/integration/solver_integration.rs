//! End-to-end solver tests
//!
//! Builds small programs, runs the analysis and checks points-to sets, call
//! edges, diagnostics and fatal errors.

#[path = "../common/mod.rs"]
mod common;
use common::*;

use codegraph_pta::config::{ConfigError, EntryParams, EntryPoints, Preset, PtaConfig};
use codegraph_pta::features::clients::{AnalysisSession, SessionState};
use codegraph_pta::features::heap_model::{AllocSite, ContextPolicy, HeapAbstraction};
use codegraph_pta::features::points_to::DiagnosticKind;
use codegraph_pta::features::stubs::{ExternalType, StubConstraint, StubModel, StubRef};
use codegraph_pta::shared::models::{ClassDecl, MethodSig, StmtRef, Type};
use codegraph_pta::{CancellationToken, CtxId, MethodId, PtaError, SolverPlugin};
use pretty_assertions::assert_eq;
use std::sync::{Arc, Mutex};

// ═══════════════════════════════════════════════════════════════════════════
// Dispatch & propagation
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_virtual_dispatch_follows_allocation_type() {
    let f = dispatch_program(false);
    let result = analyze(f.program.clone(), StubModel::new(), main_config()).unwrap();

    assert_eq!(alloc_sites(&result, f.x), vec![f.new_a]);
    assert_eq!(alloc_sites(&result, f.y), vec![f.new_b]);
    assert_eq!(result.callees_of(f.x_call), vec![f.a_m]);
    assert_eq!(result.callees_of(f.y_call), vec![f.b_m]);
    assert!(!result.may_alias(f.x, f.y));
    assert_dispatch_sound(&result, &StubModel::new());
}

#[test]
fn test_copy_retriggers_call_resolution() {
    let f = dispatch_program(true);
    let result = analyze(f.program.clone(), StubModel::new(), main_config()).unwrap();

    assert_eq!(alloc_sites(&result, f.x), vec![f.new_a, f.new_b]);
    assert_eq!(result.callees_of(f.x_call), vec![f.a_m, f.b_m]);
    assert_eq!(result.callees_of(f.y_call), vec![f.b_m]);
    assert!(result.may_alias(f.x, f.y));
    assert_dispatch_sound(&result, &StubModel::new());
}

#[test]
fn test_callers_and_reachability() {
    let f = dispatch_program(true);
    let result = analyze(f.program.clone(), StubModel::new(), main_config()).unwrap();
    let cg = result.call_graph();

    assert!(cg.is_reachable(f.main));
    assert!(cg.is_reachable(f.b_m));
    assert_eq!(
        cg.callers_of(f.b_m),
        vec![(f.x_call, CtxId::EMPTY), (f.y_call, CtxId::EMPTY)]
    );
    assert_eq!(result.stats().reachable_methods, 3);
    assert_eq!(result.stats().call_edges, 3);
    assert!(result.diagnostics().is_empty());
}

#[test]
fn test_cast_filters_incompatible_objects() {
    let mut b = base_builder();
    b.add_class(ClassDecl::new("A").extends("Object"));
    b.add_class(ClassDecl::new("B").extends("A"));
    b.add_class(ClassDecl::new("C").extends("A"));
    let mut m = b.method("Main", "main", "()V");
    m.set_static();
    let a = m.local("a", Type::class("A"));
    let r = m.local("r", Type::class("B"));
    let new_b = m.new_object(a, "B");
    m.new_object(a, "C");
    m.cast(r, a, Type::class("B"));
    let main = m.finish();

    let result = analyze(Arc::new(b.build().unwrap()), StubModel::new(), main_config()).unwrap();
    assert_eq!(result.points_to(a).len(), 2);
    assert_eq!(alloc_sites(&result, r), vec![StmtRef::new(main, new_b)]);
}

#[test]
fn test_instance_fields_are_per_object() {
    let mut b = base_builder();
    b.add_class(ClassDecl::new("Node").extends("Object"));
    let mut m = b.method("Main", "main", "()V");
    m.set_static();
    let n1 = m.local("n1", Type::class("Node"));
    let n2 = m.local("n2", Type::class("Node"));
    let v1 = m.local("v1", Type::class("Object"));
    let v2 = m.local("v2", Type::class("Object"));
    let r1 = m.local("r1", Type::class("Object"));
    let alias = m.local("alias", Type::class("Node"));
    m.new_object(n1, "Node");
    m.new_object(n2, "Node");
    let o1 = m.new_object(v1, "Object");
    m.new_object(v2, "Object");
    m.store_field(n1, "Node", "next", v1);
    m.store_field(n2, "Node", "next", v2);
    m.copy(alias, n1);
    m.load_field(r1, alias, "Node", "next");
    let main = m.finish();

    let result = analyze(Arc::new(b.build().unwrap()), StubModel::new(), main_config()).unwrap();
    assert_eq!(alloc_sites(&result, r1), vec![StmtRef::new(main, o1)]);

    let node = result.points_to(n1).iter().next().unwrap();
    assert_eq!(result.field_points_to(node, "next").len(), 1);
    assert!(result.field_points_to(node, "missing").is_empty());
}

#[test]
fn test_inherited_field_is_shared_with_subclass_access() {
    let mut b = base_builder();
    b.add_class(ClassDecl::new("Base").extends("Object"));
    b.add_class(ClassDecl::new("Derived").extends("Base"));
    let mut m = b.method("Main", "main", "()V");
    m.set_static();
    let d = m.local("d", Type::class("Derived"));
    let v = m.local("v", Type::class("Object"));
    let r = m.local("r", Type::class("Object"));
    m.new_object(d, "Derived");
    let o = m.new_object(v, "Object");
    m.store_field(d, "Base", "f", v);
    m.load_field(r, d, "Derived", "f");
    let main = m.finish();

    let result = analyze(Arc::new(b.build().unwrap()), StubModel::new(), main_config()).unwrap();
    assert_eq!(alloc_sites(&result, r), vec![StmtRef::new(main, o)]);
}

#[test]
fn test_static_fields_cross_methods() {
    let mut b = base_builder();
    let mut init = b.method("Main", "init", "()V");
    init.set_static();
    let v = init.local("v", Type::class("Object"));
    let alloc = init.new_object(v, "Object");
    init.store_static("Main", "INSTANCE", v);
    let init_id = init.finish();

    let mut m = b.method("Main", "main", "()V");
    m.set_static();
    let r = m.local("r", Type::class("Object"));
    m.invoke_static(None, "Main", "init", "()V", &[]);
    m.load_static(r, "Main", "INSTANCE");
    m.finish();

    let result = analyze(Arc::new(b.build().unwrap()), StubModel::new(), main_config()).unwrap();
    assert_eq!(alloc_sites(&result, r), vec![StmtRef::new(init_id, alloc)]);

    let field = codegraph_pta::shared::models::FieldRef::new("Main", "INSTANCE");
    assert_eq!(result.static_field_points_to(&field).len(), 1);
}

#[test]
fn test_array_elements_and_array_dispatch() {
    let mut b = base_builder();
    let hash = {
        let mut h = b.method("Object", "hashCode", "()I");
        h.set_public();
        h.finish()
    };
    let mut m = b.method("Main", "main", "()V");
    m.set_static();
    let arr = m.local("arr", Type::array(Type::class("Object")));
    let v = m.local("v", Type::class("Object"));
    let r = m.local("r", Type::class("Object"));
    m.new_array(arr, Type::class("Object"));
    let o = m.new_object(v, "Object");
    m.store_array(arr, v);
    m.load_array(r, arr);
    let call = m.invoke_virtual(None, arr, "Object", "hashCode", "()I", &[]);
    let main = m.finish();

    let result = analyze(Arc::new(b.build().unwrap()), StubModel::new(), main_config()).unwrap();
    assert_eq!(alloc_sites(&result, r), vec![StmtRef::new(main, o)]);

    let array = result.points_to(arr).iter().next().unwrap();
    assert_eq!(result.array_points_to(array).len(), 1);
    assert_eq!(result.callees_of(StmtRef::new(main, call)), vec![hash]);
    assert_dispatch_sound(&result, &StubModel::new());
}

#[test]
fn test_null_receiver_resolves_nothing() {
    let mut b = base_builder();
    b.add_class(ClassDecl::new("A").extends("Object"));
    b.method("A", "m", "()V").finish();
    let mut m = b.method("Main", "main", "()V");
    m.set_static();
    let x = m.local("x", Type::class("A"));
    m.assign_null(x);
    let call = m.invoke_virtual(None, x, "A", "m", "()V", &[]);
    let main = m.finish();

    let result = analyze(Arc::new(b.build().unwrap()), StubModel::new(), main_config()).unwrap();
    let null = result.null_object().expect("null object allocated");
    assert!(result.points_to(x).contains(null));
    assert!(result.callees_of(StmtRef::new(main, call)).is_empty());
    assert!(!result.may_alias(x, x));
    assert_eq!(result.describe_object(null), "null");
}

#[test]
fn test_recursion_terminates() {
    let mut b = base_builder();
    let mut rec = b.method("Main", "loop", "(LObject;)LObject;");
    rec.set_static();
    let p = rec.param("p", Type::class("Object"));
    let r = rec.local("r", Type::class("Object"));
    rec.invoke_static(Some(r), "Main", "loop", "(LObject;)LObject;", &[p]);
    rec.ret(Some(p));
    let loop_id = rec.finish();

    let mut m = b.method("Main", "main", "()V");
    m.set_static();
    let v = m.local("v", Type::class("Object"));
    let out = m.local("out", Type::class("Object"));
    m.new_object(v, "Object");
    m.invoke_static(Some(out), "Main", "loop", "(LObject;)LObject;", &[v]);
    m.finish();

    let program = Arc::new(b.build().unwrap());
    for policy in [ContextPolicy::Insensitive, ContextPolicy::CallSite { k: 2 }] {
        let config = main_config().context_policy(policy);
        let result = analyze(program.clone(), StubModel::new(), config).unwrap();
        assert_eq!(result.points_to(out).len(), 1);
        assert_eq!(result.call_graph().recursive_methods(), vec![loop_id]);
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Context sensitivity
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_object_sensitivity_separates_factory_allocations() {
    let f = factory_program();
    let config = main_config()
        .context_policy(ContextPolicy::Object { k: 1 })
        .heap_abstraction(HeapAbstraction::Sensitive);
    let result = analyze(f.program.clone(), StubModel::new(), config).unwrap();

    assert_eq!(result.objects_at(f.make_alloc).len(), 2);
    assert_eq!(result.points_to(f.a).len(), 1);
    assert_eq!(result.points_to(f.b).len(), 1);
    assert!(!result.may_alias(f.a, f.b));
}

#[test]
fn test_object_presets_isolate_factory_allocations() {
    let f = factory_program();
    for preset in [Preset::Balanced, Preset::Thorough] {
        let config = PtaConfig::from_preset(preset, EntryPoints::explicit(["Main.main()V"]));
        let result = analyze(f.program.clone(), StubModel::new(), config).unwrap();
        assert_eq!(result.objects_at(f.make_alloc).len(), 2, "preset {:?}", preset);
        assert!(!result.may_alias(f.a, f.b), "preset {:?}", preset);
    }
}

#[test]
fn test_insensitive_heap_merges_factory_allocations() {
    let f = factory_program();
    let fast = PtaConfig::from_preset(Preset::Fast, EntryPoints::explicit(["Main.main()V"]));
    let obj_only = main_config().context_policy(ContextPolicy::Object { k: 1 });
    for config in [fast, obj_only] {
        let result = analyze(f.program.clone(), StubModel::new(), config).unwrap();
        assert_eq!(result.objects_at(f.make_alloc).len(), 1);
        assert!(result.may_alias(f.a, f.b));
    }
}

#[test]
fn test_object_sensitivity_separates_containers() {
    let f = container_program();

    let ci = analyze(f.program.clone(), StubModel::new(), main_config()).unwrap();
    assert_eq!(alloc_sites(&ci, f.r1), vec![f.o1, f.o2]);

    let config = PtaConfig::from_preset(Preset::Balanced, EntryPoints::explicit(["Main.main()V"]));
    let obj = analyze(f.program.clone(), StubModel::new(), config).unwrap();
    assert_eq!(alloc_sites(&obj, f.r1), vec![f.o1]);
    assert_eq!(alloc_sites(&obj, f.r2), vec![f.o2]);

    let set = obj.program().method_by_signature("Box.set(LObject;)V").unwrap();
    assert_eq!(obj.contexts_of(set).len(), 2);
}

#[test]
fn test_call_site_sensitivity_separates_static_helper() {
    let mut b = base_builder();
    let mut id = b.method("Main", "id", "(LObject;)LObject;");
    id.set_static();
    let p = id.param("p", Type::class("Object"));
    id.ret(Some(p));
    id.finish();

    let mut m = b.method("Main", "main", "()V");
    m.set_static();
    let v1 = m.local("v1", Type::class("Object"));
    let v2 = m.local("v2", Type::class("Object"));
    let a = m.local("a", Type::class("Object"));
    let c = m.local("c", Type::class("Object"));
    let o1 = m.new_object(v1, "Object");
    m.new_object(v2, "Object");
    m.invoke_static(Some(a), "Main", "id", "(LObject;)LObject;", &[v1]);
    m.invoke_static(Some(c), "Main", "id", "(LObject;)LObject;", &[v2]);
    let main = m.finish();
    let program = Arc::new(b.build().unwrap());

    let ci = analyze(program.clone(), StubModel::new(), main_config()).unwrap();
    assert_eq!(ci.points_to(a).len(), 2);

    let config = main_config().context_policy(ContextPolicy::CallSite { k: 1 });
    let cs = analyze(program, StubModel::new(), config).unwrap();
    assert_eq!(alloc_sites(&cs, a), vec![StmtRef::new(main, o1)]);
    assert_eq!(cs.points_to(c).len(), 1);

    let p_contexts: Vec<_> = cs.contexts_of(cs.program().var(p).method);
    assert_eq!(p_contexts.len(), 2);
    for ctx in p_contexts {
        assert_eq!(cs.points_to_in(p, ctx).len(), 1);
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Library stubs
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_stub_summary_flows_like_a_body() {
    let mut b = base_builder();
    declare_library_identity(&mut b);
    let mut m = b.method("Main", "main", "()V");
    m.set_static();
    let v = m.local("v", Type::class("Object"));
    let r = m.local("r", Type::class("Object"));
    let o = m.new_object(v, "Object");
    m.invoke_static(Some(r), "Lib", "id", "(LObject;)LObject;", &[v]);
    let main = m.finish();

    let result = analyze(Arc::new(b.build().unwrap()), identity_stub(), main_config()).unwrap();
    assert_eq!(alloc_sites(&result, r), vec![StmtRef::new(main, o)]);
    assert_eq!(result.stats().lowered_methods, 2);
}

#[test]
fn test_stub_allocates_external_type() {
    let mut b = base_builder();
    b.add_class(ClassDecl::new("Lib").extends("Object"));
    let mut open = b.method("Lib", "open", "()Lio.Handle;");
    open.set_static().without_body();
    open.finish();

    let mut m = b.method("Main", "main", "()V");
    m.set_static();
    let h = m.local("h", Type::class("io.Handle"));
    m.invoke_static(Some(h), "Lib", "open", "()Lio.Handle;", &[]);
    m.finish();

    let stubs = StubModel::new()
        .with_external_type(ExternalType::new("io.Handle").extends("Object"))
        .with_stub(
            "Lib.open()Lio.Handle;",
            vec![StubConstraint::Allocates {
                target: StubRef::Return,
                ty: "io.Handle".to_string(),
            }],
        );
    let result = analyze(Arc::new(b.build().unwrap()), stubs, main_config()).unwrap();

    let objs: Vec<_> = result.points_to(h).iter().collect();
    assert_eq!(objs.len(), 1);
    assert!(matches!(result.object(objs[0]).site, AllocSite::Stub { index: 0, .. }));
    assert!(result.describe_object(objs[0]).starts_with("new io.Handle@stub:"));
}

#[test]
fn test_stub_callback_dispatches_on_argument() {
    let mut b = base_builder();
    b.add_class(ClassDecl::new("Runnable").interface());
    b.add_class(ClassDecl::new("Task").extends("Object").implements("Runnable"));
    b.add_class(ClassDecl::new("Lib").extends("Object"));
    let mut run_decl = b.method("Runnable", "run", "()V");
    run_decl.set_abstract();
    run_decl.finish();
    let task_run = b.method("Task", "run", "()V").finish();
    let mut exec = b.method("Lib", "exec", "(LRunnable;)V");
    exec.set_static().without_body();
    exec.param("r", Type::class("Runnable"));
    let exec_id = exec.finish();

    let mut m = b.method("Main", "main", "()V");
    m.set_static();
    let t = m.local("t", Type::class("Task"));
    m.new_object(t, "Task");
    m.invoke_static(None, "Lib", "exec", "(LRunnable;)V", &[t]);
    m.finish();

    let stubs = StubModel::new().with_stub(
        "Lib.exec(LRunnable;)V",
        vec![StubConstraint::CallsBack {
            receiver: StubRef::Param(0),
            class: "Runnable".to_string(),
            method: MethodSig::new("run", "()V"),
            args: Vec::new(),
            result: None,
        }],
    );
    let result = analyze(Arc::new(b.build().unwrap()), stubs.clone(), main_config()).unwrap();

    assert!(result.call_graph().is_reachable(task_run));
    assert_eq!(result.callees_of(StmtRef::new(exec_id, 0)), vec![task_run]);
    assert_dispatch_sound(&result, &stubs);
}

#[test]
fn test_stub_from_yaml() {
    let yaml = r#"
stubs:
  "Lib.id(LObject;)LObject;":
    - { kind: copies, from: param0, to: return }
"#;
    let stubs = StubModel::from_yaml_str(yaml).unwrap();
    assert_eq!(stubs.stub_for("Lib.id(LObject;)LObject;"), identity_stub().stub_for("Lib.id(LObject;)LObject;"));
}

// ═══════════════════════════════════════════════════════════════════════════
// Fatal errors & diagnostics
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_reachable_method_without_body_or_stub_is_fatal() {
    let mut b = base_builder();
    declare_library_identity(&mut b);
    let mut m = b.method("Main", "main", "()V");
    m.set_static();
    let v = m.local("v", Type::class("Object"));
    m.new_object(v, "Object");
    m.invoke_static(None, "Lib", "id", "(LObject;)LObject;", &[v]);
    m.finish();

    let err = analyze(Arc::new(b.build().unwrap()), StubModel::new(), main_config()).unwrap_err();
    match err {
        PtaError::UnsoundConfiguration { method, .. } => assert_eq!(method, "Lib.id(LObject;)LObject;"),
        other => panic!("expected UnsoundConfiguration, got {:?}", other),
    }
}

#[test]
fn test_unreached_bodyless_method_needs_no_stub() {
    let mut b = base_builder();
    declare_library_identity(&mut b);
    let mut m = b.method("Main", "main", "()V");
    m.set_static();
    m.finish();

    assert!(analyze(Arc::new(b.build().unwrap()), StubModel::new(), main_config()).is_ok());
}

#[test]
fn test_unresolved_type_is_fatal() {
    let mut b = base_builder();
    let mut m = b.method("Main", "main", "()V");
    m.set_static();
    let v = m.local("v", Type::class("Missing"));
    m.new_object(v, "Missing");
    m.finish();

    let err = analyze(Arc::new(b.build().unwrap()), StubModel::new(), main_config()).unwrap_err();
    assert!(matches!(err, PtaError::UnresolvedType { ref type_name, .. } if type_name == "Missing"));
    assert!(err.is_fatal());
}

#[test]
fn test_unknown_entry_point_is_a_config_error() {
    let f = dispatch_program(false);
    let config = PtaConfig::new(EntryPoints::explicit(["Main.mian()V"]));
    let err = analyze(f.program, StubModel::new(), config).unwrap_err();
    assert!(matches!(err, PtaError::Config(ConfigError::UnknownEntryPoint(..))));
}

#[test]
fn test_unresolved_calls_are_diagnostics() {
    let mut b = base_builder();
    b.add_class(ClassDecl::new("Shape").interface());
    b.add_class(ClassDecl::new("Blob").extends("Object").implements("Shape"));
    let mut area = b.method("Shape", "area", "()V");
    area.set_abstract();
    area.finish();

    let mut m = b.method("Main", "main", "()V");
    m.set_static();
    let s = m.local("s", Type::class("Shape"));
    m.new_object(s, "Blob");
    let dispatch = m.invoke_interface(None, s, "Shape", "area", "()V", &[]);
    let missing = m.invoke_static(None, "Main", "nothing", "()V", &[]);
    let main = m.finish();

    let result = analyze(Arc::new(b.build().unwrap()), StubModel::new(), main_config()).unwrap();
    let kinds: Vec<_> = result.diagnostics().iter().map(|d| (d.kind, d.site)).collect();
    assert!(kinds.contains(&(DiagnosticKind::UnresolvedDispatch, StmtRef::new(main, dispatch))));
    assert!(kinds.contains(&(DiagnosticKind::UnresolvedCall, StmtRef::new(main, missing))));
    assert_eq!(result.stats().diagnostics, 2);
}

// ═══════════════════════════════════════════════════════════════════════════
// Entry points
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_mock_entry_parameters() {
    let mut b = base_builder();
    b.add_class(ClassDecl::new("A").extends("Object"));
    let a_m = b.method("A", "m", "()V").finish();
    let mut h = b.method("Main", "handle", "(LA;)V");
    h.set_public();
    let p = h.param("p", Type::class("A"));
    h.invoke_virtual(None, p, "A", "m", "()V", &[]);
    h.finish();
    let program = Arc::new(b.build().unwrap());

    let entry = EntryPoints::explicit(["Main.handle(LA;)V"]);
    let empty = analyze(program.clone(), StubModel::new(), PtaConfig::new(entry.clone())).unwrap();
    assert!(empty.points_to(p).is_empty());
    assert!(!empty.call_graph().is_reachable(a_m));

    let mocked = analyze(
        program,
        StubModel::new(),
        PtaConfig::new(entry).entry_params(EntryParams::Mock),
    )
    .unwrap();
    assert_eq!(mocked.points_to(p).len(), 1);
    assert!(mocked.call_graph().is_reachable(a_m));
}

#[test]
fn test_mock_slots_count_this_first() {
    let mut b = base_builder();
    b.add_class(ClassDecl::new("A").extends("Object"));
    let mut inst = b.method("Main", "run", "(LA;)V");
    let q = inst.param("q", Type::class("A"));
    let run = inst.finish();
    let mut stat = b.method("Main", "boot", "(LA;)V");
    stat.set_static();
    let p = stat.param("p", Type::class("A"));
    let boot = stat.finish();
    let program = Arc::new(b.build().unwrap());

    let entry = EntryPoints::explicit(["Main.run(LA;)V", "Main.boot(LA;)V"]);
    let result = analyze(program, StubModel::new(), PtaConfig::new(entry).entry_params(EntryParams::Mock)).unwrap();

    let site_of = |var| {
        let pts = result.points_to(var);
        assert_eq!(pts.len(), 1);
        let obj = pts.iter().next().unwrap();
        result.object(obj).site
    };
    assert_eq!(site_of(q), AllocSite::EntryMock { method: run, param: 1 });
    assert_eq!(site_of(p), AllocSite::EntryMock { method: boot, param: 0 });
}

#[test]
fn test_main_methods_entry_policy() {
    let f = dispatch_program(false);
    let result = analyze(f.program.clone(), StubModel::new(), PtaConfig::new(EntryPoints::MainMethods)).unwrap();
    assert_eq!(result.entry_methods(), &[f.main]);
}

// ═══════════════════════════════════════════════════════════════════════════
// Cancellation & plugins
// ═══════════════════════════════════════════════════════════════════════════

/// Cancels the run once `after` methods became reachable
struct CancelAfter {
    token: CancellationToken,
    after: usize,
    seen: usize,
}

impl SolverPlugin for CancelAfter {
    fn name(&self) -> &str {
        "cancel-after"
    }

    fn on_new_method(&mut self, _method: MethodId, _ctx: CtxId) {
        self.seen += 1;
        if self.seen >= self.after {
            self.token.cancel();
        }
    }
}

#[test]
fn test_cancellation_mid_run_leaves_no_result() {
    let f = dispatch_program(true);
    let mut session = AnalysisSession::new(f.program.clone(), Arc::new(StubModel::new()), main_config()).unwrap();
    session.run(&CancellationToken::new()).unwrap();

    let token = CancellationToken::new();
    let plugin = CancelAfter {
        token: token.clone(),
        after: 2,
        seen: 0,
    };
    let err = session.run_with_plugins(&token, vec![Box::new(plugin)]).unwrap_err();
    assert!(matches!(err, PtaError::Cancelled));
    assert!(!err.is_fatal());
    assert_eq!(session.state(), &SessionState::Cancelled);
    assert!(matches!(session.result(), Err(PtaError::AnalysisNotReady { .. })));
}

#[derive(Default)]
struct Recorder {
    methods: usize,
    edges: usize,
    finished: bool,
}

struct SharedRecorder(Arc<Mutex<Recorder>>);

impl SolverPlugin for SharedRecorder {
    fn on_new_method(&mut self, _method: MethodId, _ctx: CtxId) {
        self.0.lock().unwrap().methods += 1;
    }

    fn on_new_call_edge(&mut self, _edge: &codegraph_pta::CallEdge) {
        self.0.lock().unwrap().edges += 1;
    }

    fn on_finish(&mut self, _stats: &codegraph_pta::features::points_to::SolverStats) {
        self.0.lock().unwrap().finished = true;
    }
}

#[test]
fn test_plugin_observes_every_addition() {
    let f = dispatch_program(true);
    let recorder = Arc::new(Mutex::new(Recorder::default()));
    let result = codegraph_pta::PointerAnalysis::build(f.program.clone(), Arc::new(StubModel::new()), main_config())
        .unwrap()
        .with_plugin(SharedRecorder(recorder.clone()))
        .run(&CancellationToken::new())
        .unwrap();

    let recorder = recorder.lock().unwrap();
    assert!(recorder.finished);
    assert_eq!(recorder.methods, result.stats().reachable_contexts);
    assert_eq!(recorder.edges, result.stats().call_edges);
}
