//! Program fixtures built through `ProgramBuilder`

use codegraph_pta::config::{EntryPoints, PtaConfig};
use codegraph_pta::features::stubs::{StubConstraint, StubModel, StubRef};
use codegraph_pta::shared::models::{ClassDecl, MethodId, Program, ProgramBuilder, StmtRef, Type, VarId};
use codegraph_pta::{CancellationToken, PointerAnalysis, PointerAnalysisResult, Result};
use std::sync::Arc;

/// Builder with the root class `Object` and a `Main` class declared
pub fn base_builder() -> ProgramBuilder {
    let mut b = ProgramBuilder::new().with_root("Object");
    b.add_class(ClassDecl::new("Object"));
    b.add_class(ClassDecl::new("Main").extends("Object"));
    b
}

pub fn main_config() -> PtaConfig {
    PtaConfig::new(EntryPoints::explicit(["Main.main()V"]))
}

pub fn analyze(program: Arc<Program>, stubs: StubModel, config: PtaConfig) -> Result<PointerAnalysisResult> {
    PointerAnalysis::build(program, Arc::new(stubs), config)?.run(&CancellationToken::new())
}

/// `A x = new A(); A y = new B(); [x = y;] x.m(); y.m();` with `B.m`
/// overriding `A.m`
pub struct DispatchFixture {
    pub program: Arc<Program>,
    pub main: MethodId,
    pub a_m: MethodId,
    pub b_m: MethodId,
    pub x: VarId,
    pub y: VarId,
    pub new_a: StmtRef,
    pub new_b: StmtRef,
    pub x_call: StmtRef,
    pub y_call: StmtRef,
}

pub fn dispatch_program(copy_y_into_x: bool) -> DispatchFixture {
    let mut b = base_builder();
    b.add_class(ClassDecl::new("A").extends("Object"));
    b.add_class(ClassDecl::new("B").extends("A"));
    let a_m = b.method("A", "m", "()V").finish();
    let b_m = b.method("B", "m", "()V").finish();

    let mut m = b.method("Main", "main", "()V");
    m.set_static();
    let x = m.local("x", Type::class("A"));
    let y = m.local("y", Type::class("A"));
    let new_a = m.new_object(x, "A");
    let new_b = m.new_object(y, "B");
    if copy_y_into_x {
        m.copy(x, y);
    }
    let x_call = m.invoke_virtual(None, x, "A", "m", "()V", &[]);
    let y_call = m.invoke_virtual(None, y, "A", "m", "()V", &[]);
    m.ret(None);
    let main = m.finish();

    DispatchFixture {
        program: Arc::new(b.build().expect("valid program")),
        main,
        a_m,
        b_m,
        x,
        y,
        new_a: StmtRef::new(main, new_a),
        new_b: StmtRef::new(main, new_b),
        x_call: StmtRef::new(main, x_call),
        y_call: StmtRef::new(main, y_call),
    }
}

/// Two factories allocate through the same `make` method:
///
/// ```text
/// Factory f1 = new Factory(); Factory f2 = new Factory();
/// Object a = f1.make(); Object b = f2.make();
/// ```
pub struct FactoryFixture {
    pub program: Arc<Program>,
    pub a: VarId,
    pub b: VarId,
    pub make_alloc: StmtRef,
}

pub fn factory_program() -> FactoryFixture {
    let mut b = base_builder();
    b.add_class(ClassDecl::new("Factory").extends("Object"));

    let mut make = b.method("Factory", "make", "()LObject;");
    let o = make.local("o", Type::class("Object"));
    let alloc = make.new_object(o, "Object");
    make.ret(Some(o));
    let make_id = make.finish();

    let mut m = b.method("Main", "main", "()V");
    m.set_static();
    let f1 = m.local("f1", Type::class("Factory"));
    let f2 = m.local("f2", Type::class("Factory"));
    let a = m.local("a", Type::class("Object"));
    let r = m.local("b", Type::class("Object"));
    m.new_object(f1, "Factory");
    m.new_object(f2, "Factory");
    m.invoke_virtual(Some(a), f1, "Factory", "make", "()LObject;", &[]);
    m.invoke_virtual(Some(r), f2, "Factory", "make", "()LObject;", &[]);
    m.finish();

    FactoryFixture {
        program: Arc::new(b.build().expect("valid program")),
        a,
        b: r,
        make_alloc: StmtRef::new(make_id, alloc),
    }
}

/// Container with `set`/`get`, two boxes holding two different objects
pub struct ContainerFixture {
    pub program: Arc<Program>,
    pub r1: VarId,
    pub r2: VarId,
    pub o1: StmtRef,
    pub o2: StmtRef,
}

pub fn container_program() -> ContainerFixture {
    let mut b = base_builder();
    b.add_class(ClassDecl::new("Box").extends("Object"));

    let mut set = b.method("Box", "set", "(LObject;)V");
    let this = set.this_var();
    let v = set.param("v", Type::class("Object"));
    set.store_field(this, "Box", "item", v);
    set.finish();

    let mut get = b.method("Box", "get", "()LObject;");
    let this = get.this_var();
    let r = get.local("r", Type::class("Object"));
    get.load_field(r, this, "Box", "item");
    get.ret(Some(r));
    get.finish();

    let mut m = b.method("Main", "main", "()V");
    m.set_static();
    let b1 = m.local("b1", Type::class("Box"));
    let b2 = m.local("b2", Type::class("Box"));
    let v1 = m.local("v1", Type::class("Object"));
    let v2 = m.local("v2", Type::class("Object"));
    let r1 = m.local("r1", Type::class("Object"));
    let r2 = m.local("r2", Type::class("Object"));
    m.new_object(b1, "Box");
    m.new_object(b2, "Box");
    let o1 = m.new_object(v1, "Object");
    let o2 = m.new_object(v2, "Object");
    m.invoke_virtual(None, b1, "Box", "set", "(LObject;)V", &[v1]);
    m.invoke_virtual(None, b2, "Box", "set", "(LObject;)V", &[v2]);
    m.invoke_virtual(Some(r1), b1, "Box", "get", "()LObject;", &[]);
    m.invoke_virtual(Some(r2), b2, "Box", "get", "()LObject;", &[]);
    let main = m.finish();

    ContainerFixture {
        program: Arc::new(b.build().expect("valid program")),
        r1,
        r2,
        o1: StmtRef::new(main, o1),
        o2: StmtRef::new(main, o2),
    }
}

/// Library method `Lib.id(LObject;)LObject;` summarized as param0 → return
pub fn identity_stub() -> StubModel {
    StubModel::new().with_stub(
        "Lib.id(LObject;)LObject;",
        vec![StubConstraint::Copies {
            from: StubRef::Param(0),
            to: StubRef::Return,
        }],
    )
}

/// Declare `Lib.id(LObject;)LObject;` as a bodyless static method
pub fn declare_library_identity(b: &mut ProgramBuilder) -> MethodId {
    b.add_class(ClassDecl::new("Lib").extends("Object"));
    let mut id = b.method("Lib", "id", "(LObject;)LObject;");
    id.set_static().set_public().without_body();
    id.param("p", Type::class("Object"));
    id.finish()
}
