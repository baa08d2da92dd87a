//! Method body, graph and type universe factories for unit tests.

use crate::{
    analysis::{CfgEdgeKind, CfgNode, ControlFlowGraph},
    body::{BranchKind, Dispatch, HandlerKind, MethodBody, MethodBodyBuilder, Variable},
    model::{MethodDefinition, MethodModifiers, MethodRef, TypeDefinition, TypeUniverse},
    utils::graph::{DirectedGraph, NodeId},
};

/// Shorthand for `NodeId::new(index)`.
pub fn n(index: usize) -> NodeId {
    NodeId::new(index)
}

/// Builds a CFG of `node_count` nodes (Entry, Exit and empty blocks) from raw edges.
///
/// Node 0 is Entry and node 1 is Exit. Every edge is `Unconditional`.
pub fn cfg_from_edges(node_count: usize, edges: &[(usize, usize)]) -> ControlFlowGraph {
    let mut graph = DirectedGraph::with_capacity(node_count);
    graph.add_node(CfgNode::entry());
    graph.add_node(CfgNode::exit());
    for index in 2..node_count {
        graph.add_node(CfgNode::block(n(index), Vec::new()));
    }
    for &(source, target) in edges {
        graph
            .add_edge(n(source), n(target), CfgEdgeKind::Unconditional)
            .unwrap();
    }
    ControlFlowGraph::new(None, graph)
}

/// `try { 0: basic; 1: leave 4 } catch (System.Exception) { 2: basic; 3: leave 4 } 4: ret`
pub fn try_catch_body() -> MethodBody {
    guarded_body(
        "Demo::Guarded()",
        HandlerKind::Catch("System.Exception".to_string()),
        false,
    )
}

/// `try { 0: basic; 1: leave 4 } finally { 2: basic; 3: endfinally } 4: ret`
pub fn try_finally_body() -> MethodBody {
    guarded_body("Demo::Cleanup()", HandlerKind::Finally, true)
}

fn guarded_body(method: &str, handler: HandlerKind, end_finally: bool) -> MethodBody {
    let mut builder = MethodBodyBuilder::new(method.into());
    builder.label("try").unwrap();
    builder.basic(None).branch(BranchKind::Leave, "done");
    builder.label("handler").unwrap();
    builder.basic(None);
    if end_finally {
        builder.end_finally();
    } else {
        builder.branch(BranchKind::Leave, "done");
    }
    builder.label("done").unwrap();
    builder.ret(None);
    builder.region(("try", "handler"), ("handler", "done"), handler);
    builder.finish().unwrap()
}

fn body_of(method: &MethodRef, emit: impl FnOnce(&mut MethodBodyBuilder)) -> MethodBody {
    let mut builder = MethodBodyBuilder::new(method.clone());
    emit(&mut builder);
    builder.finish().unwrap()
}

fn area(ty: &str, modifiers: MethodModifiers) -> MethodDefinition {
    let reference = MethodRef::new(ty, "Area", "()");
    let definition = MethodDefinition::new(reference.clone(), modifiers);
    if modifiers.contains(MethodModifiers::ABSTRACT) {
        return definition;
    }
    definition.with_body(body_of(&reference, |b| {
        let result = Variable::local("result");
        b.constant(result.clone()).ret(Some(result));
    }))
}

/// A small shape hierarchy with a program calling into it.
///
/// ```text
/// interface IShape                          Area() abstract
/// Shape : System.Object, IShape             Area() abstract
///   Circle : Shape                          Area(), .ctor()
///   Square : Shape                          Area()
///     UnitSquare : Square                   (inherits Area)
/// Program : System.Object                   static Main(), static Helper()
/// ```
///
/// `Main` creates a `Circle` (`L_0000`), calls `IShape::Area()` virtually (`L_0001`)
/// and `Program::Helper()` statically (`L_0002`). `Helper` calls the external
/// `System.Console::WriteLine(string)`.
pub fn shapes_universe() -> TypeUniverse {
    let abstract_virtual = MethodModifiers::VIRTUAL | MethodModifiers::ABSTRACT;

    let ctor = MethodRef::new("Circle", ".ctor", "()");
    let main = MethodRef::new("Program", "Main", "()");
    let helper = MethodRef::new("Program", "Helper", "()");

    let main_body = body_of(&main, |b| {
        let (shape, size) = (Variable::local("shape"), Variable::local("size"));
        b.new_object(shape.clone(), "Circle")
            .call(
                Some(size),
                MethodRef::new("IShape", "Area", "()"),
                vec![shape],
                Dispatch::Virtual,
            )
            .call(None, helper.clone(), Vec::new(), Dispatch::Static)
            .ret(None);
    });
    let helper_body = body_of(&helper, |b| {
        let text = Variable::local("text");
        b.constant(text.clone())
            .call(
                None,
                MethodRef::new("System.Console", "WriteLine", "(string)"),
                vec![text],
                Dispatch::Static,
            )
            .ret(None);
    });
    let ctor_body = body_of(&ctor, |b| {
        b.ret(None);
    });

    [
        TypeDefinition::interface("IShape").with_method(area("IShape", abstract_virtual)),
        TypeDefinition::class("Shape", Some("System.Object"))
            .implements("IShape")
            .with_method(area("Shape", abstract_virtual)),
        TypeDefinition::class("Circle", Some("Shape"))
            .with_method(area("Circle", MethodModifiers::VIRTUAL))
            .with_method(MethodDefinition::new(ctor, MethodModifiers::empty()).with_body(ctor_body)),
        TypeDefinition::class("Square", Some("Shape"))
            .with_method(area("Square", MethodModifiers::VIRTUAL)),
        TypeDefinition::class("UnitSquare", Some("Square")),
        TypeDefinition::class("Program", Some("System.Object"))
            .with_method(
                MethodDefinition::new(main, MethodModifiers::STATIC).with_body(main_body),
            )
            .with_method(
                MethodDefinition::new(helper, MethodModifiers::STATIC).with_body(helper_body),
            ),
    ]
    .into_iter()
    .collect()
}
