//! Call graph construction with Class Hierarchy Analysis.
//!
//! Starting from the root methods, every reachable method body is scanned for calls.
//! Each call becomes a call site; its callees are resolved and queued in turn.
//!
//! Static calls and constructor calls resolve to the declared target. Virtual calls
//! resolve, for the declaring type and every subtype that can be instantiated, to the
//! most-derived implementation of the target's name and signature. Abstract
//! declarations never become callees.

use std::collections::BTreeSet;

use crate::{
    analysis::{callgraph::CallGraph, ClassHierarchy, ClassHierarchyAnalysis},
    body::{Dispatch, InstructionKind},
    model::{MethodDefinition, MethodRef, TypeUniverse},
    Error, Result,
};

/// Builds a [`CallGraph`] over a [`TypeUniverse`].
///
/// # Examples
///
/// ```rust
/// use flowscope::analysis::CallGraphBuilder;
/// use flowscope::body::{Dispatch, MethodBodyBuilder};
/// use flowscope::model::{MethodDefinition, MethodModifiers, MethodRef, TypeDefinition, TypeUniverse};
///
/// let main = MethodRef::from("Program::Main()");
/// let run = MethodRef::from("Program::Run()");
///
/// let mut body = MethodBodyBuilder::new(main.clone());
/// body.call(None, run.clone(), vec![], Dispatch::Static).ret(None);
///
/// let universe: TypeUniverse = [TypeDefinition::class("Program", None)
///     .with_method(MethodDefinition::new(main.clone(), MethodModifiers::STATIC).with_body(body.finish()?))
///     .with_method(MethodDefinition::new(run.clone(), MethodModifiers::STATIC))]
/// .into_iter()
/// .collect();
///
/// let graph = CallGraphBuilder::new(&universe).build(&[main.clone()])?;
/// assert!(graph.callees(&main).contains(&run));
/// # Ok::<(), flowscope::Error>(())
/// ```
#[derive(Debug)]
pub struct CallGraphBuilder<'u> {
    universe: &'u TypeUniverse,
    cha: ClassHierarchyAnalysis<'u>,
}

impl<'u> CallGraphBuilder<'u> {
    /// Creates a builder that analyzes the hierarchy of `universe` on demand.
    #[must_use]
    pub fn new(universe: &'u TypeUniverse) -> Self {
        CallGraphBuilder {
            universe,
            cha: ClassHierarchyAnalysis::new(universe),
        }
    }

    /// Creates a builder reusing an existing, possibly analyzed, hierarchy analysis.
    #[must_use]
    pub fn with_hierarchy(cha: ClassHierarchyAnalysis<'u>) -> Self {
        CallGraphBuilder {
            universe: cha.universe(),
            cha,
        }
    }

    /// Returns the methods a call to `target` may reach.
    ///
    /// A virtual call on a type outside the universe resolves to the declared target.
    /// A virtual call without any concrete implementation resolves to nothing.
    pub fn resolve(&mut self, target: &MethodRef, dispatch: Dispatch) -> BTreeSet<MethodRef> {
        let universe = self.universe;
        resolve_callees(universe, self.cha.analyze(), target, dispatch)
    }

    /// Builds the call graph reachable from `roots`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MethodNotFound`] if a root is not defined in the universe.
    pub fn build(mut self, roots: &[MethodRef]) -> Result<CallGraph> {
        let universe = self.universe;
        let mut graph = CallGraph::new();
        let mut worklist: Vec<MethodRef> = Vec::with_capacity(roots.len());

        for root in roots {
            if universe.method(root).is_none() {
                return Err(Error::MethodNotFound(root.to_string()));
            }
            graph.add_root(root.clone());
            worklist.push(root.clone());
        }

        let hierarchy = self.cha.analyze();
        let mut visited: BTreeSet<MethodRef> = BTreeSet::new();

        while let Some(method) = worklist.pop() {
            if !visited.insert(method.clone()) {
                continue;
            }
            graph.method_info_mut(&method);

            // Abstract and external methods have no body to scan
            let Some(body) = universe
                .method(&method)
                .and_then(|definition| definition.body.as_ref())
            else {
                continue;
            };

            for instruction in &body.instructions {
                let (target, dispatch) = match &instruction.kind {
                    InstructionKind::MethodCall {
                        method: target,
                        dispatch,
                        ..
                    } => (target, *dispatch),
                    InstructionKind::CreateObject { constructor, .. } => {
                        (constructor, Dispatch::Static)
                    }
                    _ => continue,
                };

                let label = instruction.label();
                graph.add_call_site(&method, &label, target.clone());

                let callees = resolve_callees(universe, hierarchy, target, dispatch);
                worklist.extend(
                    callees
                        .iter()
                        .filter(|callee| !visited.contains(*callee))
                        .cloned(),
                );
                graph.add_callees(&method, &label, callees)?;
            }
        }

        log::debug!(
            "call graph: {} methods, {} call sites from {} roots",
            graph.method_count(),
            graph.call_site_count(),
            roots.len()
        );
        Ok(graph)
    }
}

fn resolve_callees(
    universe: &TypeUniverse,
    hierarchy: &ClassHierarchy,
    target: &MethodRef,
    dispatch: Dispatch,
) -> BTreeSet<MethodRef> {
    let declared = universe.method(target);
    let is_virtual = match declared {
        Some(definition) => dispatch == Dispatch::Virtual && definition.is_virtual(),
        None => dispatch == Dispatch::Virtual,
    };
    if !is_virtual || universe.get(&target.declaring_type).is_none() {
        return BTreeSet::from([target.clone()]);
    }

    let declaring = &target.declaring_type;
    std::iter::once(declaring.clone())
        .chain(hierarchy.all_subtypes(declaring))
        .filter(|ty| !hierarchy.is_interface(ty))
        .filter_map(|ty| implementation(universe, &ty, target))
        .map(|definition| definition.reference.clone())
        .collect()
}

/// Finds the most-derived declaration of `slot` visible on `ty`, walking base types.
///
/// Returns `None` if that declaration is abstract or no declaration exists.
fn implementation<'u>(
    universe: &'u TypeUniverse,
    ty: &str,
    slot: &MethodRef,
) -> Option<&'u MethodDefinition> {
    let mut current = universe.get(ty);
    // A malformed universe may contain base-type cycles
    for _ in 0..=universe.len() {
        let definition = current?;
        if let Some(method) = definition.find_method(slot) {
            return (!method.is_abstract()).then_some(method);
        }
        current = definition.base.as_deref().and_then(|base| universe.get(base));
    }
    None
}
