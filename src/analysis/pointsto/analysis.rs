//! Intraprocedural may-alias analysis producing [`PointsToGraph`]s.
//!
//! Every program point holds a points-to graph. Allocation sites, static loads and
//! call results get one abstract node per instruction offset, so re-running the
//! transfer function of a block in a later pass reuses the same nodes and the
//! analysis reaches a fixpoint.
//!
//! | Instruction | Effect on `dest` |
//! |---|---|
//! | `new T` / `new T[]` | strong update to the site's Object node |
//! | `null` | strong update to Null |
//! | `dest = source` | strong update to the targets of `source` |
//! | `dest = base.f` | targets of `f` edges of every base; an Unknown base gets a per-site Unknown target |
//! | `base.f = value` | weak update: `f` edges from every base to every target of `value` |
//! | static load, call result | strong update to the site's Unknown node |
//! | any other definition | cleared |

use std::{collections::HashMap, sync::Arc};

use crate::{
    analysis::{
        dataflow::{DataFlowAnalysis, DataFlowResults, Direction},
        pointsto::{PointsToGraph, PtgNode, PtgNodeId, PtgNodeIdAllocator, PtgNodeKind},
        ControlFlowGraph,
    },
    body::{FieldRef, Instruction, InstructionKind, MethodBody, Variable},
    model::TypeName,
    utils::graph::NodeId,
    Result,
};

/// Points-to analysis over one method body.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use flowscope::analysis::{CfgBuilder, DataFlowSolver, PointsToAnalysis, PtgNodeIdAllocator};
/// use flowscope::body::{MethodBodyBuilder, Variable};
///
/// let (a, b) = (Variable::local("a"), Variable::local("b"));
/// let mut builder = MethodBodyBuilder::new("Demo::Alias()".into());
/// builder.new_object(a.clone(), "Foo").copy(b.clone(), a.clone()).ret(None);
/// let body = builder.finish()?;
/// let cfg = CfgBuilder::new().build(&body)?;
///
/// let analysis = PointsToAnalysis::new(&body, Arc::new(PtgNodeIdAllocator::new()))?;
/// let results = DataFlowSolver::new(analysis).solve(&cfg)?;
/// let graph = results.graph_at_exit().unwrap();
/// assert!(graph.may_alias(&a, &b));
/// # Ok::<(), flowscope::Error>(())
/// ```
#[derive(Debug)]
pub struct PointsToAnalysis {
    ids: Arc<PtgNodeIdAllocator>,
    entry: PointsToGraph,
    /// Instruction offset -> the abstract node created there
    sites: HashMap<u32, PtgNode>,
}

impl PointsToAnalysis {
    /// Prepares the analysis of `body`. Each parameter starts out pointing to its own
    /// Unknown node.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PtgIdExhausted`](crate::Error::PtgIdExhausted) if `ids` runs out
    /// of ids.
    pub fn new(body: &MethodBody, ids: Arc<PtgNodeIdAllocator>) -> Result<Self> {
        let mut entry = PointsToGraph::with_allocator(&ids);
        for parameter in &body.parameters {
            let node = entry.new_node(&ids, PtgNodeKind::Unknown, parameter.ty.clone(), None)?;
            entry.points_to(parameter, node)?;
        }
        Ok(PointsToAnalysis {
            ids,
            entry,
            sites: HashMap::new(),
        })
    }

    /// Returns the id allocator shared by all graphs of this analysis.
    #[must_use]
    pub fn ids(&self) -> &Arc<PtgNodeIdAllocator> {
        &self.ids
    }

    /// Returns the node for the site at `offset`, allocating it on first use.
    fn site(&mut self, offset: u32, kind: PtgNodeKind, ty: Option<TypeName>) -> Result<PtgNode> {
        if let Some(node) = self.sites.get(&offset) {
            return Ok(node.clone());
        }
        let node = PtgNode::new(self.ids.allocate()?, kind, ty, Some(offset));
        self.sites.insert(offset, node.clone());
        Ok(node)
    }

    fn assign(graph: &mut PointsToGraph, dest: &Variable, targets: &[PtgNodeId]) -> Result<()> {
        graph.remove_edges(dest);
        for &target in targets {
            graph.points_to(dest, target)?;
        }
        Ok(())
    }

    fn assign_site(
        &mut self,
        graph: &mut PointsToGraph,
        dest: &Variable,
        offset: u32,
        kind: PtgNodeKind,
        ty: Option<TypeName>,
    ) -> Result<()> {
        let node = graph.add_node(self.site(offset, kind, ty)?)?;
        Self::assign(graph, dest, &[node])
    }

    fn load(
        &mut self,
        graph: &mut PointsToGraph,
        offset: u32,
        dest: &Variable,
        base: &Variable,
        field: &FieldRef,
    ) -> Result<()> {
        let bases: Vec<PtgNodeId> = graph.targets(base).collect();
        let mut loaded = Vec::new();
        for base in bases {
            let Some(base_node) = graph.node(base) else {
                continue;
            };
            if base_node.is_null() {
                continue;
            }
            if base_node.is_unknown() {
                let site = self.site(offset, PtgNodeKind::Unknown, dest.ty.clone())?;
                let unknown = graph.add_node(site)?;
                graph.points_to_field(base, field, unknown)?;
            }
            loaded.extend(graph.field_targets(base, field));
        }
        loaded.sort_unstable();
        loaded.dedup();
        Self::assign(graph, dest, &loaded)
    }

    fn store(
        graph: &mut PointsToGraph,
        base: &Variable,
        field: &FieldRef,
        value: &Variable,
    ) -> Result<()> {
        let values: Vec<PtgNodeId> = graph.targets(value).collect();
        let bases: Vec<PtgNodeId> = graph
            .targets(base)
            .filter(|&id| id != PtgNodeId::NULL)
            .collect();
        for base in bases {
            for &value in &values {
                graph.points_to_field(base, field, value)?;
            }
        }
        Ok(())
    }

    fn apply(&mut self, graph: &mut PointsToGraph, instruction: &Instruction) -> Result<()> {
        let offset = instruction.offset;
        match &instruction.kind {
            InstructionKind::CreateObject {
                dest, object_type, ..
            } => self.assign_site(
                graph,
                dest,
                offset,
                PtgNodeKind::Object,
                Some(object_type.clone()),
            ),
            InstructionKind::CreateArray { dest, element_type } => self.assign_site(
                graph,
                dest,
                offset,
                PtgNodeKind::Object,
                Some(format!("{element_type}[]")),
            ),
            InstructionKind::LoadNull { dest } => Self::assign(graph, dest, &[PtgNodeId::NULL]),
            InstructionKind::Copy { dest, source } => {
                let targets: Vec<PtgNodeId> = graph.targets(source).collect();
                Self::assign(graph, dest, &targets)
            }
            InstructionKind::LoadField {
                dest,
                instance,
                field,
            } => self.load(graph, offset, dest, instance, field),
            InstructionKind::LoadElement { dest, array } => {
                self.load(graph, offset, dest, array, &FieldRef::elements())
            }
            InstructionKind::StoreField {
                instance,
                field,
                value,
            } => Self::store(graph, instance, field, value),
            InstructionKind::StoreElement { array, value } => {
                Self::store(graph, array, &FieldRef::elements(), value)
            }
            InstructionKind::LoadStaticField { dest, .. }
            | InstructionKind::MethodCall {
                result: Some(dest),
                ..
            } => self.assign_site(graph, dest, offset, PtgNodeKind::Unknown, dest.ty.clone()),
            _ => {
                if let Some(dest) = instruction.defined_variable() {
                    graph.remove_edges(dest);
                }
                Ok(())
            }
        }
    }
}

impl DataFlowAnalysis for PointsToAnalysis {
    type Fact = PointsToGraph;
    const DIRECTION: Direction = Direction::Forward;
    const NAME: &'static str = "points-to";

    fn boundary(&self, _cfg: &ControlFlowGraph) -> PointsToGraph {
        self.entry.clone()
    }

    fn initial(&self, _cfg: &ControlFlowGraph) -> PointsToGraph {
        PointsToGraph::with_allocator(&self.ids)
    }

    fn join(&self, facts: &[&PointsToGraph]) -> Result<PointsToGraph> {
        let Some((first, rest)) = facts.split_first() else {
            return Ok(PointsToGraph::with_allocator(&self.ids));
        };
        let mut joined = (*first).clone();
        for other in rest {
            joined.union(other)?;
        }
        Ok(joined)
    }

    fn transfer(
        &mut self,
        cfg: &ControlFlowGraph,
        node: NodeId,
        input: &PointsToGraph,
    ) -> Result<PointsToGraph> {
        let mut graph = input.clone();
        if let Some(block) = cfg.node(node) {
            for instruction in block.instructions() {
                self.apply(&mut graph, instruction)?;
            }
        }
        Ok(graph)
    }
}

impl DataFlowResults<PointsToAnalysis> {
    /// Returns the points-to graph that holds when the method exits.
    #[must_use]
    pub fn graph_at_exit(&self) -> Option<&PointsToGraph> {
        self.input(ControlFlowGraph::EXIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analysis::{CfgBuilder, DataFlowSolver},
        body::{BranchKind, MethodBodyBuilder},
    };

    fn solve(body: &MethodBody) -> DataFlowResults<PointsToAnalysis> {
        let cfg = CfgBuilder::new().build(body).unwrap();
        let analysis = PointsToAnalysis::new(body, Arc::new(PtgNodeIdAllocator::new())).unwrap();
        DataFlowSolver::new(analysis).solve(&cfg).unwrap()
    }

    fn kinds(graph: &PointsToGraph, variable: &Variable) -> Vec<PtgNodeKind> {
        graph
            .targets(variable)
            .filter_map(|id| graph.node(id))
            .map(PtgNode::kind)
            .collect()
    }

    #[test]
    fn test_merge_keeps_both_targets() {
        let x = Variable::local("x");
        let mut builder = MethodBodyBuilder::new("Demo::Maybe()".into());
        builder
            .branch(BranchKind::Conditional, "null")
            .new_object(x.clone(), "Foo")
            .branch(BranchKind::Unconditional, "done");
        builder.label("null").unwrap();
        builder.null(x.clone());
        builder.label("done").unwrap();
        builder.ret(Some(x.clone()));

        let results = solve(&builder.finish().unwrap());
        let graph = results.graph_at_exit().unwrap();
        assert_eq!(kinds(graph, &x), vec![PtgNodeKind::Null, PtgNodeKind::Object]);
    }

    #[test]
    fn test_field_store_then_load() {
        let [a, b, c] = ["a", "b", "c"].map(Variable::local);
        let next = FieldRef::new("Node", "next");
        let mut builder = MethodBodyBuilder::new("Demo::Link()".into());
        builder
            .new_object(a.clone(), "Node")
            .new_object(b.clone(), "Node")
            .store_field(a.clone(), next.clone(), b.clone())
            .load_field(c.clone(), a.clone(), next.clone())
            .ret(None);

        let results = solve(&builder.finish().unwrap());
        let graph = results.graph_at_exit().unwrap();
        assert!(graph.may_alias(&b, &c));
        assert!(!graph.may_alias(&a, &c));

        let b_node = graph.targets(&b).next().unwrap();
        assert_eq!(graph.node(b_node).unwrap().offset(), Some(1));
    }

    #[test]
    fn test_parameter_fields_materialize_unknown() {
        let this = Variable::parameter("this").typed("Foo");
        let v = Variable::local("v");
        let mut builder = MethodBodyBuilder::new("Foo::Get()".into());
        builder
            .parameter(this.clone())
            .load_field(v.clone(), this.clone(), FieldRef::new("Foo", "value"))
            .ret(Some(v.clone()));

        let results = solve(&builder.finish().unwrap());
        let graph = results.graph_at_exit().unwrap();
        assert_eq!(kinds(graph, &this), vec![PtgNodeKind::Unknown]);
        assert_eq!(kinds(graph, &v), vec![PtgNodeKind::Unknown]);

        let owner = graph.targets(&this).next().unwrap();
        let loaded = graph.targets(&v).next().unwrap();
        assert_ne!(owner, loaded);
        assert!(graph
            .field_sources(loaded, &FieldRef::new("Foo", "value"))
            .any(|s| s == owner));
    }

    #[test]
    fn test_loop_allocation_reuses_site_node() {
        let [list, item] = ["list", "item"].map(Variable::local);
        let mut builder = MethodBodyBuilder::new("Demo::Fill()".into());
        builder.new_array(list.clone(), "Item");
        builder.label("head").unwrap();
        builder
            .new_object(item.clone(), "Item")
            .emit(InstructionKind::StoreElement {
                array: list.clone(),
                value: item.clone(),
            })
            .branch(BranchKind::Conditional, "head")
            .ret(None);

        let results = solve(&builder.finish().unwrap());
        let graph = results.graph_at_exit().unwrap();

        let array = graph.targets(&list).next().unwrap();
        assert_eq!(graph.node(array).unwrap().ty().map(String::as_str), Some("Item[]"));
        assert_eq!(graph.field_targets(array, &FieldRef::elements()).count(), 1);
        // Null, the array and one node for the allocation inside the loop
        assert_eq!(graph.node_count(), 3);
    }

    #[test]
    fn test_separate_allocators_do_not_merge() {
        let x = Variable::local("x");
        let mut builder = MethodBodyBuilder::new("Demo::Make()".into());
        builder.new_object(x.clone(), "Foo").ret(Some(x.clone()));
        let body = builder.finish().unwrap();

        let first = solve(&body);
        let second = solve(&body);
        let mut merged = first.graph_at_exit().unwrap().clone();
        let other = second.graph_at_exit().unwrap();
        assert_eq!(merged.targets(&x).collect::<Vec<_>>(), other.targets(&x).collect::<Vec<_>>());
        assert!(matches!(
            merged.union(other),
            Err(crate::Error::PtgIdCollision(_))
        ));
    }

    #[test]
    fn test_redefinition_clears_targets() {
        let x = Variable::local("x");
        let mut builder = MethodBodyBuilder::new("Demo::Reuse()".into());
        builder
            .new_object(x.clone(), "Foo")
            .constant(x.clone())
            .ret(None);

        let results = solve(&builder.finish().unwrap());
        let graph = results.graph_at_exit().unwrap();
        assert_eq!(graph.targets(&x).count(), 0);
    }
}
