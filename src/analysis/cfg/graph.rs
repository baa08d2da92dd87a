//! Control Flow Graph implementation.
//!
//! [`ControlFlowGraph`] wraps a [`DirectedGraph`] of [`CfgNode`]s with
//! [`CfgEdgeKind`] edge payloads and answers dominance, loop and ordering queries.

use std::{collections::HashMap, sync::OnceLock};

use crate::{
    analysis::cfg::{loops, CfgEdge, CfgEdgeKind, CfgLoop, CfgNode},
    model::MethodRef,
    utils::graph::{
        algorithms::{self, Dominators},
        DirectedGraph, GraphBase, NodeId, Predecessors, Reversed, Successors,
    },
};

/// Topological order plus the inverse mapping node id -> position.
#[derive(Debug)]
struct Ordering {
    order: Vec<NodeId>,
    index: Vec<usize>,
}

impl Ordering {
    fn new(order: Vec<NodeId>) -> Self {
        let mut index = vec![usize::MAX; order.len()];
        for (position, node) in order.iter().enumerate() {
            if let Some(slot) = index.get_mut(node.index()) {
                *slot = position;
            }
        }
        Ordering { order, index }
    }
}

/// A control flow graph of one method body.
///
/// Node `0` is always Entry and node `1` is always Exit, also for an empty method.
/// Basic blocks get ids `2, 3, …` in the order their leaders were discovered (see
/// [`CfgBuilder`](crate::analysis::CfgBuilder)). A pair of nodes is connected at most
/// once.
///
/// # Lazy Computation
///
/// The graph cannot be mutated once built, so derived results are computed on first
/// access and cached in [`OnceLock`]s:
///
/// - [`dominators`](Self::dominators) / [`post_dominators`](Self::post_dominators)
/// - [`loops`](Self::loops)
/// - [`forward_order`](Self::forward_order) / [`backward_order`](Self::backward_order)
///
/// # Thread Safety
///
/// `ControlFlowGraph` is [`Send`] and [`Sync`].
#[derive(Debug)]
pub struct ControlFlowGraph {
    method: Option<MethodRef>,
    graph: DirectedGraph<CfgNode, CfgEdgeKind>,
    /// Offset of every instruction -> the block containing it
    offsets: HashMap<u32, NodeId>,
    dominators: OnceLock<Dominators>,
    post_dominators: OnceLock<Dominators>,
    loops: OnceLock<Vec<CfgLoop>>,
    forward: OnceLock<Ordering>,
    backward: OnceLock<Ordering>,
}

impl ControlFlowGraph {
    /// Id of the Entry node.
    pub const ENTRY: NodeId = NodeId::new(0);
    /// Id of the Exit node.
    pub const EXIT: NodeId = NodeId::new(1);

    pub(crate) fn new(
        method: Option<MethodRef>,
        graph: DirectedGraph<CfgNode, CfgEdgeKind>,
    ) -> Self {
        let offsets = graph
            .nodes()
            .flat_map(|(id, node)| node.instructions().iter().map(move |i| (i.offset, id)))
            .collect();

        ControlFlowGraph {
            method,
            graph,
            offsets,
            dominators: OnceLock::new(),
            post_dominators: OnceLock::new(),
            loops: OnceLock::new(),
            forward: OnceLock::new(),
            backward: OnceLock::new(),
        }
    }

    /// Returns the method this graph was built for, if known.
    #[must_use]
    pub fn method(&self) -> Option<&MethodRef> {
        self.method.as_ref()
    }

    /// Returns the Entry node id.
    #[must_use]
    pub const fn entry(&self) -> NodeId {
        Self::ENTRY
    }

    /// Returns the Exit node id.
    #[must_use]
    pub const fn exit(&self) -> NodeId {
        Self::EXIT
    }

    /// Returns the number of nodes, including Entry and Exit.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns the number of basic blocks (nodes other than Entry and Exit).
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.graph.node_count().saturating_sub(2)
    }

    /// Returns the number of edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Returns the node with the given id.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&CfgNode> {
        self.graph.node(id)
    }

    /// Iterates over all nodes in id order.
    pub fn nodes(&self) -> impl Iterator<Item = &CfgNode> + '_ {
        self.graph.nodes().map(|(_, node)| node)
    }

    /// Iterates over all node ids in ascending order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.graph.node_ids()
    }

    /// Returns the block containing the instruction at `offset`.
    #[must_use]
    pub fn node_at_offset(&self, offset: u32) -> Option<NodeId> {
        self.offsets.get(&offset).copied()
    }

    /// Iterates over the successors of `node`, in edge insertion order.
    pub fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.graph.successors(node)
    }

    /// Iterates over the predecessors of `node`, in edge insertion order.
    pub fn predecessors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.graph.predecessors(node)
    }

    /// Returns the kind of the edge `source -> target`, if the nodes are connected.
    #[must_use]
    pub fn edge_kind(&self, source: NodeId, target: NodeId) -> Option<&CfgEdgeKind> {
        self.graph.edge(source, target)
    }

    /// Returns `true` if `source` is directly connected to `target`.
    #[must_use]
    pub fn has_edge(&self, source: NodeId, target: NodeId) -> bool {
        self.graph.contains_edge(source, target)
    }

    /// Iterates over every edge with its kind.
    pub fn edges(&self) -> impl Iterator<Item = (CfgEdge, &CfgEdgeKind)> + '_ {
        self.graph
            .edges()
            .map(|(source, target, kind)| (CfgEdge::new(source, target), kind))
    }

    /// Returns the dominator sets with respect to Entry.
    #[must_use]
    pub fn dominators(&self) -> &Dominators {
        self.dominators
            .get_or_init(|| algorithms::compute_dominators(&self.graph, Self::ENTRY))
    }

    /// Returns the post-dominator sets: dominators of the reversed graph rooted at Exit.
    #[must_use]
    pub fn post_dominators(&self) -> &Dominators {
        self.post_dominators
            .get_or_init(|| algorithms::compute_dominators(&Reversed(&self.graph), Self::EXIT))
    }

    /// Returns `true` if every path from Entry to `b` passes through `a`.
    #[must_use]
    pub fn dominates(&self, a: NodeId, b: NodeId) -> bool {
        self.dominators().dominates(a, b)
    }

    /// Returns `true` if `a` dominates `b` and `a != b`.
    #[must_use]
    pub fn strictly_dominates(&self, a: NodeId, b: NodeId) -> bool {
        self.dominators().strictly_dominates(a, b)
    }

    /// Returns `true` if every path from `b` to Exit passes through `a`.
    #[must_use]
    pub fn post_dominates(&self, a: NodeId, b: NodeId) -> bool {
        self.post_dominators().dominates(a, b)
    }

    /// Returns the immediate dominator of `node`; `None` for Entry and unreachable nodes.
    #[must_use]
    pub fn idom(&self, node: NodeId) -> Option<NodeId> {
        self.dominators().immediate_dominator(node)
    }

    /// Returns the immediate post-dominator of `node`; `None` for Exit and for nodes
    /// that cannot reach Exit.
    #[must_use]
    pub fn ipdom(&self, node: NodeId) -> Option<NodeId> {
        self.post_dominators().immediate_dominator(node)
    }

    /// Returns the children of `node` in the dominator tree.
    #[must_use]
    pub fn dominator_tree_children(&self, node: NodeId) -> &[NodeId] {
        self.dominators().children(node)
    }

    /// Returns the children of `node` in the post-dominator tree.
    #[must_use]
    pub fn post_dominator_tree_children(&self, node: NodeId) -> &[NodeId] {
        self.post_dominators().children(node)
    }

    /// Returns the dominance frontier of `node`: every `f` such that `node` dominates
    /// a predecessor of `f` but does not strictly dominate `f`.
    #[must_use]
    pub fn dominance_frontier(&self, node: NodeId) -> &[NodeId] {
        self.dominators().frontier(node)
    }

    /// Returns the post-dominance frontier of `node`.
    #[must_use]
    pub fn post_dominance_frontier(&self, node: NodeId) -> &[NodeId] {
        self.post_dominators().frontier(node)
    }

    /// Returns the nodes that need a phi function for a variable defined in `defs`.
    #[must_use]
    pub fn iterated_dominance_frontier<I>(&self, defs: I) -> Vec<NodeId>
    where
        I: IntoIterator<Item = NodeId>,
    {
        self.dominators().iterated_frontier(defs)
    }

    /// Returns every edge whose target dominates its source.
    #[must_use]
    pub fn back_edges(&self) -> Vec<CfgEdge> {
        loops::back_edges(&self.graph, self.dominators())
    }

    /// Returns the natural loops, sorted by header.
    #[must_use]
    pub fn loops(&self) -> &[CfgLoop] {
        self.loops
            .get_or_init(|| loops::natural_loops(&self.graph, self.dominators()))
    }

    /// Returns `true` if the graph has at least one natural loop.
    #[must_use]
    pub fn has_loops(&self) -> bool {
        !self.loops().is_empty()
    }

    /// Returns the most deeply nested loop containing `node`.
    #[must_use]
    pub fn innermost_loop(&self, node: NodeId) -> Option<&CfgLoop> {
        self.loops()
            .iter()
            .filter(|l| l.contains(node))
            .max_by_key(|l| (l.depth, std::cmp::Reverse(l.size())))
    }

    /// Returns the forward topological order (reverse postorder from Entry).
    ///
    /// Every node appears exactly once. For each edge that is not a back edge, the
    /// source comes before the target.
    #[must_use]
    pub fn forward_order(&self) -> &[NodeId] {
        &self.forward_ordering().order
    }

    /// Returns the backward topological order (reverse postorder of the reversed graph
    /// from Exit).
    #[must_use]
    pub fn backward_order(&self) -> &[NodeId] {
        &self.backward_ordering().order
    }

    /// Returns the position of `node` in [`forward_order`](Self::forward_order).
    #[must_use]
    pub fn forward_index(&self, node: NodeId) -> Option<usize> {
        position(&self.forward_ordering().index, node)
    }

    /// Returns the position of `node` in [`backward_order`](Self::backward_order).
    #[must_use]
    pub fn backward_index(&self, node: NodeId) -> Option<usize> {
        position(&self.backward_ordering().index, node)
    }

    fn forward_ordering(&self) -> &Ordering {
        self.forward
            .get_or_init(|| Ordering::new(algorithms::topological_order(&self.graph)))
    }

    fn backward_ordering(&self) -> &Ordering {
        self.backward.get_or_init(|| {
            Ordering::new(algorithms::topological_order(&Reversed(&self.graph)))
        })
    }
}

fn position(index: &[usize], node: NodeId) -> Option<usize> {
    index
        .get(node.index())
        .copied()
        .filter(|&pos| pos != usize::MAX)
}

impl GraphBase for ControlFlowGraph {
    fn node_count(&self) -> usize {
        self.graph.node_count()
    }
}

impl Successors for ControlFlowGraph {
    fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
        self.graph.successors(node)
    }
}

impl Predecessors for ControlFlowGraph {
    fn predecessors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
        self.graph.predecessors(node)
    }
}
