//! Natural loop detection.
//!
//! A back edge is an edge `(a, h)` whose target `h` dominates its source `a`. Each
//! back edge defines a natural loop headed by `h`: the nodes that reach `a` through
//! predecessor edges without passing through `h`, plus `h` itself.
//!
//! Several back edges into one header yield one loop each. Loops with the same header
//! and an identical body are merged into a single [`CfgLoop`] that records all their
//! back edges.

use std::collections::HashSet;

use crate::{
    analysis::cfg::CfgEdge,
    utils::graph::{algorithms::Dominators, NodeId, Predecessors, Successors},
};

/// A natural loop of the control flow graph.
///
/// # Examples
///
/// ```rust,ignore
/// for natural_loop in cfg.loops() {
///     println!("loop at {} with {} nodes", natural_loop.header, natural_loop.size());
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CfgLoop {
    /// The header node, the single entry of the loop.
    pub header: NodeId,
    /// All nodes of the loop, including the header.
    pub body: HashSet<NodeId>,
    /// The back edges defining this loop, ordered by source.
    pub back_edges: Vec<CfgEdge>,
    /// Number of loops whose body strictly contains this loop's body (0 = outermost).
    pub depth: usize,
}

impl CfgLoop {
    /// Returns `true` if `node` belongs to the loop body.
    #[must_use]
    pub fn contains(&self, node: NodeId) -> bool {
        self.body.contains(&node)
    }

    /// Returns the number of nodes in the loop body.
    #[must_use]
    pub fn size(&self) -> usize {
        self.body.len()
    }

    /// Returns the body nodes sorted by id.
    #[must_use]
    pub fn sorted_body(&self) -> Vec<NodeId> {
        let mut nodes: Vec<NodeId> = self.body.iter().copied().collect();
        nodes.sort();
        nodes
    }
}

/// Finds every edge whose target dominates its source, ordered by `(source, target)`.
pub(crate) fn back_edges<G>(graph: &G, dominators: &Dominators) -> Vec<CfgEdge>
where
    G: Successors,
{
    let mut edges = Vec::new();
    for node in graph.node_ids() {
        for succ in graph.successors(node) {
            if dominators.dominates(succ, node) {
                edges.push(CfgEdge::new(node, succ));
            }
        }
    }
    edges.sort();
    edges
}

/// Computes the natural loops of `graph`, sorted by header, then by first back edge.
pub(crate) fn natural_loops<G>(graph: &G, dominators: &Dominators) -> Vec<CfgLoop>
where
    G: Successors + Predecessors,
{
    let mut loops: Vec<CfgLoop> = Vec::new();

    for edge in back_edges(graph, dominators) {
        let body = loop_body(graph, dominators, edge);
        match loops
            .iter_mut()
            .find(|l| l.header == edge.target && l.body == body)
        {
            Some(existing) => existing.back_edges.push(edge),
            None => loops.push(CfgLoop {
                header: edge.target,
                body,
                back_edges: vec![edge],
                depth: 0,
            }),
        }
    }

    let depths: Vec<usize> = loops
        .iter()
        .map(|inner| {
            loops
                .iter()
                .filter(|outer| {
                    outer.body.len() > inner.body.len() && outer.body.is_superset(&inner.body)
                })
                .count()
        })
        .collect();
    for (natural_loop, depth) in loops.iter_mut().zip(depths) {
        natural_loop.depth = depth;
    }

    loops.sort_by_key(|l| (l.header, l.back_edges.first().map(|e| e.source)));
    loops
}

/// Worklist over predecessors, seeded with the header so the walk never leaves the loop.
///
/// Predecessors the header does not dominate are skipped: they can only be unreachable
/// blocks jumping into the body.
fn loop_body<G: Predecessors>(graph: &G, dominators: &Dominators, edge: CfgEdge) -> HashSet<NodeId> {
    let mut body = HashSet::new();
    body.insert(edge.target);

    let mut worklist = vec![edge.source];
    while let Some(node) = worklist.pop() {
        if body.insert(node) {
            for pred in graph.predecessors(node) {
                if !body.contains(&pred) && dominators.dominates(edge.target, pred) {
                    worklist.push(pred);
                }
            }
        }
    }
    body
}
