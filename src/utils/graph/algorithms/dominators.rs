//! Dominator computation using the iterative bit-vector formulation.
//!
//! A node `d` **dominates** a node `n` if every path from the root to `n` passes
//! through `d`. The sets are computed as the greatest fixpoint of
//!
//! ```text
//! Dom(root) = {root}
//! Dom(n)    = {n} ∪ ⋂ Dom(p)   for p in predecessors(n)
//! ```
//!
//! starting from the universe for every non-root node. Nodes are always visited in
//! ascending id order so the number of rounds is deterministic for a given graph.
//!
//! Post-dominators are the same computation on [`Reversed`](crate::utils::graph::Reversed)
//! rooted at the exit node.
//!
//! Nodes that cannot be reached from the root take no part in the fixpoint: they
//! keep `Dom(n) = {n}` and have no immediate dominator.

use crate::utils::{
    graph::{NodeId, Predecessors, Successors},
    BitSet,
};

/// Dominator sets plus the structures derived from them.
///
/// Produced by [`compute_dominators`]. Everything is computed eagerly, so all
/// queries are cheap lookups.
///
/// # Examples
///
/// ```rust,ignore
/// use flowscope::utils::graph::{algorithms::compute_dominators, DirectedGraph};
///
/// // Diamond: entry -> {a, b} -> join
/// let mut graph: DirectedGraph<&str, ()> = DirectedGraph::new();
/// let entry = graph.add_node("entry");
/// let a = graph.add_node("a");
/// let b = graph.add_node("b");
/// let join = graph.add_node("join");
/// graph.add_edge(entry, a, ())?;
/// graph.add_edge(entry, b, ())?;
/// graph.add_edge(a, join, ())?;
/// graph.add_edge(b, join, ())?;
///
/// let dom = compute_dominators(&graph, entry);
/// assert_eq!(dom.immediate_dominator(join), Some(entry));
/// assert_eq!(dom.frontier(a), &[join]);
/// ```
#[derive(Debug, Clone)]
pub struct Dominators {
    root: NodeId,
    sets: Vec<BitSet>,
    idom: Vec<Option<NodeId>>,
    children: Vec<Vec<NodeId>>,
    frontier: Vec<Vec<NodeId>>,
}

impl Dominators {
    /// Returns the root the sets were computed for.
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Returns the dominator set of `node`, or `None` for an unknown id.
    #[must_use]
    pub fn set(&self, node: NodeId) -> Option<&BitSet> {
        self.sets.get(node.index())
    }

    /// Returns `true` if `a` dominates `b`. Every node dominates itself.
    #[must_use]
    pub fn dominates(&self, a: NodeId, b: NodeId) -> bool {
        self.sets
            .get(b.index())
            .is_some_and(|set| set.contains(a.index()))
    }

    /// Returns `true` if `a` dominates `b` and `a != b`.
    #[must_use]
    pub fn strictly_dominates(&self, a: NodeId, b: NodeId) -> bool {
        a != b && self.dominates(a, b)
    }

    /// Returns the immediate dominator of `node`.
    ///
    /// `None` for the root, for unreachable nodes and for unknown ids.
    #[must_use]
    pub fn immediate_dominator(&self, node: NodeId) -> Option<NodeId> {
        self.idom.get(node.index()).copied().flatten()
    }

    /// Returns the children of `node` in the dominator tree, in ascending id order.
    #[must_use]
    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.children.get(node.index()).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Returns the dominance frontier of `node`, in ascending id order.
    #[must_use]
    pub fn frontier(&self, node: NodeId) -> &[NodeId] {
        self.frontier.get(node.index()).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Computes the iterated dominance frontier `DF+(defs)`.
    ///
    /// These are the nodes that need a phi function for a variable defined in every
    /// node of `defs`. The result is sorted by id.
    #[must_use]
    pub fn iterated_frontier<I>(&self, defs: I) -> Vec<NodeId>
    where
        I: IntoIterator<Item = NodeId>,
    {
        let node_count = self.sets.len();
        let mut result = BitSet::new(node_count);
        let mut queued = BitSet::new(node_count);
        let mut worklist = Vec::new();

        for def in defs {
            if def.index() < node_count && queued.insert(def.index()) {
                worklist.push(def);
            }
        }

        while let Some(node) = worklist.pop() {
            for &f in self.frontier(node) {
                if result.insert(f.index()) && queued.insert(f.index()) {
                    worklist.push(f);
                }
            }
        }

        result.iter().map(NodeId::new).collect()
    }
}

/// Computes dominators of every node of `graph` with respect to `root`.
///
/// An out-of-range root yields a result in which every node only dominates itself.
pub fn compute_dominators<G>(graph: &G, root: NodeId) -> Dominators
where
    G: Successors + Predecessors,
{
    let node_count = graph.node_count();
    let reachable = reachable_from(graph, root);
    let predecessors: Vec<Vec<NodeId>> = graph
        .node_ids()
        .map(|node| {
            graph
                .predecessors(node)
                .filter(|p| reachable.contains(p.index()))
                .collect()
        })
        .collect();

    let mut sets: Vec<BitSet> = (0..node_count)
        .map(|index| {
            if index == root.index() || !reachable.contains(index) {
                BitSet::singleton(node_count, index)
            } else {
                BitSet::full(node_count)
            }
        })
        .collect();

    let mut rounds = 0usize;
    let mut changed = true;
    while changed {
        changed = false;
        rounds += 1;

        for index in 0..node_count {
            if index == root.index() || !reachable.contains(index) {
                continue;
            }

            let mut updated = BitSet::full(node_count);
            for pred in &predecessors[index] {
                updated.intersect_with(&sets[pred.index()]);
            }
            updated.insert(index);

            if updated != sets[index] {
                sets[index] = updated;
                changed = true;
            }
        }
    }
    log::trace!("dominator fixpoint for root {root} converged after {rounds} rounds");

    let idom = immediate_dominators(&sets);
    let mut children = vec![Vec::new(); node_count];
    for (index, parent) in idom.iter().enumerate() {
        if let Some(parent) = parent {
            children[parent.index()].push(NodeId::new(index));
        }
    }

    let frontier = dominance_frontiers(graph, &sets);

    Dominators {
        root,
        sets,
        idom,
        children,
        frontier,
    }
}

fn reachable_from<G: Successors>(graph: &G, root: NodeId) -> BitSet {
    let mut reachable = BitSet::new(graph.node_count());
    if root.index() >= graph.node_count() {
        return reachable;
    }

    let mut stack = vec![root];
    reachable.insert(root.index());
    while let Some(node) = stack.pop() {
        for succ in graph.successors(node) {
            if succ.index() < reachable.capacity() && reachable.insert(succ.index()) {
                stack.push(succ);
            }
        }
    }
    reachable
}

/// The strict dominators of a node form a chain, so the immediate dominator is the
/// strict dominator with exactly one element fewer in its own dominator set.
fn immediate_dominators(sets: &[BitSet]) -> Vec<Option<NodeId>> {
    sets.iter()
        .enumerate()
        .map(|(index, set)| {
            let depth = set.count();
            set.iter()
                .filter(|&d| d != index)
                .find(|&d| sets[d].count() + 1 == depth)
                .map(NodeId::new)
        })
        .collect()
}

/// `f ∈ DF(n)` iff `n` dominates a predecessor of `f` but does not strictly dominate `f`.
fn dominance_frontiers<G: Predecessors>(graph: &G, sets: &[BitSet]) -> Vec<Vec<NodeId>> {
    let node_count = sets.len();
    let mut frontier = vec![BitSet::new(node_count); node_count];

    for f in 0..node_count {
        for pred in graph.predecessors(NodeId::new(f)) {
            let Some(pred_doms) = sets.get(pred.index()) else {
                continue;
            };
            for n in pred_doms.iter() {
                let strictly_dominates_f = n != f && sets[f].contains(n);
                if !strictly_dominates_f {
                    frontier[n].insert(f);
                }
            }
        }
    }

    frontier
        .into_iter()
        .map(|set| set.iter().map(NodeId::new).collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::graph::{DirectedGraph, Reversed};

    fn graph_with(nodes: usize, edges: &[(usize, usize)]) -> DirectedGraph<(), ()> {
        let mut graph = DirectedGraph::new();
        for _ in 0..nodes {
            graph.add_node(());
        }
        for &(s, t) in edges {
            graph.add_edge(NodeId::new(s), NodeId::new(t), ()).unwrap();
        }
        graph
    }

    fn n(index: usize) -> NodeId {
        NodeId::new(index)
    }

    #[test]
    fn test_diamond() {
        let graph = graph_with(4, &[(0, 1), (0, 2), (1, 3), (2, 3)]);
        let dom = compute_dominators(&graph, n(0));

        assert!(dom.dominates(n(0), n(3)));
        assert!(!dom.dominates(n(1), n(3)));
        assert!(dom.dominates(n(3), n(3)));
        assert!(!dom.strictly_dominates(n(3), n(3)));
        assert_eq!(dom.immediate_dominator(n(3)), Some(n(0)));
        assert_eq!(dom.immediate_dominator(n(0)), None);
        assert_eq!(dom.children(n(0)), &[n(1), n(2), n(3)]);
        assert_eq!(dom.frontier(n(1)), &[n(3)]);
        assert_eq!(dom.frontier(n(2)), &[n(3)]);
        assert!(dom.frontier(n(0)).is_empty());
    }

    #[test]
    fn test_loop_frontier_contains_header() {
        // 0 -> 1 -> 2 -> 1, 2 -> 3
        let graph = graph_with(4, &[(0, 1), (1, 2), (2, 1), (2, 3)]);
        let dom = compute_dominators(&graph, n(0));

        assert_eq!(dom.immediate_dominator(n(2)), Some(n(1)));
        assert_eq!(dom.immediate_dominator(n(3)), Some(n(2)));
        assert_eq!(dom.frontier(n(2)), &[n(1)]);
        assert_eq!(dom.frontier(n(1)), &[n(1)]);
    }

    #[test]
    fn test_unreachable_node_dominates_only_itself() {
        let graph = graph_with(4, &[(0, 1), (3, 1)]);
        let dom = compute_dominators(&graph, n(0));

        assert_eq!(dom.set(n(3)).unwrap().iter().collect::<Vec<_>>(), vec![3]);
        assert_eq!(dom.immediate_dominator(n(3)), None);
        // The unreachable predecessor does not weaken dominance of reachable nodes.
        assert!(dom.dominates(n(0), n(1)));
        assert_eq!(dom.immediate_dominator(n(1)), Some(n(0)));
    }

    #[test]
    fn test_post_dominators_via_reversed() {
        let graph = graph_with(4, &[(0, 1), (0, 2), (1, 3), (2, 3)]);
        let pdom = compute_dominators(&Reversed(&graph), n(3));

        assert!(pdom.dominates(n(3), n(0)));
        assert!(!pdom.dominates(n(1), n(0)));
        assert_eq!(pdom.immediate_dominator(n(0)), Some(n(3)));
        assert_eq!(pdom.frontier(n(1)), &[n(0)]);
    }

    #[test]
    fn test_iterated_frontier() {
        // 0 -> 1 -> {2, 3} -> 4 -> 1, 4 -> 5
        let edges = [(0, 1), (1, 2), (1, 3), (2, 4), (3, 4), (4, 1), (4, 5)];
        let graph = graph_with(6, &edges);
        let dom = compute_dominators(&graph, n(0));

        assert_eq!(dom.frontier(n(2)), &[n(4)]);
        assert_eq!(dom.iterated_frontier([n(2)]), vec![n(1), n(4)]);
        assert!(dom.iterated_frontier([n(0)]).is_empty());
    }

    #[test]
    fn test_dominance_is_transitive() {
        let edges = [(0, 1), (1, 2), (2, 3), (1, 4), (4, 3), (3, 5)];
        let graph = graph_with(6, &edges);
        let dom = compute_dominators(&graph, n(0));

        for a in 0..6 {
            assert!(dom.dominates(n(a), n(a)));
            for b in 0..6 {
                for c in 0..6 {
                    if dom.dominates(n(a), n(b)) && dom.dominates(n(b), n(c)) {
                        assert!(dom.dominates(n(a), n(c)));
                    }
                }
            }
        }
    }
}
