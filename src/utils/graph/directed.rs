//! Arena-backed directed graph.
//!
//! [`DirectedGraph`] owns its node payloads in a vector indexed by [`NodeId`] and keeps
//! both adjacency directions. Edges are id pairs carrying an edge payload; a node pair
//! is connected at most once, so adjacency behaves like a set.

use crate::{
    utils::graph::{
        node::NodeId,
        traits::{GraphBase, Predecessors, Successors},
    },
    Error, Result,
};

/// A directed graph with typed node and edge data and set semantics for edges.
///
/// - Nodes receive sequential ids starting at zero.
/// - [`add_edge`](Self::add_edge) between an already connected pair is a no-op and keeps
///   the payload of the first connection.
/// - Successor and predecessor iteration follows edge insertion order.
///
/// # Examples
///
/// ```rust,ignore
/// use flowscope::utils::graph::{DirectedGraph, NodeId};
///
/// let mut graph: DirectedGraph<&str, ()> = DirectedGraph::new();
/// let a = graph.add_node("A");
/// let b = graph.add_node("B");
///
/// assert!(graph.add_edge(a, b, ())?);
/// assert!(!graph.add_edge(a, b, ())?);
/// assert_eq!(graph.edge_count(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct DirectedGraph<N, E> {
    nodes: Vec<N>,
    outgoing: Vec<Vec<(NodeId, E)>>,
    incoming: Vec<Vec<NodeId>>,
    edge_count: usize,
}

impl<N, E> Default for DirectedGraph<N, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N, E> DirectedGraph<N, E> {
    /// Creates a new empty graph.
    #[must_use]
    pub fn new() -> Self {
        DirectedGraph {
            nodes: Vec::new(),
            outgoing: Vec::new(),
            incoming: Vec::new(),
            edge_count: 0,
        }
    }

    /// Creates a new empty graph with room for `node_capacity` nodes.
    #[must_use]
    pub fn with_capacity(node_capacity: usize) -> Self {
        DirectedGraph {
            nodes: Vec::with_capacity(node_capacity),
            outgoing: Vec::with_capacity(node_capacity),
            incoming: Vec::with_capacity(node_capacity),
            edge_count: 0,
        }
    }

    /// Adds a node and returns its id (the next sequential index).
    pub fn add_node(&mut self, data: N) -> NodeId {
        let id = NodeId::new(self.nodes.len());
        self.nodes.push(data);
        self.outgoing.push(Vec::new());
        self.incoming.push(Vec::new());
        id
    }

    /// Connects `source` to `target`.
    ///
    /// # Returns
    ///
    /// `Ok(true)` if a new edge was inserted, `Ok(false)` if the pair was already connected.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GraphError`] if either endpoint is not a node of this graph.
    pub fn add_edge(&mut self, source: NodeId, target: NodeId, data: E) -> Result<bool> {
        for endpoint in [source, target] {
            if endpoint.index() >= self.nodes.len() {
                return Err(Error::GraphError(format!(
                    "node {endpoint} does not exist in graph with {} nodes",
                    self.nodes.len()
                )));
            }
        }

        if self.contains_edge(source, target) {
            return Ok(false);
        }

        self.outgoing[source.index()].push((target, data));
        self.incoming[target.index()].push(source);
        self.edge_count += 1;
        Ok(true)
    }

    /// Returns `true` if `source` is directly connected to `target`.
    #[must_use]
    pub fn contains_edge(&self, source: NodeId, target: NodeId) -> bool {
        self.outgoing
            .get(source.index())
            .is_some_and(|edges| edges.iter().any(|(t, _)| *t == target))
    }

    /// Returns the payload of the edge `source -> target`, if connected.
    #[must_use]
    pub fn edge(&self, source: NodeId, target: NodeId) -> Option<&E> {
        self.outgoing
            .get(source.index())?
            .iter()
            .find(|(t, _)| *t == target)
            .map(|(_, data)| data)
    }

    /// Returns the payload of `node`, or `None` for an unknown id.
    #[must_use]
    pub fn node(&self, node: NodeId) -> Option<&N> {
        self.nodes.get(node.index())
    }

    /// Returns the number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the number of distinct edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Iterates over all node ids in ascending order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(NodeId::new)
    }

    /// Iterates over `(id, payload)` pairs in ascending id order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &N)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, data)| (NodeId::new(i), data))
    }

    /// Iterates over the successors of `node`. Unknown ids yield nothing.
    pub fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.outgoing
            .get(node.index())
            .into_iter()
            .flatten()
            .map(|(target, _)| *target)
    }

    /// Iterates over the predecessors of `node`. Unknown ids yield nothing.
    pub fn predecessors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.incoming.get(node.index()).into_iter().flatten().copied()
    }

    /// Iterates over the outgoing edges of `node` as `(target, payload)` pairs.
    pub fn outgoing_edges(&self, node: NodeId) -> impl Iterator<Item = (NodeId, &E)> + '_ {
        self.outgoing
            .get(node.index())
            .into_iter()
            .flatten()
            .map(|(target, data)| (*target, data))
    }

    /// Iterates over every edge as `(source, target, payload)`.
    pub fn edges(&self) -> impl Iterator<Item = (NodeId, NodeId, &E)> + '_ {
        self.outgoing.iter().enumerate().flat_map(|(source, edges)| {
            edges
                .iter()
                .map(move |(target, data)| (NodeId::new(source), *target, data))
        })
    }

    /// Returns the number of outgoing edges of `node`.
    #[must_use]
    pub fn out_degree(&self, node: NodeId) -> usize {
        self.outgoing.get(node.index()).map_or(0, Vec::len)
    }

    /// Returns the number of incoming edges of `node`.
    #[must_use]
    pub fn in_degree(&self, node: NodeId) -> usize {
        self.incoming.get(node.index()).map_or(0, Vec::len)
    }
}

impl<N, E> GraphBase for DirectedGraph<N, E> {
    fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

impl<N, E> Successors for DirectedGraph<N, E> {
    fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
        DirectedGraph::successors(self, node)
    }
}

impl<N, E> Predecessors for DirectedGraph<N, E> {
    fn predecessors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
        DirectedGraph::predecessors(self, node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diamond() -> DirectedGraph<&'static str, u8> {
        let mut graph = DirectedGraph::new();
        let a = graph.add_node("A");
        let b = graph.add_node("B");
        let c = graph.add_node("C");
        let d = graph.add_node("D");
        graph.add_edge(a, b, 1).unwrap();
        graph.add_edge(a, c, 2).unwrap();
        graph.add_edge(b, d, 3).unwrap();
        graph.add_edge(c, d, 4).unwrap();
        graph
    }

    #[test]
    fn test_sequential_node_ids() {
        let graph = diamond();
        let ids: Vec<NodeId> = graph.node_ids().collect();
        assert_eq!(ids, (0..4).map(NodeId::new).collect::<Vec<_>>());
        assert_eq!(graph.node(NodeId::new(2)), Some(&"C"));
        assert_eq!(graph.node(NodeId::new(9)), None);
    }

    #[test]
    fn test_adjacency_both_directions() {
        let graph = diamond();
        let succ: Vec<NodeId> = graph.successors(NodeId::new(0)).collect();
        assert_eq!(succ, vec![NodeId::new(1), NodeId::new(2)]);
        let pred: Vec<NodeId> = graph.predecessors(NodeId::new(3)).collect();
        assert_eq!(pred, vec![NodeId::new(1), NodeId::new(2)]);
        assert_eq!(graph.in_degree(NodeId::new(0)), 0);
        assert_eq!(graph.out_degree(NodeId::new(3)), 0);
    }

    #[test]
    fn test_duplicate_edge_is_noop() {
        let mut graph = diamond();
        let inserted = graph.add_edge(NodeId::new(0), NodeId::new(1), 99).unwrap();

        assert!(!inserted);
        assert_eq!(graph.edge_count(), 4);
        assert_eq!(graph.edge(NodeId::new(0), NodeId::new(1)), Some(&1));
        assert_eq!(graph.predecessors(NodeId::new(1)).count(), 1);
    }

    #[test]
    fn test_edge_to_unknown_node_fails() {
        let mut graph = diamond();
        let result = graph.add_edge(NodeId::new(0), NodeId::new(10), 0);
        assert!(matches!(result, Err(Error::GraphError(_))));
        assert_eq!(graph.edge_count(), 4);
    }

    #[test]
    fn test_edges_iteration() {
        let graph = diamond();
        let edges: Vec<(usize, usize, u8)> = graph
            .edges()
            .map(|(s, t, w)| (s.index(), t.index(), *w))
            .collect();
        assert_eq!(edges, vec![(0, 1, 1), (0, 2, 2), (1, 3, 3), (2, 3, 4)]);
    }

    #[test]
    fn test_unknown_node_has_no_neighbours() {
        let graph = diamond();
        assert_eq!(graph.successors(NodeId::new(42)).count(), 0);
        assert_eq!(graph.predecessors(NodeId::new(42)).count(), 0);
    }
}
