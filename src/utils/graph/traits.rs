//! Trait definitions for graph abstractions.
//!
//! The algorithms in [`crate::utils::graph::algorithms`] are written against these
//! traits so that they run unchanged on the forward graph and on its transpose
//! (see [`Reversed`]), which is how post-dominators and the backward topological
//! order are derived from the forward implementations.

use crate::utils::graph::NodeId;

/// Core properties shared by all graphs: node count and node enumeration.
///
/// Node ids are expected to be dense (`0..node_count()`).
pub trait GraphBase {
    /// Returns the number of nodes in the graph.
    fn node_count(&self) -> usize;

    /// Iterates over all node ids in ascending order.
    fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.node_count()).map(NodeId::new)
    }
}

/// Forward edge traversal.
pub trait Successors: GraphBase {
    /// Iterates over the direct successors of `node`.
    fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId>;
}

/// Backward edge traversal.
pub trait Predecessors: GraphBase {
    /// Iterates over the direct predecessors of `node`.
    fn predecessors(&self, node: NodeId) -> impl Iterator<Item = NodeId>;
}

/// A view of a graph with every edge flipped.
///
/// Successors of the view are the predecessors of the wrapped graph and vice versa.
#[derive(Debug, Clone, Copy)]
pub struct Reversed<'g, G>(pub &'g G);

impl<G: GraphBase> GraphBase for Reversed<'_, G> {
    fn node_count(&self) -> usize {
        self.0.node_count()
    }
}

impl<G: Predecessors> Successors for Reversed<'_, G> {
    fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
        self.0.predecessors(node)
    }
}

impl<G: Successors> Predecessors for Reversed<'_, G> {
    fn predecessors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
        self.0.successors(node)
    }
}
