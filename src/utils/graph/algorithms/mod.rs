//! Graph algorithms for control-flow analysis.
//!
//! ## Traversal
//!
//! - [`postorder`] / [`reverse_postorder`] - Depth-first orderings from a set of roots
//! - [`topological_order`] - Reverse postorder covering every node of the graph
//!
//! ## Dominator Analysis
//!
//! - [`compute_dominators`] - Iterative bit-vector dominator sets
//! - [`Dominators`] - Dominator sets, immediate dominators, dominator tree and frontiers
//!
//! Both work on anything implementing [`Successors`](super::Successors) and
//! [`Predecessors`](super::Predecessors), including the [`Reversed`](super::Reversed)
//! view used for post-dominators and backward orders.
//!
//! | Algorithm | Time Complexity | Use Case |
//! |-----------|-----------------|----------|
//! | Orderings | O(V + E) | Dataflow iteration order |
//! | Dominators | O(V² / 64) per round | Loops, phi placement |

mod dominators;
mod traversal;

pub use dominators::{compute_dominators, Dominators};
pub use traversal::{postorder, reverse_postorder, topological_order};
