//! Generic graph infrastructure shared by the analyses.
//!
//! - [`DirectedGraph`] - Arena-backed graph with typed node and edge payloads
//! - [`NodeId`] - Dense node index
//! - [`GraphBase`], [`Successors`], [`Predecessors`] - Traits the algorithms are written against
//! - [`Reversed`] - Transposed view of a graph
//! - [`algorithms`] - Orderings and dominators

pub mod algorithms;
mod directed;
mod node;
mod traits;

pub use directed::DirectedGraph;
pub use node::NodeId;
pub use traits::{GraphBase, Predecessors, Reversed, Successors};
