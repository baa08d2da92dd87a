//! Points-to graphs and the may-alias analysis built on them.
//!
//! A [`PointsToGraph`] maps variables to the abstract heap nodes they may reference
//! and connects nodes through field edges. Graphs at CFG merge points are combined
//! with [`PointsToGraph::union`]; [`PointsToGraph::graph_equals`] detects the fixpoint.
//!
//! # Key Components
//!
//! - [`PtgNode`] / [`PtgNodeKind`] - Null, allocation-site and Unknown nodes
//! - [`PtgNodeId`] / [`PtgNodeIdAllocator`] - Ids shared across graphs that are united
//! - [`PointsToGraph`] - The node arena with variable and field edges
//! - [`PointsToAnalysis`] - Intraprocedural may-alias analysis over a CFG
//!
//! # Node Identity
//!
//! Union matches nodes by id. All graphs that may be united must draw their ids from
//! one allocator; a union that finds the same id on two different nodes fails with
//! [`Error::PtgIdCollision`](crate::Error::PtgIdCollision).

mod analysis;
mod graph;
mod node;

pub use analysis::PointsToAnalysis;
pub use graph::PointsToGraph;
pub use node::{FieldEdges, PtgNode, PtgNodeId, PtgNodeIdAllocator, PtgNodeKind};
