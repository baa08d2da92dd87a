//! Control Flow Graph (CFG) construction and analysis.
//!
//! This module turns a [`crate::body::MethodBody`] into a graph of basic blocks with
//! efficient traversal, dominator computation and loop detection.
//!
//! # Architecture
//!
//! The CFG builds upon the generic [`crate::utils::graph::DirectedGraph`] infrastructure,
//! adding instruction-carrying nodes and typed edges while leveraging the shared
//! dominator and traversal algorithms.
//!
//! # Key Components
//!
//! - [`CfgBuilder`] - Leader-based construction from instructions and protected regions
//! - [`ControlFlowGraph`] - The immutable graph with Entry (`n0`) and Exit (`n1`)
//! - [`CfgNode`] / [`CfgNodeKind`] - Entry, Exit or a basic block of instructions
//! - [`CfgEdge`] / [`CfgEdgeKind`] - Edges and the control transfer that created them
//! - [`CfgLoop`] - Natural loops found from back edges
//!
//! # Lazy Computation
//!
//! Dominators, post-dominators, loops and the topological orders are computed on
//! first access and cached in [`std::sync::OnceLock`]s.
//!
//! # Examples
//!
//! ```rust
//! use flowscope::analysis::{CfgBuilder, ControlFlowGraph};
//! use flowscope::body::{BranchKind, MethodBodyBuilder};
//!
//! let mut builder = MethodBodyBuilder::new("Demo::Spin()".into());
//! builder.label("head")?;
//! builder.nop().branch(BranchKind::Conditional, "head").ret(None);
//! let cfg = CfgBuilder::new().build(&builder.finish()?)?;
//!
//! let head = cfg.node_at_offset(0).unwrap();
//! assert!(cfg.dominates(ControlFlowGraph::ENTRY, head));
//! assert_eq!(cfg.loops().len(), 1);
//! assert_eq!(cfg.loops()[0].header, head);
//! # Ok::<(), flowscope::Error>(())
//! ```

mod builder;
mod edge;
mod graph;
mod loops;
mod node;

pub use builder::CfgBuilder;
pub use edge::{CfgEdge, CfgEdgeKind};
pub use graph::ControlFlowGraph;
pub use loops::CfgLoop;
pub use node::{CfgNode, CfgNodeKind};
