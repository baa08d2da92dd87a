//! Data flow analysis framework trait and direction.
//!
//! This module defines the core abstraction for data flow analyses. Any
//! specific analysis (points-to, copy propagation) implements the
//! [`DataFlowAnalysis`] trait to work with the solver.

use std::fmt::Debug;

use crate::{analysis::ControlFlowGraph, utils::graph::NodeId, Result};

/// Direction of data flow analysis.
///
/// The direction determines how information propagates through the CFG
/// and in which topological order the solver visits the nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Information flows forward, from Entry to Exit.
    ///
    /// At merge points the outputs of all predecessors are joined.
    Forward,

    /// Information flows backward, from Exit to Entry.
    ///
    /// At split points the inputs of all successors are joined.
    Backward,
}

/// A data flow analysis over a [`ControlFlowGraph`].
///
/// Implementations provide boundary conditions, the join at merge points and the
/// transfer function of a node; the [`DataFlowSolver`](crate::analysis::DataFlowSolver)
/// handles iteration to a fixpoint.
///
/// For forward analyses: `out[n] = transfer(n, join(out[p] for p in preds(n)))`.
/// For backward analyses: `in[n] = transfer(n, join(in[s] for s in succs(n)))`.
///
/// # Example
///
/// ```rust
/// use flowscope::analysis::{ControlFlowGraph, DataFlowAnalysis, Direction};
/// use flowscope::utils::graph::NodeId;
///
/// /// Counts the instructions on the longest path from Entry.
/// struct PathLength;
///
/// impl DataFlowAnalysis for PathLength {
///     type Fact = usize;
///     const DIRECTION: Direction = Direction::Forward;
///     const NAME: &'static str = "path-length";
///
///     fn boundary(&self, _cfg: &ControlFlowGraph) -> usize { 0 }
///     fn initial(&self, _cfg: &ControlFlowGraph) -> usize { 0 }
///
///     fn join(&self, facts: &[&usize]) -> flowscope::Result<usize> {
///         Ok(facts.iter().map(|f| **f).max().unwrap_or(0))
///     }
///
///     fn transfer(
///         &mut self,
///         cfg: &ControlFlowGraph,
///         node: NodeId,
///         input: &usize,
///     ) -> flowscope::Result<usize> {
///         Ok(input + cfg.node(node).map_or(0, |n| n.instructions().len()))
///     }
/// }
/// ```
pub trait DataFlowAnalysis {
    /// The abstract state at a program point.
    type Fact: Clone + PartialEq + Debug + Send + Sync + 'static;

    /// The direction of this analysis.
    const DIRECTION: Direction;

    /// Name used in log messages and [`Error::IterationLimit`](crate::Error::IterationLimit).
    const NAME: &'static str;

    /// Returns the state at the boundary: the input of Entry for forward analyses,
    /// the output of Exit for backward ones.
    fn boundary(&self, cfg: &ControlFlowGraph) -> Self::Fact;

    /// Returns the state used for a node none of whose neighbours has been visited.
    fn initial(&self, cfg: &ControlFlowGraph) -> Self::Fact;

    /// Combines the states flowing in from several neighbours. `facts` is never empty.
    ///
    /// # Errors
    ///
    /// Analyses whose states can be inconsistent (e.g. colliding points-to node ids)
    /// report that here.
    fn join(&self, facts: &[&Self::Fact]) -> Result<Self::Fact>;

    /// Computes the state after flowing through `node`.
    ///
    /// # Errors
    ///
    /// Any error aborts the solver and is returned from
    /// [`DataFlowSolver::solve`](crate::analysis::DataFlowSolver::solve).
    fn transfer(
        &mut self,
        cfg: &ControlFlowGraph,
        node: NodeId,
        input: &Self::Fact,
    ) -> Result<Self::Fact>;
}
