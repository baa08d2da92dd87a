//! Round-based data flow solver.
//!
//! # Algorithm
//!
//! The solver iterates until a fixpoint is reached:
//!
//! 1. Visit every node in forward (or backward) topological order
//! 2. Compute the node's incoming state: the boundary value at Entry (Exit), otherwise
//!    the join of the states of all already visited predecessors (successors), or the
//!    initial value if none was visited yet
//! 3. Apply the transfer function
//! 4. Repeat the pass while any node's outgoing state changed
//!
//! Back edges are the only reason for more than one productive pass, so reducible
//! graphs converge in a handful of passes. The number of passes is bounded by
//! [`AnalysisConfig::max_iterations`].

use crate::{
    analysis::{
        dataflow::{DataFlowAnalysis, Direction},
        AnalysisConfig, AnalysisInfoMap, ControlFlowGraph, InfoKey,
    },
    utils::graph::NodeId,
    Error, Result,
};

/// Fixpoint solver for a [`DataFlowAnalysis`].
///
/// # Usage
///
/// ```rust
/// use flowscope::analysis::{CfgBuilder, CopyPropagation, DataFlowSolver};
/// use flowscope::body::{MethodBodyBuilder, Variable};
///
/// let (a, b) = (Variable::local("a"), Variable::local("b"));
/// let mut builder = MethodBodyBuilder::new("Demo::Copy()".into());
/// builder.constant(a.clone()).copy(b.clone(), a.clone()).ret(Some(b.clone()));
/// let cfg = CfgBuilder::new().build(&builder.finish()?)?;
///
/// let results = DataFlowSolver::new(CopyPropagation::new()).solve(&cfg)?;
/// let block = cfg.node_at_offset(0).unwrap();
/// assert_eq!(results.resolve(block, &b), &a);
/// # Ok::<(), flowscope::Error>(())
/// ```
pub struct DataFlowSolver<A: DataFlowAnalysis> {
    analysis: A,
    config: AnalysisConfig,
}

impl<A: DataFlowAnalysis> DataFlowSolver<A> {
    /// Key of the state flowing into a node, in the solver's fact map.
    pub const INPUT: InfoKey<A::Fact> = InfoKey::new("dataflow.input");
    /// Key of the state flowing out of a node, in the solver's fact map.
    pub const OUTPUT: InfoKey<A::Fact> = InfoKey::new("dataflow.output");

    /// Creates a solver with the default configuration.
    #[must_use]
    pub fn new(analysis: A) -> Self {
        Self::with_config(analysis, AnalysisConfig::default())
    }

    /// Creates a solver with the given configuration.
    #[must_use]
    pub fn with_config(analysis: A, config: AnalysisConfig) -> Self {
        DataFlowSolver { analysis, config }
    }

    /// Solves the analysis to a fixpoint.
    ///
    /// # Errors
    ///
    /// - [`Error::IterationLimit`] if no fixpoint was reached within
    ///   [`AnalysisConfig::max_iterations`] passes
    /// - any error returned by the analysis' `join` or `transfer`
    pub fn solve(mut self, cfg: &ControlFlowGraph) -> Result<DataFlowResults<A>> {
        let node_count = cfg.node_count();
        let mut inputs: Vec<Option<A::Fact>> = vec![None; node_count];
        let mut outputs: Vec<Option<A::Fact>> = vec![None; node_count];

        let (order, boundary_node) = match A::DIRECTION {
            Direction::Forward => (cfg.forward_order(), ControlFlowGraph::ENTRY),
            Direction::Backward => (cfg.backward_order(), ControlFlowGraph::EXIT),
        };
        let boundary = self.analysis.boundary(cfg);
        let initial = self.analysis.initial(cfg);

        let mut passes = 0;
        loop {
            if passes == self.config.max_iterations {
                log::warn!(
                    "{} did not converge after {} passes over {}",
                    A::NAME,
                    passes,
                    describe(cfg)
                );
                return Err(Error::IterationLimit {
                    analysis: A::NAME,
                    limit: self.config.max_iterations,
                });
            }
            passes += 1;

            let mut changed = false;
            for &node in order {
                let (flow_in, flow_out) = match A::DIRECTION {
                    Direction::Forward => (&mut inputs, &mut outputs),
                    Direction::Backward => (&mut outputs, &mut inputs),
                };

                let incoming = if node == boundary_node {
                    boundary.clone()
                } else {
                    let neighbours: Vec<NodeId> = match A::DIRECTION {
                        Direction::Forward => cfg.predecessors(node).collect(),
                        Direction::Backward => cfg.successors(node).collect(),
                    };
                    let facts: Vec<&A::Fact> = neighbours
                        .iter()
                        .filter_map(|n| flow_out[n.index()].as_ref())
                        .collect();
                    if facts.is_empty() {
                        initial.clone()
                    } else {
                        self.analysis.join(&facts)?
                    }
                };

                let outgoing = self.analysis.transfer(cfg, node, &incoming)?;
                flow_in[node.index()] = Some(incoming);
                if flow_out[node.index()].as_ref() != Some(&outgoing) {
                    flow_out[node.index()] = Some(outgoing);
                    changed = true;
                }
            }

            log::trace!(
                "{} pass {} over {}: changed={}",
                A::NAME,
                passes,
                describe(cfg),
                changed
            );
            if !changed {
                break;
            }
        }

        let mut facts = AnalysisInfoMap::new();
        for (index, (input, output)) in inputs.into_iter().zip(outputs).enumerate() {
            let node = NodeId::new(index);
            if let Some(input) = input {
                facts.set(node, Self::INPUT, input);
            }
            if let Some(output) = output {
                facts.set(node, Self::OUTPUT, output);
            }
        }

        Ok(DataFlowResults {
            analysis: self.analysis,
            facts,
            passes,
        })
    }
}

fn describe(cfg: &ControlFlowGraph) -> String {
    cfg.method()
        .map_or_else(|| "<anonymous>".to_string(), ToString::to_string)
}

/// The fixpoint computed by a [`DataFlowSolver`].
///
/// Per-node facts are stored in an [`AnalysisInfoMap`] under
/// [`DataFlowSolver::INPUT`] and [`DataFlowSolver::OUTPUT`], so further analyses can
/// attach their own facts to the same nodes.
pub struct DataFlowResults<A: DataFlowAnalysis> {
    analysis: A,
    facts: AnalysisInfoMap<NodeId>,
    passes: usize,
}

impl<A: DataFlowAnalysis> DataFlowResults<A> {
    /// Returns the state at the start of `node` in program order.
    ///
    /// This is the transfer function's argument for forward analyses and its result
    /// for backward analyses.
    #[must_use]
    pub fn input(&self, node: NodeId) -> Option<&A::Fact> {
        self.facts
            .info(&node)?
            .try_get(DataFlowSolver::<A>::INPUT)
    }

    /// Returns the state at the end of `node` in program order.
    #[must_use]
    pub fn output(&self, node: NodeId) -> Option<&A::Fact> {
        self.facts
            .info(&node)?
            .try_get(DataFlowSolver::<A>::OUTPUT)
    }

    /// Returns the per-node fact map.
    #[must_use]
    pub fn facts(&self) -> &AnalysisInfoMap<NodeId> {
        &self.facts
    }

    /// Mutable access to the per-node fact map.
    pub fn facts_mut(&mut self) -> &mut AnalysisInfoMap<NodeId> {
        &mut self.facts
    }

    /// Returns the analysis in its final state.
    #[must_use]
    pub fn analysis(&self) -> &A {
        &self.analysis
    }

    /// Consumes the results and returns the analysis.
    #[must_use]
    pub fn into_analysis(self) -> A {
        self.analysis
    }

    /// Returns the number of passes over the CFG, including the final one that
    /// confirmed the fixpoint.
    #[must_use]
    pub fn passes(&self) -> usize {
        self.passes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::{cfg_from_edges, n};

    /// Number of predecessors on the longest acyclic path, saturating at 10.
    struct Depth;

    impl DataFlowAnalysis for Depth {
        type Fact = u32;
        const DIRECTION: Direction = Direction::Forward;
        const NAME: &'static str = "depth";

        fn boundary(&self, _cfg: &ControlFlowGraph) -> u32 {
            0
        }

        fn initial(&self, _cfg: &ControlFlowGraph) -> u32 {
            0
        }

        fn join(&self, facts: &[&u32]) -> Result<u32> {
            Ok(facts.iter().map(|f| **f).max().unwrap_or(0))
        }

        fn transfer(&mut self, _cfg: &ControlFlowGraph, _node: NodeId, input: &u32) -> Result<u32> {
            Ok((input + 1).min(10))
        }
    }

    /// Distance to Exit.
    struct Height;

    impl DataFlowAnalysis for Height {
        type Fact = u32;
        const DIRECTION: Direction = Direction::Backward;
        const NAME: &'static str = "height";

        fn boundary(&self, _cfg: &ControlFlowGraph) -> u32 {
            0
        }

        fn initial(&self, _cfg: &ControlFlowGraph) -> u32 {
            0
        }

        fn join(&self, facts: &[&u32]) -> Result<u32> {
            Ok(facts.iter().map(|f| **f).min().unwrap_or(0))
        }

        fn transfer(&mut self, _cfg: &ControlFlowGraph, _node: NodeId, input: &u32) -> Result<u32> {
            Ok(input + 1)
        }
    }

    /// Never converges.
    struct Counter;

    impl DataFlowAnalysis for Counter {
        type Fact = u64;
        const DIRECTION: Direction = Direction::Forward;
        const NAME: &'static str = "counter";

        fn boundary(&self, _cfg: &ControlFlowGraph) -> u64 {
            0
        }

        fn initial(&self, _cfg: &ControlFlowGraph) -> u64 {
            0
        }

        fn join(&self, facts: &[&u64]) -> Result<u64> {
            Ok(facts.iter().map(|f| **f).sum())
        }

        fn transfer(&mut self, _cfg: &ControlFlowGraph, _node: NodeId, input: &u64) -> Result<u64> {
            Ok(input + 1)
        }
    }

    #[test]
    fn test_forward_chain() {
        // Entry -> 2 -> 3 -> Exit
        let cfg = cfg_from_edges(4, &[(0, 2), (2, 3), (3, 1)]);
        let results = DataFlowSolver::new(Depth).solve(&cfg).unwrap();

        assert_eq!(results.input(n(0)), Some(&0));
        assert_eq!(results.output(n(0)), Some(&1));
        assert_eq!(results.output(n(3)), Some(&3));
        assert_eq!(results.output(n(1)), Some(&4));
        assert_eq!(results.passes(), 2);
    }

    #[test]
    fn test_forward_loop_reaches_fixpoint() {
        // Entry -> 2 -> 3 -> 2, 3 -> Exit
        let cfg = cfg_from_edges(4, &[(0, 2), (2, 3), (3, 2), (3, 1)]);
        let results = DataFlowSolver::new(Depth).solve(&cfg).unwrap();

        assert_eq!(results.output(n(2)), Some(&10));
        assert_eq!(results.output(n(1)), Some(&10));
        assert_eq!(
            results.facts().get(&n(3), DataFlowSolver::<Depth>::OUTPUT).unwrap(),
            &10
        );
    }

    #[test]
    fn test_backward_diamond() {
        // Entry -> 2 -> {3, 4}, 3 -> Exit, 4 -> 5 -> Exit
        let cfg = cfg_from_edges(6, &[(0, 2), (2, 3), (2, 4), (3, 1), (4, 5), (5, 1)]);
        let results = DataFlowSolver::new(Height).solve(&cfg).unwrap();

        assert_eq!(results.input(n(1)), Some(&1));
        assert_eq!(results.input(n(3)), Some(&2));
        assert_eq!(results.input(n(4)), Some(&3));
        assert_eq!(results.input(n(2)), Some(&3));
        assert_eq!(results.input(n(0)), Some(&4));
    }

    #[test]
    fn test_iteration_limit() {
        let cfg = cfg_from_edges(3, &[(0, 2), (2, 2), (2, 1)]);
        let config = AnalysisConfig::new().with_max_iterations(5);
        let result = DataFlowSolver::with_config(Counter, config).solve(&cfg);
        assert!(matches!(
            result,
            Err(Error::IterationLimit {
                analysis: "counter",
                limit: 5
            })
        ));
    }
}
