//! Configuration for CFG construction and fixpoint analyses.

/// Knobs shared by [`CfgBuilder`](crate::analysis::CfgBuilder) and
/// [`DataFlowSolver`](crate::analysis::DataFlowSolver).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisConfig {
    /// Maximum number of passes over the CFG before a fixpoint analysis gives up
    /// with [`Error::IterationLimit`](crate::Error::IterationLimit) (default: 1000).
    ///
    /// Monotone analyses converge long before this; the limit only triggers for
    /// transfer or join functions that are not monotone.
    pub max_iterations: usize,

    /// Add edges from blocks inside a try range to the region's handler (default: true).
    ///
    /// Without them handler blocks are unreachable from Entry.
    pub exceptional_edges: bool,

    /// Connect `endfinally` blocks to the targets of the `leave` instructions that
    /// exit the protected try range (default: true). When disabled, or when no such
    /// `leave` exists, `endfinally` blocks are connected to Exit.
    pub finally_edges: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            exceptional_edges: true,
            finally_edges: true,
        }
    }
}

impl AnalysisConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a configuration that builds only the normal (non-exceptional) control
    /// flow: no handler edges and `endfinally` always connected to Exit.
    #[must_use]
    pub fn normal_flow_only() -> Self {
        Self {
            exceptional_edges: false,
            finally_edges: false,
            ..Self::default()
        }
    }

    /// Sets the iteration budget of fixpoint analyses.
    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Enables or disables exception handler edges.
    #[must_use]
    pub fn with_exceptional_edges(mut self, enabled: bool) -> Self {
        self.exceptional_edges = enabled;
        self
    }

    /// Enables or disables `endfinally` continuation edges.
    #[must_use]
    pub fn with_finally_edges(mut self, enabled: bool) -> Self {
        self.finally_edges = enabled;
        self
    }
}
