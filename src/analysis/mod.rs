//! Program analyses over method bodies and type universes.
//!
//! This module builds on the generic graph infrastructure in [`crate::utils::graph`]
//! to provide the analyses of the crate.
//!
//! # Architecture
//!
//! The analysis module is organized into focused sub-modules:
//!
//! - [`cfg`] - Control flow graph construction, dominance, loops and orderings
//! - [`dataflow`] - Generic fixpoint framework, copy propagation and type inference
//! - [`pointsto`] - Points-to graphs and the may-alias analysis
//! - [`ssa`] - Static Single Assignment form
//! - [`callgraph`] - Call graphs with virtual dispatch resolution
//! - [`hierarchy`] - Class Hierarchy Analysis
//! - [`info`] - Typed per-method and per-node fact storage
//! - [`config`] - Knobs shared by construction and fixpoint analyses
//!
//! # Usage
//!
//! ```rust
//! use flowscope::analysis::{CfgBuilder, DataFlowSolver, PointsToAnalysis, PtgNodeIdAllocator};
//! use flowscope::body::{MethodBodyBuilder, Variable};
//! use std::sync::Arc;
//!
//! let (a, b) = (Variable::local("a"), Variable::local("b"));
//! let mut builder = MethodBodyBuilder::new("Demo::Alias()".into());
//! builder.new_object(a.clone(), "Demo.Item").copy(b.clone(), a.clone()).ret(None);
//! let body = builder.finish()?;
//!
//! let cfg = CfgBuilder::new().build(&body)?;
//! let analysis = PointsToAnalysis::new(&body, Arc::new(PtgNodeIdAllocator::new()))?;
//! let results = DataFlowSolver::new(analysis).solve(&cfg)?;
//!
//! let graph = results.graph_at_exit().unwrap();
//! assert!(graph.may_alias(&a, &b));
//! # Ok::<(), flowscope::Error>(())
//! ```

pub mod callgraph;
pub mod cfg;
pub mod config;
pub mod dataflow;
pub mod hierarchy;
pub mod info;
pub mod pointsto;
pub mod ssa;

use rayon::prelude::*;

use crate::{body::MethodBody, Result};

// Re-export primary types at module level
pub use callgraph::{CallGraph, CallGraphBuilder, CallSite, CallSiteRef, MethodCallInfo};
pub use cfg::{CfgBuilder, CfgEdge, CfgEdgeKind, CfgLoop, CfgNode, CfgNodeKind, ControlFlowGraph};
pub use config::AnalysisConfig;
pub use dataflow::{
    CopyFacts, CopyPropagation, DataFlowAnalysis, DataFlowResults, DataFlowSolver, Direction,
    InferredType, TypeFacts, TypeInference,
};
pub use hierarchy::{ClassHierarchy, ClassHierarchyAnalysis};
pub use info::{AnalysisInfo, AnalysisInfoMap, InfoKey, MethodAnalysisInfo};
pub use pointsto::{
    FieldEdges, PointsToAnalysis, PointsToGraph, PtgNode, PtgNodeId, PtgNodeIdAllocator,
    PtgNodeKind,
};
pub use ssa::{PhiNode, SsaBuilder, SsaFunction, SsaVarId, SsaVariable};

/// Builds the control flow graphs of independent method bodies in parallel.
///
/// Results are returned in the order of `bodies`. A malformed body only fails its own
/// entry.
///
/// # Examples
///
/// ```rust
/// use flowscope::analysis::{build_cfgs, AnalysisConfig};
/// use flowscope::body::MethodBodyBuilder;
///
/// let bodies: Vec<_> = ["A::F()", "A::G()"]
///     .into_iter()
///     .map(|name| {
///         let mut builder = MethodBodyBuilder::new(name.into());
///         builder.nop().ret(None);
///         builder.finish()
///     })
///     .collect::<Result<_, _>>()?;
///
/// let cfgs = build_cfgs(&bodies, &AnalysisConfig::default());
/// assert!(cfgs.iter().all(|cfg| cfg.as_ref().is_ok_and(|cfg| cfg.block_count() == 1)));
/// # Ok::<(), flowscope::Error>(())
/// ```
#[must_use]
pub fn build_cfgs(bodies: &[MethodBody], config: &AnalysisConfig) -> Vec<Result<ControlFlowGraph>> {
    let builder = CfgBuilder::with_config(config.clone());
    bodies
        .par_iter()
        .map(|body| {
            builder.build(body).inspect_err(|error| {
                log::warn!("skipping CFG of {}: {error}", body.method);
            })
        })
        .collect()
}
