//! Data flow analysis framework over control flow graphs.
//!
//! This module provides a generic framework for computing properties that
//! propagate along control flow edges. It supports both forward and backward
//! analyses using a round-based solver in topological order.
//!
//! # Architecture
//!
//! The framework is built around two core abstractions:
//!
//! - **Analysis**: Specifies the fact type, boundary conditions, join and transfer
//!   functions ([`DataFlowAnalysis`])
//! - **Solver**: Iteratively computes the fixpoint and records per-node facts
//!   ([`DataFlowSolver`], [`DataFlowResults`])
//!
//! # Analyses Provided
//!
//! - [`CopyPropagation`]: Copies `dest = source` available on every path
//! - [`TypeInference`]: Most precise type of each variable, merged through the class
//!   hierarchy
//! - [`PointsToAnalysis`](crate::analysis::PointsToAnalysis): May-alias heap abstraction
//!
//! # Example
//!
//! ```rust
//! use flowscope::analysis::{CfgBuilder, CopyPropagation, DataFlowSolver};
//! use flowscope::body::{MethodBodyBuilder, Variable};
//!
//! let (x, y) = (Variable::local("x"), Variable::local("y"));
//! let mut builder = MethodBodyBuilder::new("Demo::Alias()".into());
//! builder.basic(Some(x.clone())).copy(y.clone(), x.clone()).ret(None);
//! let cfg = CfgBuilder::new().build(&builder.finish()?)?;
//!
//! let results = DataFlowSolver::new(CopyPropagation).solve(&cfg)?;
//! let exit = cfg.exit();
//! assert_eq!(results.input(exit).and_then(|f| f.source(&y)), Some(&x));
//! # Ok::<(), flowscope::Error>(())
//! ```
//!
//! # Thread Safety
//!
//! Results are `Send` and `Sync` when the analysis is.

mod copyprop;
mod framework;
mod solver;
mod typeinfer;

pub use copyprop::{CopyFacts, CopyPropagation};
pub use framework::{DataFlowAnalysis, Direction};
pub use solver::{DataFlowResults, DataFlowSolver};
pub use typeinfer::{InferredType, TypeFacts, TypeInference};
