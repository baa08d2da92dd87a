// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]

//! # flowscope
//!
//! Control-flow and dataflow analysis for bytecode-level method bodies (CIL, JVM).
//!
//! `flowscope` takes the instruction streams an external loader produces and builds
//! the structures program analyses work on: control flow graphs with exception edges,
//! dominator and post-dominator trees, natural loops, topological orderings, SSA form,
//! points-to graphs, inferred types and call graphs resolved with Class Hierarchy
//! Analysis. Decoding bytecode and
//! parsing container formats is left to the loader.
//!
//! ## Features
//!
//! - **Control flow graphs** - Leader-based block splitting with `leave`, `switch`,
//!   `endfinally` and exception handler edges
//! - **Dominance and loops** - Cached dominator, post-dominator and dominance frontier
//!   queries, natural loops from back edges
//! - **Dataflow framework** - Forward and backward fixpoint solver with per-node facts
//! - **Points-to analysis** - Allocation-site heap abstraction with may-alias queries
//! - **Type inference** - Per-variable types merged to their least common supertype
//! - **SSA form** - Phi placement at iterated dominance frontiers and dominator-tree
//!   renaming
//! - **Call graphs** - Worklist construction with virtual dispatch resolution
//!
//! ## Quick Start
//!
//! ```rust
//! use flowscope::prelude::*;
//!
//! let x = Variable::local("x");
//! let mut builder = MethodBodyBuilder::new("Demo::Abs(int32)".into());
//! builder
//!     .basic(Some(x.clone()))
//!     .branch(BranchKind::Conditional, "positive")
//!     .ret(Some(x.clone()));
//! builder.label("positive")?;
//! builder.ret(Some(x));
//!
//! let cfg = CfgBuilder::new().build(&builder.finish()?)?;
//! assert_eq!(cfg.block_count(), 3);
//! assert!(cfg.successors(cfg.entry()).count() == 1);
//! # Ok::<(), flowscope::Error>(())
//! ```
//!
//! ## Modules
//!
//! - [`body`] - The instruction and method body model delivered by loaders
//! - [`model`] - The type universe used by hierarchy and call graph analysis
//! - [`analysis`] - CFGs, dataflow, SSA, points-to, call graph and class hierarchy analysis
//! - [`utils`] - Generic directed graphs, graph algorithms and bit sets
//!
//! ## Logging
//!
//! The crate logs through the [`log`](https://docs.rs/log) facade and never installs a
//! logger. Construction summaries are emitted at `debug`, fixpoint passes at `trace`.
//!
//! ## Thread Safety
//!
//! All analysis results are `Send` and `Sync`. Independent methods can be analyzed in
//! parallel, see [`analysis::build_cfgs`].

#[macro_use]
pub(crate) mod error;

/// Shared functionality which is used in unit tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust
/// use flowscope::prelude::*;
///
/// let mut builder = MethodBodyBuilder::new("Demo::Run()".into());
/// builder.ret(None);
/// let cfg = CfgBuilder::new().build(&builder.finish()?)?;
/// assert_eq!(cfg.block_count(), 1);
/// # Ok::<(), flowscope::Error>(())
/// ```
pub mod prelude;

/// Program analyses: control flow graphs, dataflow, SSA, points-to and call graphs.
pub mod analysis;

/// The instruction and method body model.
pub mod body;

/// The type universe consumed by class hierarchy and call graph analysis.
pub mod model;

/// Generic graph infrastructure and bit sets.
pub mod utils;

/// `flowscope` Result type
///
/// A type alias for `std::result::Result<T, Error>` where the error type is always [`Error`].
/// This is used consistently throughout the crate for all fallible operations.
pub type Result<T> = std::result::Result<T, Error>;

/// `flowscope` Error type
///
/// The main error type for all operations in this crate. Provides detailed error
/// information for malformed method bodies, contract violations and analysis failures.
pub use error::Error;
