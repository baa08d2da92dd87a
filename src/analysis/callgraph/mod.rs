//! Inter-procedural call graph construction.
//!
//! This module records which methods call which, at the granularity of individual
//! call instructions. A [`CallGraph`] can be filled by hand, or built from a
//! [`TypeUniverse`](crate::model::TypeUniverse) with [`CallGraphBuilder`], which
//! resolves virtual calls with Class Hierarchy Analysis.
//!
//! # Components
//!
//! - [`CallGraph`]: Per-method call sites plus the reverse invocation index
//! - [`CallSite`]: A call instruction with its static target and resolved callees
//! - [`CallSiteRef`]: Back-reference from a callee to a call site
//! - [`MethodCallInfo`]: Everything recorded for one method
//! - [`CallGraphBuilder`]: Worklist construction from root methods
//!
//! # Example
//!
//! ```rust
//! use flowscope::analysis::CallGraph;
//! use flowscope::model::MethodRef;
//!
//! let main = MethodRef::from("Program::Main()");
//! let mut graph = CallGraph::new();
//! graph.add_root(main.clone());
//! graph.add_call_site(&main, "L_0000", "Program::Run()".into());
//!
//! let site = graph.call_site(&main, "L_0000").unwrap();
//! assert!(!site.is_resolved());
//! ```

mod builder;
mod graph;
mod site;

pub use builder::CallGraphBuilder;
pub use graph::CallGraph;
pub use site::{CallSite, CallSiteRef, MethodCallInfo};
