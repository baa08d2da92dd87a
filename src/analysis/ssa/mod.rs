//! Static Single Assignment form.
//!
//! In SSA form every variable is assigned exactly once. Each assignment of a body
//! variable becomes a new version, and phi nodes merge versions where control flow
//! joins. Def-use chains then become explicit: every [`SsaVariable`] knows its single
//! definition and all of its uses.
//!
//! # Architecture
//!
//! - [`SsaBuilder`] - Phi placement through iterated dominance frontiers, then
//!   renaming along the dominator tree
//! - [`SsaFunction`] / [`SsaBlock`] / [`SsaInstruction`] - The converted body
//! - [`SsaVariable`] / [`SsaVarId`] - Versions and their def/use sites
//! - [`PhiNode`] / [`PhiOperand`] - Merges at join points
//!
//! # Example
//!
//! ```rust
//! use flowscope::analysis::{CfgBuilder, SsaBuilder};
//! use flowscope::body::{MethodBodyBuilder, Variable};
//!
//! let x = Variable::local("x");
//! let mut builder = MethodBodyBuilder::new("Demo::Twice()".into());
//! builder.constant(x.clone()).constant(x.clone()).ret(Some(x.clone()));
//! let cfg = CfgBuilder::new().build(&builder.finish()?)?;
//!
//! let ssa = SsaBuilder::build(&cfg);
//! let names: Vec<String> = ssa.versions(&x).map(ToString::to_string).collect();
//! assert_eq!(names, ["x_0", "x_1", "x_2"]);
//! assert_eq!(ssa.phi_count(), 0);
//! # Ok::<(), flowscope::Error>(())
//! ```
//!
//! # Thread Safety
//!
//! All types in this module are `Send` and `Sync`.

mod builder;
mod function;
mod phi;
mod variable;

pub use builder::SsaBuilder;
pub use function::{SsaBlock, SsaFunction, SsaInstruction};
pub use phi::{PhiNode, PhiOperand};
pub use variable::{DefSite, SsaVarId, SsaVariable, UseSite};
