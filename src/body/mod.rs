//! The method body model: the per-method input contract of all analyses.
//!
//! An upstream reader (CIL or JVM) translates bytecode into this neutral form:
//! an ordered list of [`Instruction`]s with offsets, the [`ProtectedRegion`]s of the
//! method, and its parameters and locals. Nothing here decodes bytecode; the model is
//! consumed read-only by [`crate::analysis::CfgBuilder`] and the dataflow analyses.
//!
//! # Key Components
//!
//! - [`MethodBody`] - One method's instructions, regions and variables
//! - [`Instruction`] / [`InstructionKind`] - Tagged instruction variants
//! - [`ProtectedRegion`] / [`HandlerKind`] - Try blocks and their handlers
//! - [`MethodBodyBuilder`] - Label-based construction for synthesized bodies

mod builder;
mod instruction;
mod method;
mod region;

pub use builder::MethodBodyBuilder;
pub use instruction::{
    label_for, BranchKind, Dispatch, FieldRef, Instruction, InstructionKind, ProtectedMarker,
    Variable, VariableKind,
};
pub use method::MethodBody;
pub use region::{HandlerKind, ProtectedRegion};
