//! # flowscope Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! from the flowscope library. Import this module to get quick access to the essential
//! types for building method bodies and running analyses on them.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all flowscope operations
pub use crate::Error;

/// The result type used throughout flowscope
pub use crate::Result;

// ================================================================================================
// Method Body Model
// ================================================================================================

/// Instructions, variables and the builder producing method bodies
pub use crate::body::{
    BranchKind, Dispatch, FieldRef, HandlerKind, Instruction, InstructionKind, MethodBody,
    MethodBodyBuilder, ProtectedRegion, Variable,
};

/// Types, methods and the universe they live in
pub use crate::model::{MethodDefinition, MethodModifiers, MethodRef, TypeDefinition, TypeUniverse};

// ================================================================================================
// Control Flow
// ================================================================================================

/// Control flow graph construction and queries
pub use crate::analysis::{
    AnalysisConfig, CfgBuilder, CfgEdgeKind, CfgLoop, CfgNode, CfgNodeKind, ControlFlowGraph,
};

// ================================================================================================
// Dataflow and Points-To
// ================================================================================================

/// The generic fixpoint framework
pub use crate::analysis::{DataFlowAnalysis, DataFlowResults, DataFlowSolver, Direction};

/// Bundled analyses
pub use crate::analysis::{CopyPropagation, PointsToAnalysis, TypeInference};

/// Points-to graphs
pub use crate::analysis::{PointsToGraph, PtgNodeId, PtgNodeIdAllocator, PtgNodeKind};

/// SSA form
pub use crate::analysis::{PhiNode, SsaBuilder, SsaFunction, SsaVarId, SsaVariable};

/// Typed fact storage
pub use crate::analysis::{AnalysisInfo, AnalysisInfoMap, InfoKey};

// ================================================================================================
// Inter-procedural
// ================================================================================================

/// Call graphs and Class Hierarchy Analysis
pub use crate::analysis::{CallGraph, CallGraphBuilder, ClassHierarchy, ClassHierarchyAnalysis};

/// Graph node identifiers
pub use crate::utils::graph::NodeId;
