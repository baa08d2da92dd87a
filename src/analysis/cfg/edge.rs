//! Control flow edge types for the CFG.
//!
//! Edge kinds are stored as the edge payload of the graph. [`CfgEdge`] is a plain
//! `(source, target)` value used when reasoning about edges, e.g. back edges of loops.

use std::fmt;

use crate::{model::TypeName, utils::graph::NodeId};

/// The kind of control flow represented by an edge.
///
/// # Examples
///
/// ```rust
/// use flowscope::analysis::CfgEdgeKind;
///
/// assert!(CfgEdgeKind::ConditionalTrue.is_conditional());
/// assert!(CfgEdgeKind::Leave.is_exceptional());
/// assert!(!CfgEdgeKind::FallThrough.is_exceptional());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CfgEdgeKind {
    /// Entry node to the first block (or to Exit for an empty body).
    Entry,

    /// Fall-through into the lexically next block, including the not-taken path of
    /// conditional branches and the default case of switches.
    FallThrough,

    /// Unconditional branch.
    Unconditional,

    /// The taken path of a conditional branch.
    ConditionalTrue,

    /// A switch case edge.
    Switch {
        /// Index of the case in the switch operand list.
        case: usize,
    },

    /// Edge to an exception handler (or filter) from a block of its try range.
    ExceptionHandler {
        /// The caught type for typed catch handlers, `None` otherwise.
        exception_type: Option<TypeName>,
    },

    /// Edge from a `leave` instruction exiting a protected region.
    Leave,

    /// Edge from an `endfinally` block to where control continues after the handler.
    EndFinally,

    /// Edge from a block ending in a return to Exit.
    Return,

    /// Edge from a block ending in a throw or rethrow to Exit.
    Throw,
}

impl CfgEdgeKind {
    /// Returns `true` if this is the taken path of a conditional branch.
    #[must_use]
    pub const fn is_conditional(&self) -> bool {
        matches!(self, Self::ConditionalTrue)
    }

    /// Returns `true` if this edge exists because of exception handling.
    #[must_use]
    pub const fn is_exceptional(&self) -> bool {
        matches!(
            self,
            Self::ExceptionHandler { .. } | Self::Leave | Self::EndFinally | Self::Throw
        )
    }

    /// Returns `true` if this is a switch case edge.
    #[must_use]
    pub const fn is_switch(&self) -> bool {
        matches!(self, Self::Switch { .. })
    }
}

/// An ordered `(source, target)` pair of CFG nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CfgEdge {
    /// The node control leaves.
    pub source: NodeId,
    /// The node control enters.
    pub target: NodeId,
}

impl CfgEdge {
    /// Creates an edge value.
    #[must_use]
    pub const fn new(source: NodeId, target: NodeId) -> Self {
        Self { source, target }
    }
}

impl fmt::Display for CfgEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source, self.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_kind_predicates() {
        assert!(CfgEdgeKind::Switch { case: 2 }.is_switch());
        assert!(CfgEdgeKind::ExceptionHandler {
            exception_type: Some("System.Exception".to_string())
        }
        .is_exceptional());
        assert!(CfgEdgeKind::Throw.is_exceptional());
        assert!(!CfgEdgeKind::Return.is_exceptional());
        assert!(!CfgEdgeKind::Unconditional.is_conditional());
    }

    #[test]
    fn test_edge_value() {
        let edge = CfgEdge::new(NodeId::new(5), NodeId::new(2));
        assert_eq!(edge.to_string(), "n5 -> n2");
        assert!(CfgEdge::new(NodeId::new(1), NodeId::new(9)) < edge);
    }
}
