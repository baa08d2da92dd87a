use thiserror::Error;

use crate::analysis::pointsto::PtgNodeId;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// # Error Categories
///
/// ## Malformed Input
/// - [`Error::Malformed`] - The upstream loader produced an inconsistent method body
///   (unresolvable branch target, protected region that does not bound any instruction)
///
/// ## Precondition Violations
/// - [`Error::PtgNodeMissing`] - A points-to mutation referenced a node that is not in the graph
/// - [`Error::PtgIdCollision`] - Two distinct points-to nodes share one id, or graphs from
///   different id allocators were merged
/// - [`Error::PtgIdExhausted`] - A points-to id allocator ran out of ids
/// - [`Error::InfoKeyMissing`] - An analysis fact was read before it was ever stored
/// - [`Error::InfoTypeMismatch`] - An analysis fact was read with the wrong value type
/// - [`Error::GraphError`] - Structural misuse of the generic graph containers
///
/// ## Analysis Errors
/// - [`Error::IterationLimit`] - A fixpoint computation did not converge in time
/// - [`Error::MethodNotFound`] - A call graph root is not part of the type universe
///
/// ## Method Body Construction
/// - [`Error::DuplicateLabel`] / [`Error::UndefinedLabel`] - Label misuse in
///   [`crate::body::MethodBodyBuilder`]
///
/// # Examples
///
/// ```rust
/// use flowscope::{body::MethodBody, analysis::CfgBuilder, Error};
///
/// let body = MethodBody::new("Demo::Empty()".into());
/// match CfgBuilder::new().build(&body) {
///     Ok(cfg) => assert_eq!(cfg.node_count(), 2),
///     Err(Error::Malformed { message, .. }) => eprintln!("bad method body: {message}"),
///     Err(e) => eprintln!("other error: {e}"),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The method body is inconsistent and cannot be analyzed.
    ///
    /// The error includes the source location where the malformation was
    /// detected for debugging purposes.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// Structural misuse of a graph container, e.g. an edge to a node that was never added.
    #[error("{0}")]
    GraphError(String),

    /// A points-to graph operation referenced a node that does not belong to the graph.
    #[error("Points-to node {0} is not part of the graph")]
    PtgNodeMissing(PtgNodeId),

    /// Two different points-to nodes were found under the same id.
    ///
    /// Node ids of graphs that are merged with [`crate::analysis::PointsToGraph::union`]
    /// must be allocated from one shared [`crate::analysis::PtgNodeIdAllocator`].
    #[error("Points-to node id collision on {0}")]
    PtgIdCollision(PtgNodeId),

    /// A [`crate::analysis::PtgNodeIdAllocator`] has handed out every id it can represent.
    #[error("Points-to node ids exhausted")]
    PtgIdExhausted,

    /// An analysis fact was requested under a key that was never set.
    #[error("Analysis info has no value for key '{0}'")]
    InfoKeyMissing(&'static str),

    /// An analysis fact exists but holds a different type than requested.
    #[error("Analysis info value for key '{0}' has a different type")]
    InfoTypeMismatch(&'static str),

    /// A fixpoint iteration exceeded the configured iteration budget.
    ///
    /// This only happens for transfer or join functions that are not monotone.
    #[error("{analysis} did not converge within {limit} iterations")]
    IterationLimit {
        /// Name of the analysis that was aborted
        analysis: &'static str,
        /// The iteration budget that was exhausted
        limit: usize,
    },

    /// A method required by an analysis is not part of the type universe.
    #[error("Method not found - {0}")]
    MethodNotFound(String),

    /// A label was bound twice while building a method body.
    #[error("Duplicate label - {0}")]
    DuplicateLabel(String),

    /// A branch or region refers to a label that was never bound.
    #[error("Undefined label - {0}")]
    UndefinedLabel(String),
}
