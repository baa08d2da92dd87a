//! Node identifier for the arena-backed graphs.
//!
//! Graph nodes live in a vector owned by their graph; edges and side tables refer to
//! them exclusively through [`NodeId`], never through references between nodes.

use std::fmt;

/// A strongly-typed index of a node inside its owning graph.
///
/// Ids are assigned sequentially in insertion order starting at zero, which makes them
/// usable as direct indices into per-node side tables (dominator sets, orderings).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Creates a node id from a raw index.
    #[must_use]
    #[inline]
    pub const fn new(index: usize) -> Self {
        NodeId(index)
    }

    /// Returns the raw index of this node.
    #[must_use]
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

impl From<usize> for NodeId {
    #[inline]
    fn from(index: usize) -> Self {
        NodeId(index)
    }
}

impl From<NodeId> for usize {
    #[inline]
    fn from(node: NodeId) -> Self {
        node.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_roundtrip_and_order() {
        let node: NodeId = 7usize.into();
        assert_eq!(node.index(), 7);
        assert_eq!(usize::from(node), 7);

        let mut nodes = vec![NodeId::new(3), NodeId::new(1), NodeId::new(2)];
        nodes.sort();
        assert_eq!(nodes, vec![NodeId::new(1), NodeId::new(2), NodeId::new(3)]);
    }

    #[test]
    fn test_node_id_formatting() {
        assert_eq!(format!("{:?}", NodeId::new(42)), "NodeId(42)");
        assert_eq!(format!("{}", NodeId::new(42)), "n42");
    }
}
