//! Abstract heap nodes of the points-to graph.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
    sync::atomic::{AtomicU32, Ordering},
};

use strum::Display;

use crate::{
    body::{FieldRef, Variable},
    model::TypeName,
    Error, Result,
};

/// Field-keyed multimap of node ids, used for both edge directions.
pub type FieldEdges = BTreeMap<FieldRef, BTreeSet<PtgNodeId>>;

/// Stable identifier of a points-to node.
///
/// Ids are only meaningful within the family of graphs whose nodes were allocated by
/// one [`PtgNodeIdAllocator`]. `0` is reserved for the canonical Null node.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PtgNodeId(u32);

impl PtgNodeId {
    /// The canonical Null node present in every graph.
    pub const NULL: PtgNodeId = PtgNodeId(0);

    /// Wraps a raw id.
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        PtgNodeId(raw)
    }

    /// Returns the raw id.
    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for PtgNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PtgNodeId({})", self.0)
    }
}

impl fmt::Display for PtgNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Source of allocator family numbers; every allocator gets its own.
static NEXT_FAMILY: AtomicU32 = AtomicU32::new(1);

/// Hands out unique node ids for every graph that may later be united.
///
/// Each allocator belongs to its own family. A [`PointsToGraph`] remembers the family
/// of the allocator that populated it, and uniting graphs of different families is
/// rejected with [`Error::PtgIdCollision`] even when their nodes look alike.
///
/// [`PointsToGraph`]: crate::analysis::PointsToGraph
#[derive(Debug)]
pub struct PtgNodeIdAllocator {
    family: u32,
    next: AtomicU32,
}

impl Default for PtgNodeIdAllocator {
    fn default() -> Self {
        PtgNodeIdAllocator {
            family: NEXT_FAMILY.fetch_add(1, Ordering::Relaxed),
            next: AtomicU32::new(1),
        }
    }
}

impl PtgNodeIdAllocator {
    /// Creates an allocator whose first id is `1`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the family shared by all graphs populated from this allocator.
    #[must_use]
    pub fn family(&self) -> u32 {
        self.family
    }

    /// Returns a fresh id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PtgIdExhausted`] once every id below `u32::MAX` has been handed
    /// out. The counter never wraps back to [`PtgNodeId::NULL`].
    pub fn allocate(&self) -> Result<PtgNodeId> {
        self.next
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |next| {
                next.checked_add(1)
            })
            .map(PtgNodeId)
            .map_err(|_| Error::PtgIdExhausted)
    }

    /// Returns the number of ids handed out so far.
    #[must_use]
    pub fn allocated(&self) -> u32 {
        self.next.load(Ordering::Relaxed) - 1
    }

    #[cfg(test)]
    pub(crate) fn starting_at(next: u32) -> Self {
        PtgNodeIdAllocator {
            next: AtomicU32::new(next),
            ..Self::default()
        }
    }
}

/// What an abstract heap node stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum PtgNodeKind {
    /// The null reference
    Null,
    /// Objects allocated at one creation site
    Object,
    /// Objects created outside the analyzed code; may alias anything
    Unknown,
}

/// A node of a [`PointsToGraph`](crate::analysis::PointsToGraph).
///
/// The edge maps are owned by the graph: `sources[f]` holds the nodes with an `f` edge
/// into this node, `targets[f]` the nodes this node's `f` field may reference. The
/// graph keeps both directions symmetric.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PtgNode {
    id: PtgNodeId,
    kind: PtgNodeKind,
    ty: Option<TypeName>,
    offset: Option<u32>,
    pub(crate) variables: BTreeSet<Variable>,
    pub(crate) sources: FieldEdges,
    pub(crate) targets: FieldEdges,
}

impl PtgNode {
    /// Creates a detached node without edges.
    #[must_use]
    pub fn new(id: PtgNodeId, kind: PtgNodeKind, ty: Option<TypeName>, offset: Option<u32>) -> Self {
        PtgNode {
            id,
            kind,
            ty,
            offset,
            variables: BTreeSet::new(),
            sources: FieldEdges::new(),
            targets: FieldEdges::new(),
        }
    }

    /// The canonical Null node.
    #[must_use]
    pub fn null() -> Self {
        Self::new(PtgNodeId::NULL, PtgNodeKind::Null, None, None)
    }

    /// An allocation-site node.
    #[must_use]
    pub fn object(id: PtgNodeId, ty: impl Into<TypeName>, offset: u32) -> Self {
        Self::new(id, PtgNodeKind::Object, Some(ty.into()), Some(offset))
    }

    /// A placeholder for objects created outside the analyzed code.
    #[must_use]
    pub fn unknown(id: PtgNodeId, ty: Option<TypeName>, offset: Option<u32>) -> Self {
        Self::new(id, PtgNodeKind::Unknown, ty, offset)
    }

    /// Returns the node id.
    #[must_use]
    pub fn id(&self) -> PtgNodeId {
        self.id
    }

    /// Returns the node kind.
    #[must_use]
    pub fn kind(&self) -> PtgNodeKind {
        self.kind
    }

    /// Returns the static type, if known.
    #[must_use]
    pub fn ty(&self) -> Option<&TypeName> {
        self.ty.as_ref()
    }

    /// Returns the creation-site offset, if any.
    #[must_use]
    pub fn offset(&self) -> Option<u32> {
        self.offset
    }

    /// Returns `true` for the Null node.
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.kind == PtgNodeKind::Null
    }

    /// Returns `true` for Unknown nodes.
    #[must_use]
    pub fn is_unknown(&self) -> bool {
        self.kind == PtgNodeKind::Unknown
    }

    /// Returns the variables currently pointing to this node.
    #[must_use]
    pub fn variables(&self) -> &BTreeSet<Variable> {
        &self.variables
    }

    /// Returns the incoming field edges.
    #[must_use]
    pub fn sources(&self) -> &FieldEdges {
        &self.sources
    }

    /// Returns the outgoing field edges.
    #[must_use]
    pub fn targets(&self) -> &FieldEdges {
        &self.targets
    }

    /// Returns `true` if `other` describes the same abstract location: same id, kind,
    /// type and creation site. Edges are not compared.
    #[must_use]
    pub fn same_identity(&self, other: &PtgNode) -> bool {
        self.id == other.id
            && self.kind == other.kind
            && self.ty == other.ty
            && self.offset == other.offset
    }

    /// Returns a copy of this node without edges or variables.
    pub(crate) fn detached(&self) -> Self {
        Self::new(self.id, self.kind, self.ty.clone(), self.offset)
    }
}

impl fmt::Display for PtgNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.id, self.kind)?;
        if let Some(ty) = &self.ty {
            write!(f, " {ty}")?;
        }
        if let Some(offset) = self.offset {
            write!(f, " @{}", crate::body::label_for(offset))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocator_is_shared_counter() {
        let allocator = PtgNodeIdAllocator::new();
        let a = allocator.allocate().unwrap();
        let b = allocator.allocate().unwrap();
        assert_eq!(a, PtgNodeId::new(1));
        assert_eq!(b, PtgNodeId::new(2));
        assert_ne!(a, PtgNodeId::NULL);
        assert_eq!(allocator.allocated(), 2);
    }

    #[test]
    fn test_allocators_have_distinct_families() {
        let first = PtgNodeIdAllocator::new();
        let second = PtgNodeIdAllocator::new();
        assert_ne!(first.family(), second.family());
        assert_eq!(first.allocate().unwrap(), second.allocate().unwrap());
    }

    #[test]
    fn test_allocator_exhaustion_never_wraps() {
        let allocator = PtgNodeIdAllocator::starting_at(u32::MAX - 1);
        assert_eq!(allocator.allocate().unwrap(), PtgNodeId::new(u32::MAX - 1));
        assert!(matches!(allocator.allocate(), Err(Error::PtgIdExhausted)));
        assert!(matches!(allocator.allocate(), Err(Error::PtgIdExhausted)));
        assert_eq!(allocator.allocated(), u32::MAX - 1);
    }

    #[test]
    fn test_identity_ignores_edges() {
        let id = PtgNodeId::new(7);
        let mut a = PtgNode::object(id, "Foo", 3);
        a.variables.insert(Variable::local("x"));
        let b = PtgNode::object(id, "Foo", 3);
        assert!(a.same_identity(&b));
        assert_ne!(a, b);
        assert_eq!(a.detached(), b);

        assert!(!a.same_identity(&PtgNode::object(id, "Foo", 4)));
        assert!(!a.same_identity(&PtgNode::unknown(id, Some("Foo".into()), Some(3))));
    }

    #[test]
    fn test_display() {
        assert_eq!(PtgNode::null().to_string(), "#0 Null");
        assert_eq!(
            PtgNode::object(PtgNodeId::new(4), "Foo", 0x12).to_string(),
            "#4 Object Foo @L_0012"
        );
    }
}
