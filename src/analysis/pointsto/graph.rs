//! The points-to graph container.
//!
//! Nodes live in an arena keyed by [`PtgNodeId`]. Variable edges and field edges are
//! id-based relations owned by the container, so a graph can be cloned, united and
//! compared without chasing references.

use std::collections::{BTreeMap, BTreeSet};

use crate::{
    analysis::pointsto::{PtgNode, PtgNodeId, PtgNodeIdAllocator, PtgNodeKind},
    body::{FieldRef, Variable},
    model::TypeName,
    Error, Result,
};

/// A may-alias heap abstraction: variables point to sets of abstract nodes, nodes
/// point to each other through fields.
///
/// The Null node ([`PtgNodeId::NULL`]) is always present.
///
/// A graph is bound to the [`PtgNodeIdAllocator`] family of the first allocator it
/// draws ids from; clones and unions inherit the binding.
///
/// # Invariants
///
/// - `b ∈ a.targets()[f]` if and only if `a ∈ b.sources()[f]`
/// - `n ∈ targets(v)` if and only if `v ∈ n.variables()`
///
/// # Examples
///
/// ```rust
/// use flowscope::analysis::{PointsToGraph, PtgNodeIdAllocator, PtgNodeKind};
/// use flowscope::body::{FieldRef, Variable};
///
/// let ids = PtgNodeIdAllocator::new();
/// let mut ptg = PointsToGraph::new();
/// let list = ptg.new_node(&ids, PtgNodeKind::Object, Some("List".into()), Some(0))?;
/// let item = ptg.new_node(&ids, PtgNodeKind::Object, Some("Item".into()), Some(4))?;
///
/// let head = FieldRef::new("List", "head");
/// ptg.points_to(&Variable::local("l"), list)?;
/// ptg.points_to_field(list, &head, item)?;
///
/// assert!(ptg.field_sources(item, &head).any(|n| n == list));
///
/// let copy = ptg.clone();
/// assert!(copy.graph_equals(&ptg));
/// # Ok::<(), flowscope::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct PointsToGraph {
    nodes: BTreeMap<PtgNodeId, PtgNode>,
    variables: BTreeMap<Variable, BTreeSet<PtgNodeId>>,
    /// Allocator family the node ids were drawn from
    family: Option<u32>,
}

impl Default for PointsToGraph {
    fn default() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(PtgNodeId::NULL, PtgNode::null());
        PointsToGraph {
            nodes,
            variables: BTreeMap::new(),
            family: None,
        }
    }
}

impl PointsToGraph {
    /// Creates a graph holding only the Null node.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a graph holding only the Null node, bound to the family of `ids`.
    #[must_use]
    pub fn with_allocator(ids: &PtgNodeIdAllocator) -> Self {
        PointsToGraph {
            family: Some(ids.family()),
            ..Self::default()
        }
    }

    /// Returns the allocator family this graph is bound to, if any.
    #[must_use]
    pub fn family(&self) -> Option<u32> {
        self.family
    }

    /// Binds the graph to the family of `ids`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PtgIdCollision`] for `id` if the graph is bound to another family.
    pub(crate) fn bind(&mut self, ids: &PtgNodeIdAllocator, id: PtgNodeId) -> Result<()> {
        match self.family {
            Some(family) if family != ids.family() => Err(Error::PtgIdCollision(id)),
            Some(_) => Ok(()),
            None => {
                self.family = Some(ids.family());
                Ok(())
            }
        }
    }

    /// Returns the Null node.
    #[must_use]
    pub fn null_node(&self) -> &PtgNode {
        // Present from construction and never removed
        &self.nodes[&PtgNodeId::NULL]
    }

    /// Inserts a detached node. Edges and variables of `node` are ignored.
    ///
    /// Adding a node whose identity already exists is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PtgIdCollision`] if a different node already has this id.
    pub fn add_node(&mut self, node: PtgNode) -> Result<PtgNodeId> {
        let id = node.id();
        match self.nodes.get(&id) {
            Some(existing) if existing.same_identity(&node) => Ok(id),
            Some(_) => Err(Error::PtgIdCollision(id)),
            None => {
                self.nodes.insert(id, node.detached());
                Ok(id)
            }
        }
    }

    /// Allocates an id from `ids` and inserts a fresh node.
    ///
    /// # Errors
    ///
    /// - [`Error::PtgIdCollision`] if the graph is bound to another allocator family or
    ///   already holds a node with the allocated id
    /// - [`Error::PtgIdExhausted`] if `ids` has no id left
    pub fn new_node(
        &mut self,
        ids: &PtgNodeIdAllocator,
        kind: PtgNodeKind,
        ty: Option<TypeName>,
        offset: Option<u32>,
    ) -> Result<PtgNodeId> {
        let id = ids.allocate()?;
        self.bind(ids, id)?;
        if self.nodes.contains_key(&id) {
            return Err(Error::PtgIdCollision(id));
        }
        self.add_node(PtgNode::new(id, kind, ty, offset))
    }

    /// Returns `true` if the graph has a node with this id.
    #[must_use]
    pub fn contains_node(&self, id: PtgNodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Returns the node with this id.
    #[must_use]
    pub fn node(&self, id: PtgNodeId) -> Option<&PtgNode> {
        self.nodes.get(&id)
    }

    /// Iterates over all nodes in id order.
    pub fn nodes(&self) -> impl Iterator<Item = &PtgNode> + '_ {
        self.nodes.values()
    }

    /// Returns the number of nodes, including Null.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Iterates over all variables the graph knows, including those detached by
    /// [`remove_edges`](Self::remove_edges).
    pub fn variables(&self) -> impl Iterator<Item = &Variable> + '_ {
        self.variables.keys()
    }

    fn require(&self, id: PtgNodeId) -> Result<()> {
        if self.nodes.contains_key(&id) {
            Ok(())
        } else {
            Err(Error::PtgNodeMissing(id))
        }
    }

    /// Records that `variable` may reference `node`. Targets accumulate.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PtgNodeMissing`] if `node` is not part of the graph.
    pub fn points_to(&mut self, variable: &Variable, node: PtgNodeId) -> Result<()> {
        let Some(target) = self.nodes.get_mut(&node) else {
            return Err(Error::PtgNodeMissing(node));
        };
        target.variables.insert(variable.clone());
        self.variables
            .entry(variable.clone())
            .or_default()
            .insert(node);
        Ok(())
    }

    /// Records that field `field` of `source` may reference `target`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PtgNodeMissing`] if either node is not part of the graph. The
    /// graph is unchanged in that case.
    pub fn points_to_field(
        &mut self,
        source: PtgNodeId,
        field: &FieldRef,
        target: PtgNodeId,
    ) -> Result<()> {
        self.require(source)?;
        self.require(target)?;

        if let Some(node) = self.nodes.get_mut(&source) {
            node.targets.entry(field.clone()).or_default().insert(target);
        }
        if let Some(node) = self.nodes.get_mut(&target) {
            node.sources.entry(field.clone()).or_default().insert(source);
        }
        Ok(())
    }

    /// Detaches `variable` from every node it points to.
    ///
    /// The variable stays known to the graph with an empty target set. Other
    /// variables and all field edges are untouched.
    pub fn remove_edges(&mut self, variable: &Variable) {
        let Some(targets) = self.variables.get_mut(variable) else {
            return;
        };
        for id in std::mem::take(targets) {
            if let Some(node) = self.nodes.get_mut(&id) {
                node.variables.remove(variable);
            }
        }
    }

    /// Detaches `variable` and forgets it.
    pub fn remove_variable(&mut self, variable: &Variable) {
        self.remove_edges(variable);
        self.variables.remove(variable);
    }

    /// Iterates over the nodes `variable` may reference.
    pub fn targets(&self, variable: &Variable) -> impl Iterator<Item = PtgNodeId> + '_ {
        self.variables.get(variable).into_iter().flatten().copied()
    }

    /// Iterates over the nodes field `field` of `node` may reference.
    pub fn field_targets<'a>(
        &'a self,
        node: PtgNodeId,
        field: &FieldRef,
    ) -> impl Iterator<Item = PtgNodeId> + 'a {
        self.nodes
            .get(&node)
            .and_then(|n| n.targets.get(field))
            .into_iter()
            .flatten()
            .copied()
    }

    /// Iterates over the nodes whose field `field` may reference `node`.
    pub fn field_sources<'a>(
        &'a self,
        node: PtgNodeId,
        field: &FieldRef,
    ) -> impl Iterator<Item = PtgNodeId> + 'a {
        self.nodes
            .get(&node)
            .and_then(|n| n.sources.get(field))
            .into_iter()
            .flatten()
            .copied()
    }

    /// Merges `other` into this graph.
    ///
    /// Nodes missing here are copied by id; nodes present in both keep this graph's
    /// copy. Variable and field edges of `other` are added on top of the existing ones.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PtgIdCollision`] if the graphs are bound to different allocator
    /// families, or if both hold a node with the same id but a different kind, type or
    /// creation site. Nothing is merged in that case.
    pub fn union(&mut self, other: &PointsToGraph) -> Result<()> {
        if let (Some(mine), Some(theirs)) = (self.family, other.family) {
            if mine != theirs {
                let id = other
                    .nodes
                    .keys()
                    .copied()
                    .find(|id| *id != PtgNodeId::NULL && self.nodes.contains_key(id))
                    .or_else(|| other.nodes.keys().copied().find(|id| *id != PtgNodeId::NULL))
                    .unwrap_or(PtgNodeId::NULL);
                return Err(Error::PtgIdCollision(id));
            }
        }
        for (id, node) in &other.nodes {
            if let Some(existing) = self.nodes.get(id) {
                if !existing.same_identity(node) {
                    return Err(Error::PtgIdCollision(*id));
                }
            }
        }

        self.family = self.family.or(other.family);
        for node in other.nodes.values() {
            self.add_node(node.detached())?;
        }
        for (variable, targets) in &other.variables {
            self.variables.entry(variable.clone()).or_default();
            for &id in targets {
                self.points_to(variable, id)?;
            }
        }
        for node in other.nodes.values() {
            for (field, targets) in &node.targets {
                for &target in targets {
                    self.points_to_field(node.id(), field, target)?;
                }
            }
        }
        Ok(())
    }

    /// Structural equality: the same variable mappings and, node by node, the same
    /// attached variables and field edges.
    #[must_use]
    pub fn graph_equals(&self, other: &PointsToGraph) -> bool {
        if self.variables != other.variables || self.nodes.len() != other.nodes.len() {
            return false;
        }
        self.nodes.iter().all(|(id, node)| {
            other.nodes.get(id).is_some_and(|theirs| {
                node.variables == theirs.variables
                    && node.sources == theirs.sources
                    && node.targets == theirs.targets
            })
        })
    }

    /// Returns `true` if `a` and `b` may reference the same object.
    ///
    /// They do if they share a target other than Null, or if either may reference an
    /// Unknown node while the other references any non-null node.
    #[must_use]
    pub fn may_alias(&self, a: &Variable, b: &Variable) -> bool {
        let non_null = |v: &Variable| -> BTreeSet<PtgNodeId> {
            self.targets(v).filter(|&id| id != PtgNodeId::NULL).collect()
        };
        let (left, right) = (non_null(a), non_null(b));
        if left.is_empty() || right.is_empty() {
            return false;
        }
        let has_unknown = |ids: &BTreeSet<PtgNodeId>| {
            ids.iter()
                .any(|id| self.nodes.get(id).is_some_and(PtgNode::is_unknown))
        };
        !left.is_disjoint(&right) || has_unknown(&left) || has_unknown(&right)
    }

    /// Returns every node reachable from `roots` through variable and field edges.
    pub fn reachable_nodes<'v, I>(&self, roots: I) -> BTreeSet<PtgNodeId>
    where
        I: IntoIterator<Item = &'v Variable>,
    {
        let mut reached = BTreeSet::new();
        let mut worklist: Vec<PtgNodeId> =
            roots.into_iter().flat_map(|v| self.targets(v)).collect();

        while let Some(id) = worklist.pop() {
            if !reached.insert(id) {
                continue;
            }
            if let Some(node) = self.nodes.get(&id) {
                worklist.extend(node.targets.values().flatten().copied());
            }
        }
        reached
    }
}

impl PartialEq for PointsToGraph {
    fn eq(&self, other: &Self) -> bool {
        self.graph_equals(other)
    }
}

impl Eq for PointsToGraph {}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str) -> FieldRef {
        FieldRef::new("Node", name)
    }

    fn assert_symmetric(ptg: &PointsToGraph) {
        for node in ptg.nodes() {
            for (f, targets) in node.targets() {
                for &t in targets {
                    assert!(ptg.field_sources(t, f).any(|s| s == node.id()));
                }
            }
            for (f, sources) in node.sources() {
                for &s in sources {
                    assert!(ptg.field_targets(s, f).any(|t| t == node.id()));
                }
            }
        }
    }

    #[test]
    fn test_new_graph_has_null() {
        let ptg = PointsToGraph::new();
        assert_eq!(ptg.node_count(), 1);
        assert!(ptg.null_node().is_null());
        assert!(ptg.contains_node(PtgNodeId::NULL));
        assert_eq!(ptg.variables().count(), 0);
    }

    #[test]
    fn test_points_to_accumulates() {
        let ids = PtgNodeIdAllocator::new();
        let mut ptg = PointsToGraph::new();
        let a = ptg.new_node(&ids, PtgNodeKind::Object, None, Some(0)).unwrap();
        let b = ptg.new_node(&ids, PtgNodeKind::Object, None, Some(1)).unwrap();
        let x = Variable::local("x");

        ptg.points_to(&x, a).unwrap();
        ptg.points_to(&x, b).unwrap();
        ptg.points_to(&x, a).unwrap();

        assert_eq!(ptg.targets(&x).collect::<Vec<_>>(), vec![a, b]);
        assert!(ptg.node(a).unwrap().variables().contains(&x));
    }

    #[test]
    fn test_missing_node_rejected() {
        let mut ptg = PointsToGraph::new();
        let ghost = PtgNodeId::new(99);
        let x = Variable::local("x");

        assert!(matches!(
            ptg.points_to(&x, ghost),
            Err(Error::PtgNodeMissing(id)) if id == ghost
        ));
        assert!(matches!(
            ptg.points_to_field(PtgNodeId::NULL, &field("next"), ghost),
            Err(Error::PtgNodeMissing(_))
        ));
        assert!(ptg.null_node().sources().is_empty());
        assert!(ptg.null_node().targets().is_empty());
        assert_eq!(ptg.targets(&x).count(), 0);
    }

    #[test]
    fn test_field_edges_symmetric() {
        let ids = PtgNodeIdAllocator::new();
        let mut ptg = PointsToGraph::new();
        let a = ptg.new_node(&ids, PtgNodeKind::Object, None, Some(0)).unwrap();
        let b = ptg.new_node(&ids, PtgNodeKind::Object, None, Some(1)).unwrap();

        ptg.points_to_field(a, &field("next"), b).unwrap();
        ptg.points_to_field(b, &field("next"), a).unwrap();
        ptg.points_to_field(a, &field("prev"), PtgNodeId::NULL).unwrap();

        assert_eq!(ptg.field_targets(a, &field("next")).collect::<Vec<_>>(), vec![b]);
        assert_eq!(ptg.field_sources(a, &field("next")).collect::<Vec<_>>(), vec![b]);
        assert_eq!(
            ptg.field_sources(PtgNodeId::NULL, &field("prev")).collect::<Vec<_>>(),
            vec![a]
        );
        assert_symmetric(&ptg);
    }

    #[test]
    fn test_remove_edges_isolation() {
        let ids = PtgNodeIdAllocator::new();
        let mut ptg = PointsToGraph::new();
        let a = ptg.new_node(&ids, PtgNodeKind::Object, None, Some(0)).unwrap();
        let b = ptg.new_node(&ids, PtgNodeKind::Object, None, Some(1)).unwrap();
        let (x, y) = (Variable::local("x"), Variable::local("y"));

        ptg.points_to(&x, a).unwrap();
        ptg.points_to(&y, a).unwrap();
        ptg.points_to(&y, b).unwrap();
        ptg.points_to_field(a, &field("next"), b).unwrap();
        let before = ptg.clone();

        ptg.remove_edges(&x);

        assert_eq!(ptg.targets(&x).count(), 0);
        assert!(ptg.variables().any(|v| v == &x));
        assert_eq!(ptg.targets(&y).collect::<Vec<_>>(), before.targets(&y).collect::<Vec<_>>());
        assert!(!ptg.node(a).unwrap().variables().contains(&x));
        assert_eq!(ptg.node(a).unwrap().targets(), before.node(a).unwrap().targets());
        assert_eq!(ptg.node(b).unwrap().sources(), before.node(b).unwrap().sources());

        ptg.remove_variable(&x);
        assert!(!ptg.variables().any(|v| v == &x));
    }

    #[test]
    fn test_clone_equals_original() {
        let ids = PtgNodeIdAllocator::new();
        let mut ptg = PointsToGraph::new();
        let a = ptg.new_node(&ids, PtgNodeKind::Unknown, Some("T".into()), None).unwrap();
        ptg.points_to(&Variable::parameter("this"), a).unwrap();
        ptg.points_to_field(a, &field("f"), a).unwrap();

        let mut fresh = PointsToGraph::new();
        fresh.union(&ptg).unwrap();
        assert!(fresh.graph_equals(&ptg));
        assert!(ptg.clone().graph_equals(&ptg));
        assert_eq!(fresh, ptg);
    }

    #[test]
    fn test_union_merges_edges() {
        let ids = PtgNodeIdAllocator::new();
        let mut left = PointsToGraph::new();
        let a = left.new_node(&ids, PtgNodeKind::Object, None, Some(0)).unwrap();
        let mut right = left.clone();
        let b = right.new_node(&ids, PtgNodeKind::Object, None, Some(5)).unwrap();

        let x = Variable::local("x");
        left.points_to(&x, a).unwrap();
        right.points_to(&x, b).unwrap();
        right.points_to_field(a, &field("f"), b).unwrap();

        left.union(&right).unwrap();
        assert_eq!(left.targets(&x).collect::<Vec<_>>(), vec![a, b]);
        assert_eq!(left.field_sources(b, &field("f")).collect::<Vec<_>>(), vec![a]);
        assert_symmetric(&left);

        let snapshot = left.clone();
        left.union(&right).unwrap();
        assert!(left.graph_equals(&snapshot));
    }

    #[test]
    fn test_union_rejects_colliding_ids() {
        let seven = PtgNodeId::new(7);
        let mut left = PointsToGraph::new();
        left.add_node(PtgNode::object(seven, "A", 1)).unwrap();
        let mut right = PointsToGraph::new();
        right.add_node(PtgNode::object(seven, "B", 2)).unwrap();
        right.points_to(&Variable::local("r"), seven).unwrap();

        let before = left.clone();
        assert!(matches!(left.union(&right), Err(Error::PtgIdCollision(id)) if id == seven));
        assert!(left.graph_equals(&before));
    }

    #[test]
    fn test_union_rejects_graphs_of_different_allocators() {
        let foo_at_zero = |ptg: &mut PointsToGraph, ids: &PtgNodeIdAllocator| {
            ptg.new_node(ids, PtgNodeKind::Object, Some("Foo".into()), Some(0))
                .unwrap()
        };
        let (first, second) = (PtgNodeIdAllocator::new(), PtgNodeIdAllocator::new());
        let mut left = PointsToGraph::new();
        let foo = foo_at_zero(&mut left, &first);
        let mut right = PointsToGraph::new();
        let other = foo_at_zero(&mut right, &second);
        assert_eq!(foo, other);

        let (x, y) = (Variable::local("x"), Variable::local("y"));
        left.points_to(&x, foo).unwrap();
        right.points_to(&y, other).unwrap();

        let before = left.clone();
        assert!(matches!(left.union(&right), Err(Error::PtgIdCollision(id)) if id == foo));
        assert!(left.graph_equals(&before));
        assert!(!left.may_alias(&x, &y));
    }

    #[test]
    fn test_family_inherited_by_clone_and_union() {
        let ids = PtgNodeIdAllocator::new();
        let mut bound = PointsToGraph::with_allocator(&ids);
        assert_eq!(bound.family(), Some(ids.family()));
        let a = bound.new_node(&ids, PtgNodeKind::Object, None, Some(0)).unwrap();

        let mut fresh = PointsToGraph::new();
        assert_eq!(fresh.family(), None);
        fresh.union(&bound).unwrap();
        assert_eq!(fresh.family(), Some(ids.family()));
        assert_eq!(bound.clone().family(), Some(ids.family()));

        let stranger = PtgNodeIdAllocator::new();
        assert!(matches!(
            fresh.new_node(&stranger, PtgNodeKind::Object, None, Some(1)),
            Err(Error::PtgIdCollision(_))
        ));
        assert!(fresh.contains_node(a));
        assert_eq!(fresh.node_count(), 2);
    }

    #[test]
    fn test_may_alias() {
        let ids = PtgNodeIdAllocator::new();
        let mut ptg = PointsToGraph::new();
        let a = ptg.new_node(&ids, PtgNodeKind::Object, None, Some(0)).unwrap();
        let b = ptg.new_node(&ids, PtgNodeKind::Object, None, Some(1)).unwrap();
        let u = ptg.new_node(&ids, PtgNodeKind::Unknown, None, None).unwrap();
        let [x, y, z, p, n] = ["x", "y", "z", "p", "n"].map(Variable::local);

        ptg.points_to(&x, a).unwrap();
        ptg.points_to(&y, a).unwrap();
        ptg.points_to(&y, b).unwrap();
        ptg.points_to(&z, b).unwrap();
        ptg.points_to(&p, u).unwrap();
        ptg.points_to(&n, PtgNodeId::NULL).unwrap();

        assert!(ptg.may_alias(&x, &y));
        assert!(!ptg.may_alias(&x, &z));
        assert!(ptg.may_alias(&p, &z));
        assert!(!ptg.may_alias(&n, &n));
    }

    #[test]
    fn test_reachable_nodes() {
        let ids = PtgNodeIdAllocator::new();
        let mut ptg = PointsToGraph::new();
        let a = ptg.new_node(&ids, PtgNodeKind::Object, None, Some(0)).unwrap();
        let b = ptg.new_node(&ids, PtgNodeKind::Object, None, Some(1)).unwrap();
        let c = ptg.new_node(&ids, PtgNodeKind::Object, None, Some(2)).unwrap();
        ptg.points_to(&Variable::local("x"), a).unwrap();
        ptg.points_to_field(a, &field("next"), b).unwrap();
        ptg.points_to_field(b, &field("next"), a).unwrap();

        let reached = ptg.reachable_nodes([&Variable::local("x")]);
        assert_eq!(reached, BTreeSet::from([a, b]));
        assert!(!reached.contains(&c));
    }
}
