//! Class Hierarchy Analysis (CHA).
//!
//! The hierarchy records, for every type of a [`TypeUniverse`], the types that
//! directly extend it or implement it. Transitive subtype queries walk this index with
//! a worklist, which is what virtual dispatch resolution in the call graph builder
//! needs: every type that may be the runtime type of a receiver.
//!
//! [`ClassHierarchyAnalysis`] owns the lifecycle. It starts out unanalyzed; the first
//! [`analyze`](ClassHierarchyAnalysis::analyze) walks the universe once and keeps the
//! resulting [`ClassHierarchy`] snapshot, later calls return the same snapshot.

use std::collections::{BTreeMap, BTreeSet};

use crate::model::{TypeName, TypeUniverse};

/// Immutable subtype index of a type universe.
///
/// Types that are only referenced (e.g. a base class from another assembly) take part
/// in the index but are never reported as interfaces.
///
/// # Examples
///
/// ```rust
/// use flowscope::analysis::ClassHierarchy;
/// use flowscope::model::{TypeDefinition, TypeUniverse};
///
/// let universe: TypeUniverse = [
///     TypeDefinition::interface("IShape"),
///     TypeDefinition::class("Shape", None).implements("IShape"),
///     TypeDefinition::class("Circle", Some("Shape")),
/// ]
/// .into_iter()
/// .collect();
///
/// let hierarchy = ClassHierarchy::from_universe(&universe);
/// assert!(hierarchy.is_subtype("Circle", "IShape"));
/// assert_eq!(hierarchy.all_subtypes("IShape").len(), 2);
/// assert!(hierarchy.all_subtypes("Circle").is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassHierarchy {
    /// Type -> types directly extending or implementing it
    subtypes: BTreeMap<TypeName, BTreeSet<TypeName>>,
    /// Type -> its declared base type and interfaces
    supertypes: BTreeMap<TypeName, BTreeSet<TypeName>>,
    interfaces: BTreeSet<TypeName>,
}

impl ClassHierarchy {
    /// Builds the hierarchy of `universe`.
    #[must_use]
    pub fn from_universe(universe: &TypeUniverse) -> Self {
        let mut hierarchy = ClassHierarchy::default();

        for definition in universe.types() {
            if definition.is_interface() {
                hierarchy.interfaces.insert(definition.name.clone());
            }
            for parent in definition.base.iter().chain(&definition.interfaces) {
                hierarchy.link(parent, &definition.name);
            }
        }

        hierarchy
    }

    fn link(&mut self, parent: &TypeName, child: &TypeName) {
        self.subtypes
            .entry(parent.clone())
            .or_default()
            .insert(child.clone());
        self.supertypes
            .entry(child.clone())
            .or_default()
            .insert(parent.clone());
    }

    /// Iterates over the types directly extending or implementing `ty`.
    pub fn direct_subtypes<'a>(&'a self, ty: &str) -> impl Iterator<Item = &'a TypeName> + 'a {
        self.subtypes.get(ty).into_iter().flatten()
    }

    /// Iterates over the declared base type and interfaces of `ty`.
    pub fn direct_supertypes<'a>(&'a self, ty: &str) -> impl Iterator<Item = &'a TypeName> + 'a {
        self.supertypes.get(ty).into_iter().flatten()
    }

    /// Returns every transitive subtype of `ty`, excluding `ty` itself.
    ///
    /// A type without known subtypes yields an empty set.
    #[must_use]
    pub fn all_subtypes(&self, ty: &str) -> BTreeSet<TypeName> {
        Self::closure(&self.subtypes, ty)
    }

    /// Returns every transitive supertype of `ty`, excluding `ty` itself.
    #[must_use]
    pub fn supertypes(&self, ty: &str) -> BTreeSet<TypeName> {
        Self::closure(&self.supertypes, ty)
    }

    fn closure(index: &BTreeMap<TypeName, BTreeSet<TypeName>>, ty: &str) -> BTreeSet<TypeName> {
        let mut found = BTreeSet::new();
        let mut worklist: Vec<&TypeName> = index.get(ty).into_iter().flatten().collect();

        while let Some(next) = worklist.pop() {
            if found.insert(next.clone()) {
                worklist.extend(index.get(next).into_iter().flatten());
            }
        }
        found.remove(ty);
        found
    }

    /// Returns `true` if `sub` is `sup` or one of its transitive subtypes.
    #[must_use]
    pub fn is_subtype(&self, sub: &str, sup: &str) -> bool {
        sub == sup || self.supertypes(sub).contains(sup)
    }

    /// Returns `true` if `ty` is an interface of the analyzed universe.
    #[must_use]
    pub fn is_interface(&self, ty: &str) -> bool {
        self.interfaces.contains(ty)
    }

    /// Returns the number of types that have at least one direct subtype.
    #[must_use]
    pub fn supertype_count(&self) -> usize {
        self.subtypes.len()
    }
}

/// Computes the [`ClassHierarchy`] of a universe at most once.
///
/// # Examples
///
/// ```rust
/// use flowscope::analysis::ClassHierarchyAnalysis;
/// use flowscope::model::{TypeDefinition, TypeUniverse};
///
/// let universe: TypeUniverse = [
///     TypeDefinition::class("A", None),
///     TypeDefinition::class("B", Some("A")),
/// ]
/// .into_iter()
/// .collect();
///
/// let mut cha = ClassHierarchyAnalysis::new(&universe);
/// assert!(!cha.is_analyzed());
/// assert!(cha.analyze().is_subtype("B", "A"));
/// assert!(cha.is_analyzed());
/// ```
#[derive(Debug)]
pub struct ClassHierarchyAnalysis<'u> {
    universe: &'u TypeUniverse,
    /// `None` while unanalyzed
    snapshot: Option<ClassHierarchy>,
}

impl<'u> ClassHierarchyAnalysis<'u> {
    /// Creates an unanalyzed analysis over `universe`.
    #[must_use]
    pub fn new(universe: &'u TypeUniverse) -> Self {
        ClassHierarchyAnalysis {
            universe,
            snapshot: None,
        }
    }

    /// Returns the universe this analysis covers.
    #[must_use]
    pub fn universe(&self) -> &'u TypeUniverse {
        self.universe
    }

    /// Returns `true` once [`analyze`](Self::analyze) has run.
    #[must_use]
    pub fn is_analyzed(&self) -> bool {
        self.snapshot.is_some()
    }

    /// Returns the hierarchy if it has been computed.
    #[must_use]
    pub fn hierarchy(&self) -> Option<&ClassHierarchy> {
        self.snapshot.as_ref()
    }

    /// Computes the hierarchy on the first call and returns the snapshot.
    pub fn analyze(&mut self) -> &ClassHierarchy {
        let universe = self.universe;
        self.snapshot.get_or_insert_with(|| {
            let hierarchy = ClassHierarchy::from_universe(universe);
            log::debug!(
                "class hierarchy: {} types, {} with subtypes, {} interfaces",
                universe.len(),
                hierarchy.supertype_count(),
                hierarchy.interfaces.len()
            );
            hierarchy
        })
    }

    /// Consumes the analysis and returns the hierarchy, computing it if needed.
    #[must_use]
    pub fn into_hierarchy(self) -> ClassHierarchy {
        let universe = self.universe;
        self.snapshot
            .unwrap_or_else(|| ClassHierarchy::from_universe(universe))
    }
}
