use std::collections::{btree_map, BTreeMap};

use crate::model::{MethodDefinition, MethodRef, TypeDefinition};

/// Every type definition known to an analysis, keyed by full name.
///
/// Iteration is in name order, which keeps hierarchy and call graph construction
/// deterministic.
#[derive(Debug, Clone, Default)]
pub struct TypeUniverse {
    types: BTreeMap<String, TypeDefinition>,
}

impl TypeUniverse {
    /// Creates an empty universe.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a type, replacing a previous definition with the same name.
    pub fn add(&mut self, definition: TypeDefinition) -> Option<TypeDefinition> {
        self.types.insert(definition.name.clone(), definition)
    }

    /// Looks up a type by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&TypeDefinition> {
        self.types.get(name)
    }

    /// Looks up a method definition by exact reference.
    #[must_use]
    pub fn method(&self, method: &MethodRef) -> Option<&MethodDefinition> {
        self.get(&method.declaring_type)?.find_method(method)
    }

    /// Iterates over all types in name order.
    pub fn types(&self) -> btree_map::Values<'_, String, TypeDefinition> {
        self.types.values()
    }

    /// Returns the number of types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns `true` if the universe holds no types.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl FromIterator<TypeDefinition> for TypeUniverse {
    fn from_iter<I: IntoIterator<Item = TypeDefinition>>(iter: I) -> Self {
        let mut universe = TypeUniverse::new();
        for definition in iter {
            universe.add(definition);
        }
        universe
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MethodModifiers;

    #[test]
    fn test_lookup_by_name_and_method() {
        let universe: TypeUniverse = [
            TypeDefinition::class("B", Some("A")),
            TypeDefinition::class("A", None).with_method(MethodDefinition::new(
                "A::Run()".into(),
                MethodModifiers::VIRTUAL,
            )),
        ]
        .into_iter()
        .collect();

        assert_eq!(universe.len(), 2);
        let names: Vec<&str> = universe.types().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
        assert!(universe.method(&"A::Run()".into()).is_some());
        assert!(universe.method(&"B::Run()".into()).is_none());
        assert!(universe.method(&"C::Run()".into()).is_none());
    }
}
