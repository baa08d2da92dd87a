//! Type definitions of the loaded type universe.

use strum::Display;

use crate::model::{MethodDefinition, MethodRef};

/// Full name of a type, e.g. `System.Collections.Generic.List`1`.
pub type TypeName = String;

/// Category of a type definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum TypeKind {
    /// Reference type with an optional base class
    Class,
    /// Interface, can only be implemented
    Interface,
    /// Value type (struct or enum)
    ValueType,
}

/// A type as delivered by the external metadata loader.
#[derive(Debug, Clone)]
pub struct TypeDefinition {
    /// Full type name
    pub name: TypeName,
    /// Category of the type
    pub kind: TypeKind,
    /// Declared base type, absent for root types and interfaces
    pub base: Option<TypeName>,
    /// Directly implemented (or, for interfaces, extended) interfaces
    pub interfaces: Vec<TypeName>,
    /// Methods declared by this type
    pub methods: Vec<MethodDefinition>,
}

impl TypeDefinition {
    /// Creates a class with the given base type.
    #[must_use]
    pub fn class(name: impl Into<TypeName>, base: Option<&str>) -> Self {
        TypeDefinition {
            name: name.into(),
            kind: TypeKind::Class,
            base: base.map(str::to_string),
            interfaces: Vec::new(),
            methods: Vec::new(),
        }
    }

    /// Creates an interface.
    #[must_use]
    pub fn interface(name: impl Into<TypeName>) -> Self {
        TypeDefinition {
            name: name.into(),
            kind: TypeKind::Interface,
            base: None,
            interfaces: Vec::new(),
            methods: Vec::new(),
        }
    }

    /// Adds an implemented interface.
    #[must_use]
    pub fn implements(mut self, interface: impl Into<TypeName>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    /// Adds a method definition.
    #[must_use]
    pub fn with_method(mut self, method: MethodDefinition) -> Self {
        self.methods.push(method);
        self
    }

    /// Finds the method declared by this type that fills the same slot as `method`.
    #[must_use]
    pub fn find_method(&self, method: &MethodRef) -> Option<&MethodDefinition> {
        self.methods
            .iter()
            .find(|def| def.reference.same_slot(method))
    }

    /// Returns `true` if this type is an interface.
    #[must_use]
    pub fn is_interface(&self) -> bool {
        self.kind == TypeKind::Interface
    }
}
