//! Method references, modifiers and definitions.

use std::fmt;

use bitflags::bitflags;

use crate::{body::MethodBody, model::TypeName};

/// Identifies a method by declaring type, name and signature.
///
/// The textual form is `Type::Name(signature)`, e.g. `System.Object::ToString()`.
/// Two references are equal when all three parts are equal, so overloads stay apart.
///
/// # Examples
///
/// ```rust
/// use flowscope::model::MethodRef;
///
/// let method = MethodRef::from("Demo.Shape::Area(int32)");
/// assert_eq!(method.declaring_type, "Demo.Shape");
/// assert_eq!(method.name, "Area");
/// assert_eq!(method.signature, "(int32)");
/// assert_eq!(method.to_string(), "Demo.Shape::Area(int32)");
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodRef {
    /// Full name of the declaring type
    pub declaring_type: TypeName,
    /// Simple method name
    pub name: String,
    /// Parameter list including parentheses, used to tell overloads apart
    pub signature: String,
}

impl MethodRef {
    /// Creates a method reference from its parts.
    #[must_use]
    pub fn new(
        declaring_type: impl Into<TypeName>,
        name: impl Into<String>,
        signature: impl Into<String>,
    ) -> Self {
        MethodRef {
            declaring_type: declaring_type.into(),
            name: name.into(),
            signature: signature.into(),
        }
    }

    /// Returns a reference to the method with the same name and signature on another type.
    #[must_use]
    pub fn on_type(&self, declaring_type: impl Into<TypeName>) -> Self {
        MethodRef {
            declaring_type: declaring_type.into(),
            name: self.name.clone(),
            signature: self.signature.clone(),
        }
    }

    /// Returns `true` if `other` has the same name and signature, ignoring the declaring type.
    #[must_use]
    pub fn same_slot(&self, other: &MethodRef) -> bool {
        self.name == other.name && self.signature == other.signature
    }
}

impl From<&str> for MethodRef {
    fn from(text: &str) -> Self {
        let (head, signature) = match text.find('(') {
            Some(open) => text.split_at(open),
            None => (text, ""),
        };
        let (declaring_type, name) = match head.rfind("::") {
            Some(sep) => (&head[..sep], &head[sep + 2..]),
            None => ("", head),
        };
        MethodRef::new(declaring_type, name, signature)
    }
}

impl fmt::Display for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.declaring_type.is_empty() {
            write!(f, "{}{}", self.name, self.signature)
        } else {
            write!(f, "{}::{}{}", self.declaring_type, self.name, self.signature)
        }
    }
}

impl fmt::Debug for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MethodRef({self})")
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    /// Method modifiers relevant for dispatch resolution
    pub struct MethodModifiers: u32 {
        /// Defined on type, else per instance
        const STATIC = 0x0010;
        /// Method cannot be overridden
        const FINAL = 0x0020;
        /// Method is virtual
        const VIRTUAL = 0x0040;
        /// Method does not provide an implementation
        const ABSTRACT = 0x0400;
    }
}

/// A method declared by a [`TypeDefinition`](crate::model::TypeDefinition).
#[derive(Debug, Clone)]
pub struct MethodDefinition {
    /// The method's identity
    pub reference: MethodRef,
    /// Dispatch-relevant modifiers
    pub modifiers: MethodModifiers,
    /// The body, absent for abstract, native and external methods
    pub body: Option<MethodBody>,
}

impl MethodDefinition {
    /// Creates a definition without a body.
    #[must_use]
    pub fn new(reference: MethodRef, modifiers: MethodModifiers) -> Self {
        MethodDefinition {
            reference,
            modifiers,
            body: None,
        }
    }

    /// Attaches a body to this definition.
    #[must_use]
    pub fn with_body(mut self, body: MethodBody) -> Self {
        self.body = Some(body);
        self
    }

    /// Returns `true` if the method is abstract and therefore never a dispatch target.
    #[must_use]
    pub fn is_abstract(&self) -> bool {
        self.modifiers.contains(MethodModifiers::ABSTRACT)
    }

    /// Returns `true` if calls to this method may be dispatched to overrides.
    #[must_use]
    pub fn is_virtual(&self) -> bool {
        self.modifiers.contains(MethodModifiers::VIRTUAL)
            && !self.modifiers.contains(MethodModifiers::STATIC)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_method_ref() {
        let method = MethodRef::from("Ns.Outer/Inner::Run(string, int32)");
        assert_eq!(method.declaring_type, "Ns.Outer/Inner");
        assert_eq!(method.name, "Run");
        assert_eq!(method.signature, "(string, int32)");
    }

    #[test]
    fn test_parse_without_type_or_signature() {
        let method = MethodRef::from("Main");
        assert_eq!(method.declaring_type, "");
        assert_eq!(method.name, "Main");
        assert_eq!(method.signature, "");
        assert_eq!(method.to_string(), "Main");
    }

    #[test]
    fn test_same_slot_ignores_declaring_type() {
        let base = MethodRef::from("A::Area()");
        let derived = base.on_type("B");
        assert_ne!(base, derived);
        assert!(base.same_slot(&derived));
        assert!(!base.same_slot(&MethodRef::from("A::Area(int32)")));
    }

    #[test]
    fn test_modifiers() {
        let def = MethodDefinition::new(
            "A::M()".into(),
            MethodModifiers::VIRTUAL | MethodModifiers::ABSTRACT,
        );
        assert!(def.is_virtual());
        assert!(def.is_abstract());

        let def = MethodDefinition::new("A::S()".into(), MethodModifiers::STATIC);
        assert!(!def.is_virtual());
    }
}
