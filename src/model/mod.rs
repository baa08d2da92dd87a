//! The type universe consumed by class hierarchy and call graph analysis.
//!
//! This is the contract with the external metadata loader: every loaded type with its
//! base type, implemented interfaces and declared methods. Method bodies, where present,
//! use the [`crate::body`] model.
//!
//! # Key Components
//!
//! - [`TypeUniverse`] - All loaded types, keyed by name
//! - [`TypeDefinition`] / [`TypeKind`] - A single type
//! - [`MethodDefinition`] / [`MethodModifiers`] - A declared method
//! - [`MethodRef`] - Method identity used across all analyses

mod method;
mod types;
mod universe;

pub use method::{MethodDefinition, MethodModifiers, MethodRef};
pub use types::{TypeDefinition, TypeKind, TypeName};
pub use universe::TypeUniverse;
