//! Instructions of the method body model.
//!
//! Instructions are produced by an upstream bytecode reader and only read by the
//! analyses. Each carries its offset and a [`InstructionKind`] telling the analyses
//! what it does with control flow and with variables.

use std::fmt;

use strum::Display;

use crate::model::{MethodRef, TypeName};

/// Role of a variable within its method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
pub enum VariableKind {
    /// A formal parameter, including `this`
    Parameter,
    /// A declared local
    Local,
    /// A stack temporary introduced by the reader
    Temporary,
}

/// A named storage location of a method.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Variable {
    /// Name, unique within its method
    pub name: String,
    /// Static type, if known
    pub ty: Option<TypeName>,
    /// Role within the method
    pub kind: VariableKind,
}

impl Variable {
    /// Creates a parameter.
    #[must_use]
    pub fn parameter(name: impl Into<String>) -> Self {
        Self::with_kind(name, VariableKind::Parameter)
    }

    /// Creates a local variable.
    #[must_use]
    pub fn local(name: impl Into<String>) -> Self {
        Self::with_kind(name, VariableKind::Local)
    }

    /// Creates a temporary.
    #[must_use]
    pub fn temporary(name: impl Into<String>) -> Self {
        Self::with_kind(name, VariableKind::Temporary)
    }

    fn with_kind(name: impl Into<String>, kind: VariableKind) -> Self {
        Variable {
            name: name.into(),
            ty: None,
            kind,
        }
    }

    /// Sets the static type.
    #[must_use]
    pub fn typed(mut self, ty: impl Into<TypeName>) -> Self {
        self.ty = Some(ty.into());
        self
    }
}

impl fmt::Debug for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.ty {
            Some(ty) => write!(f, "{}: {ty}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A field of a type. Array elements use the pseudo-field `[]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldRef {
    /// Declaring type of the field
    pub declaring_type: TypeName,
    /// Field name
    pub name: String,
}

impl FieldRef {
    /// Name of the pseudo-field standing for all elements of an array.
    pub const ELEMENTS: &'static str = "[]";

    /// Creates a field reference.
    #[must_use]
    pub fn new(declaring_type: impl Into<TypeName>, name: impl Into<String>) -> Self {
        FieldRef {
            declaring_type: declaring_type.into(),
            name: name.into(),
        }
    }

    /// Returns the pseudo-field used for array elements.
    #[must_use]
    pub fn elements() -> Self {
        FieldRef::new("", Self::ELEMENTS)
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.declaring_type.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{}::{}", self.declaring_type, self.name)
        }
    }
}

/// Flavour of a single-target branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum BranchKind {
    /// Always taken
    Unconditional,
    /// Taken depending on a condition, otherwise falls through
    Conditional,
    /// Exits a protected region, running `finally` handlers on the way
    Leave,
}

/// How a call is dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Dispatch {
    /// The declared target is the callee
    Static,
    /// The callee depends on the runtime type of the receiver
    Virtual,
}

/// Protected-block boundary markers emitted by the reader.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProtectedMarker {
    /// Start of a try block
    Try,
    /// Start of a catch handler, with the caught type if typed
    Catch(Option<TypeName>),
    /// Start of a fault handler
    Fault,
    /// Start of a filter block
    Filter,
    /// Start of a finally handler
    Finally,
}

/// What an instruction does, as far as the analyses are concerned.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InstructionKind {
    /// Any other computation, optionally defining a variable
    Basic {
        /// Defined variable
        dest: Option<Variable>,
    },
    /// No operation
    Nop,
    /// `dest = <constant>` for a non-reference constant
    LoadConstant {
        /// Defined variable
        dest: Variable,
    },
    /// `dest = null`
    LoadNull {
        /// Defined variable
        dest: Variable,
    },
    /// `dest = source`
    Copy {
        /// Defined variable
        dest: Variable,
        /// Copied variable
        source: Variable,
    },
    /// `dest = instance.field`
    LoadField {
        /// Defined variable
        dest: Variable,
        /// Object the field is read from
        instance: Variable,
        /// Field read
        field: FieldRef,
    },
    /// `instance.field = value`
    StoreField {
        /// Object the field is written to
        instance: Variable,
        /// Field written
        field: FieldRef,
        /// Stored variable
        value: Variable,
    },
    /// `dest = Type.field`
    LoadStaticField {
        /// Defined variable
        dest: Variable,
        /// Static field read
        field: FieldRef,
    },
    /// `Type.field = value`
    StoreStaticField {
        /// Static field written
        field: FieldRef,
        /// Stored variable
        value: Variable,
    },
    /// `dest = array[i]`
    LoadElement {
        /// Defined variable
        dest: Variable,
        /// Array read from
        array: Variable,
    },
    /// `array[i] = value`
    StoreElement {
        /// Array written to
        array: Variable,
        /// Stored variable
        value: Variable,
    },
    /// `dest = new T(...)`
    CreateObject {
        /// Defined variable
        dest: Variable,
        /// Allocated type
        object_type: TypeName,
        /// Invoked constructor
        constructor: MethodRef,
    },
    /// `dest = new T[n]`
    CreateArray {
        /// Defined variable
        dest: Variable,
        /// Element type
        element_type: TypeName,
    },
    /// `result = method(arguments)`; for instance methods the receiver is the first argument
    MethodCall {
        /// Variable receiving the return value
        result: Option<Variable>,
        /// Declared target
        method: MethodRef,
        /// Actual arguments
        arguments: Vec<Variable>,
        /// Dispatch flavour
        dispatch: Dispatch,
    },
    /// Transfer to a single target offset
    Branch {
        /// Branch flavour
        kind: BranchKind,
        /// Target instruction offset
        target: u32,
    },
    /// Multi-way branch; falls through when no case matches
    Switch {
        /// Case target offsets, indexed by case number
        targets: Vec<u32>,
    },
    /// Return from the method
    Return {
        /// Returned variable, if any
        value: Option<Variable>,
    },
    /// Throw an exception
    Throw {
        /// Thrown variable
        exception: Variable,
    },
    /// Rethrow the exception being handled
    Rethrow,
    /// End of a finally or fault handler
    EndFinally,
    /// Protected-block boundary marker
    ProtectedMarker(ProtectedMarker),
}

/// A single instruction of a method body.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Instruction {
    /// Offset within the method, strictly increasing along the instruction list
    pub offset: u32,
    /// What the instruction does
    pub kind: InstructionKind,
}

impl Instruction {
    /// Creates an instruction.
    #[must_use]
    pub fn new(offset: u32, kind: InstructionKind) -> Self {
        Instruction { offset, kind }
    }

    /// Returns the label of this instruction, `L_<offset:04X>`.
    #[must_use]
    pub fn label(&self) -> String {
        label_for(self.offset)
    }

    /// Returns the explicit branch targets of this instruction, in operand order.
    #[must_use]
    pub fn branch_targets(&self) -> &[u32] {
        match &self.kind {
            InstructionKind::Branch { target, .. } => std::slice::from_ref(target),
            InstructionKind::Switch { targets } => targets,
            _ => &[],
        }
    }

    /// Returns `true` if control can continue with the lexically next instruction.
    #[must_use]
    pub fn falls_through(&self) -> bool {
        !matches!(
            self.kind,
            InstructionKind::Branch {
                kind: BranchKind::Unconditional | BranchKind::Leave,
                ..
            } | InstructionKind::Return { .. }
                | InstructionKind::Throw { .. }
                | InstructionKind::Rethrow
                | InstructionKind::EndFinally
        )
    }

    /// Returns `true` if the instruction ends a basic block.
    #[must_use]
    pub fn is_terminator(&self) -> bool {
        !self.falls_through()
            || matches!(
                self.kind,
                InstructionKind::Branch { .. } | InstructionKind::Switch { .. }
            )
    }

    /// Returns the variable written by this instruction, if any.
    #[must_use]
    pub fn defined_variable(&self) -> Option<&Variable> {
        match &self.kind {
            InstructionKind::Basic { dest } => dest.as_ref(),
            InstructionKind::MethodCall { result, .. } => result.as_ref(),
            InstructionKind::LoadConstant { dest }
            | InstructionKind::LoadNull { dest }
            | InstructionKind::Copy { dest, .. }
            | InstructionKind::LoadField { dest, .. }
            | InstructionKind::LoadStaticField { dest, .. }
            | InstructionKind::LoadElement { dest, .. }
            | InstructionKind::CreateObject { dest, .. }
            | InstructionKind::CreateArray { dest, .. } => Some(dest),
            _ => None,
        }
    }

    /// Returns the variables read by this instruction.
    #[must_use]
    pub fn used_variables(&self) -> Vec<&Variable> {
        match &self.kind {
            InstructionKind::Copy { source, .. } => vec![source],
            InstructionKind::LoadField { instance, .. } => vec![instance],
            InstructionKind::StoreField {
                instance, value, ..
            } => vec![instance, value],
            InstructionKind::StoreStaticField { value, .. } => vec![value],
            InstructionKind::LoadElement { array, .. } => vec![array],
            InstructionKind::StoreElement { array, value } => vec![array, value],
            InstructionKind::MethodCall { arguments, .. } => arguments.iter().collect(),
            InstructionKind::Return { value } => value.iter().collect(),
            InstructionKind::Throw { exception } => vec![exception],
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", self.label())?;
        match &self.kind {
            InstructionKind::Basic { dest: Some(dest) } => write!(f, "{dest} = ..."),
            InstructionKind::Basic { dest: None } => f.write_str("..."),
            InstructionKind::Nop => f.write_str("nop"),
            InstructionKind::LoadConstant { dest } => write!(f, "{dest} = <const>"),
            InstructionKind::LoadNull { dest } => write!(f, "{dest} = null"),
            InstructionKind::Copy { dest, source } => write!(f, "{dest} = {source}"),
            InstructionKind::LoadField {
                dest,
                instance,
                field,
            } => write!(f, "{dest} = {instance}.{}", field.name),
            InstructionKind::StoreField {
                instance,
                field,
                value,
            } => write!(f, "{instance}.{} = {value}", field.name),
            InstructionKind::LoadStaticField { dest, field } => write!(f, "{dest} = {field}"),
            InstructionKind::StoreStaticField { field, value } => write!(f, "{field} = {value}"),
            InstructionKind::LoadElement { dest, array } => write!(f, "{dest} = {array}[]"),
            InstructionKind::StoreElement { array, value } => write!(f, "{array}[] = {value}"),
            InstructionKind::CreateObject {
                dest, object_type, ..
            } => write!(f, "{dest} = new {object_type}"),
            InstructionKind::CreateArray { dest, element_type } => {
                write!(f, "{dest} = new {element_type}[]")
            }
            InstructionKind::MethodCall {
                result,
                method,
                arguments,
                dispatch,
            } => {
                if let Some(result) = result {
                    write!(f, "{result} = ")?;
                }
                let args: Vec<&str> = arguments.iter().map(|a| a.name.as_str()).collect();
                let prefix = match dispatch {
                    Dispatch::Static => "call",
                    Dispatch::Virtual => "callvirt",
                };
                write!(f, "{prefix} {method} [{}]", args.join(", "))
            }
            InstructionKind::Branch { kind, target } => {
                let mnemonic = match kind {
                    BranchKind::Unconditional => "br",
                    BranchKind::Conditional => "brif",
                    BranchKind::Leave => "leave",
                };
                write!(f, "{mnemonic} {}", label_for(*target))
            }
            InstructionKind::Switch { targets } => {
                let labels: Vec<String> = targets.iter().map(|t| label_for(*t)).collect();
                write!(f, "switch ({})", labels.join(", "))
            }
            InstructionKind::Return { value: Some(value) } => write!(f, "ret {value}"),
            InstructionKind::Return { value: None } => f.write_str("ret"),
            InstructionKind::Throw { exception } => write!(f, "throw {exception}"),
            InstructionKind::Rethrow => f.write_str("rethrow"),
            InstructionKind::EndFinally => f.write_str("endfinally"),
            InstructionKind::ProtectedMarker(marker) => write!(f, ".{marker:?}"),
        }
    }
}

/// Formats an offset as an instruction label.
#[must_use]
pub fn label_for(offset: u32) -> String {
    format!("L_{offset:04X}")
}
