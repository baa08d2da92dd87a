//! Fluent construction of method bodies with symbolic labels.
//!
//! Readers that already know their offsets construct [`MethodBody`] directly. The
//! builder is for everything else (tests, synthesized methods): instructions get
//! consecutive offsets, and branch targets and region bounds are given as label names
//! that are resolved when [`MethodBodyBuilder::finish`] is called.
//!
//! # Examples
//!
//! ```rust
//! use flowscope::body::{BranchKind, MethodBodyBuilder, Variable};
//!
//! let x = Variable::parameter("x");
//! let mut builder = MethodBodyBuilder::new("Demo::Abs(int32)".into());
//! builder
//!     .parameter(x.clone())
//!     .branch(BranchKind::Conditional, "negative")
//!     .ret(Some(x.clone()));
//! builder.label("negative")?;
//! builder.basic(Some(x.clone())).ret(Some(x));
//!
//! let body = builder.finish()?;
//! assert_eq!(body.instructions.len(), 4);
//! assert_eq!(body.instructions[0].branch_targets(), &[2]);
//! # Ok::<(), flowscope::Error>(())
//! ```

use std::collections::HashMap;

use crate::{
    body::{
        BranchKind, Dispatch, FieldRef, HandlerKind, Instruction, InstructionKind, MethodBody,
        ProtectedRegion, Variable,
    },
    model::{MethodRef, TypeName},
    Error, Result,
};

/// Branch or switch operand waiting for label resolution.
#[derive(Debug, Clone)]
struct LabelFixup {
    /// Index into the instruction list
    instruction: usize,
    /// Label names, one per target
    labels: Vec<String>,
}

/// Protected region given by label names.
#[derive(Debug, Clone)]
struct RegionFixup {
    try_start: String,
    try_end: String,
    filter_start: Option<String>,
    handler_start: String,
    handler_end: String,
    handler: HandlerKind,
}

/// Builds a [`MethodBody`] instruction by instruction.
///
/// Every instruction occupies one offset. A label defined after the last instruction
/// resolves to the method end, which is a valid region end bound.
#[derive(Debug)]
pub struct MethodBodyBuilder {
    body: MethodBody,
    labels: HashMap<String, u32>,
    fixups: Vec<LabelFixup>,
    regions: Vec<RegionFixup>,
}

impl MethodBodyBuilder {
    /// Starts a body for `method`.
    #[must_use]
    pub fn new(method: MethodRef) -> Self {
        MethodBodyBuilder {
            body: MethodBody::new(method),
            labels: HashMap::new(),
            fixups: Vec::new(),
            regions: Vec::new(),
        }
    }

    /// Returns the offset the next instruction will get.
    #[must_use]
    pub fn next_offset(&self) -> u32 {
        u32::try_from(self.body.instructions.len()).unwrap_or(u32::MAX)
    }

    /// Declares a parameter.
    pub fn parameter(&mut self, variable: Variable) -> &mut Self {
        self.body.parameters.push(variable);
        self
    }

    /// Declares a local.
    pub fn local(&mut self, variable: Variable) -> &mut Self {
        self.body.locals.push(variable);
        self
    }

    /// Binds `name` to the offset of the next instruction.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateLabel`] if the label is already bound.
    pub fn label(&mut self, name: &str) -> Result<&mut Self> {
        if self.labels.contains_key(name) {
            return Err(Error::DuplicateLabel(name.to_string()));
        }
        let offset = self.next_offset();
        self.labels.insert(name.to_string(), offset);
        Ok(self)
    }

    /// Appends an instruction.
    pub fn emit(&mut self, kind: InstructionKind) -> &mut Self {
        let offset = self.next_offset();
        self.body.instructions.push(Instruction::new(offset, kind));
        self
    }

    /// Appends an opaque computation.
    pub fn basic(&mut self, dest: Option<Variable>) -> &mut Self {
        self.emit(InstructionKind::Basic { dest })
    }

    /// Appends a `nop`.
    pub fn nop(&mut self) -> &mut Self {
        self.emit(InstructionKind::Nop)
    }

    /// Appends `dest = <constant>`.
    pub fn constant(&mut self, dest: Variable) -> &mut Self {
        self.emit(InstructionKind::LoadConstant { dest })
    }

    /// Appends `dest = null`.
    pub fn null(&mut self, dest: Variable) -> &mut Self {
        self.emit(InstructionKind::LoadNull { dest })
    }

    /// Appends `dest = source`.
    pub fn copy(&mut self, dest: Variable, source: Variable) -> &mut Self {
        self.emit(InstructionKind::Copy { dest, source })
    }

    /// Appends `dest = new object_type()` calling `object_type::.ctor()`.
    pub fn new_object(&mut self, dest: Variable, object_type: &str) -> &mut Self {
        let constructor = MethodRef::new(object_type, ".ctor", "()");
        self.emit(InstructionKind::CreateObject {
            dest,
            object_type: TypeName::from(object_type),
            constructor,
        })
    }

    /// Appends `dest = new element_type[n]`.
    pub fn new_array(&mut self, dest: Variable, element_type: &str) -> &mut Self {
        self.emit(InstructionKind::CreateArray {
            dest,
            element_type: TypeName::from(element_type),
        })
    }

    /// Appends `dest = instance.field`.
    pub fn load_field(&mut self, dest: Variable, instance: Variable, field: FieldRef) -> &mut Self {
        self.emit(InstructionKind::LoadField {
            dest,
            instance,
            field,
        })
    }

    /// Appends `instance.field = value`.
    pub fn store_field(
        &mut self,
        instance: Variable,
        field: FieldRef,
        value: Variable,
    ) -> &mut Self {
        self.emit(InstructionKind::StoreField {
            instance,
            field,
            value,
        })
    }

    /// Appends a call.
    pub fn call(
        &mut self,
        result: Option<Variable>,
        method: MethodRef,
        arguments: Vec<Variable>,
        dispatch: Dispatch,
    ) -> &mut Self {
        self.emit(InstructionKind::MethodCall {
            result,
            method,
            arguments,
            dispatch,
        })
    }

    /// Appends a branch to `label`.
    pub fn branch(&mut self, kind: BranchKind, label: &str) -> &mut Self {
        self.fixups.push(LabelFixup {
            instruction: self.body.instructions.len(),
            labels: vec![label.to_string()],
        });
        self.emit(InstructionKind::Branch { kind, target: 0 })
    }

    /// Appends a switch over `labels`.
    pub fn switch(&mut self, labels: &[&str]) -> &mut Self {
        self.fixups.push(LabelFixup {
            instruction: self.body.instructions.len(),
            labels: labels.iter().map(|l| (*l).to_string()).collect(),
        });
        self.emit(InstructionKind::Switch {
            targets: vec![0; labels.len()],
        })
    }

    /// Appends a return.
    pub fn ret(&mut self, value: Option<Variable>) -> &mut Self {
        self.emit(InstructionKind::Return { value })
    }

    /// Appends a throw.
    pub fn throw(&mut self, exception: Variable) -> &mut Self {
        self.emit(InstructionKind::Throw { exception })
    }

    /// Appends an `endfinally`.
    pub fn end_finally(&mut self) -> &mut Self {
        self.emit(InstructionKind::EndFinally)
    }

    /// Declares a protected region by label names.
    ///
    /// For [`HandlerKind::Filter`] use [`filter_region`](Self::filter_region) instead;
    /// the filter offset given here would be ignored.
    pub fn region(
        &mut self,
        try_range: (&str, &str),
        handler_range: (&str, &str),
        handler: HandlerKind,
    ) -> &mut Self {
        self.regions.push(RegionFixup {
            try_start: try_range.0.to_string(),
            try_end: try_range.1.to_string(),
            filter_start: None,
            handler_start: handler_range.0.to_string(),
            handler_end: handler_range.1.to_string(),
            handler,
        });
        self
    }

    /// Declares a filtered protected region by label names.
    pub fn filter_region(
        &mut self,
        try_range: (&str, &str),
        filter_start: &str,
        handler_range: (&str, &str),
    ) -> &mut Self {
        self.regions.push(RegionFixup {
            try_start: try_range.0.to_string(),
            try_end: try_range.1.to_string(),
            filter_start: Some(filter_start.to_string()),
            handler_start: handler_range.0.to_string(),
            handler_end: handler_range.1.to_string(),
            handler: HandlerKind::Filter { filter_start: 0 },
        });
        self
    }

    /// Resolves all labels and returns the body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UndefinedLabel`] if a branch, switch or region names a label
    /// that was never bound.
    pub fn finish(mut self) -> Result<MethodBody> {
        for fixup in std::mem::take(&mut self.fixups) {
            let targets = fixup
                .labels
                .iter()
                .map(|label| self.resolve(label))
                .collect::<Result<Vec<u32>>>()?;

            let Some(instruction) = self.body.instructions.get_mut(fixup.instruction) else {
                return Err(malformed_error!(
                    "Fixup refers to missing instruction {}",
                    fixup.instruction
                ));
            };
            match &mut instruction.kind {
                InstructionKind::Branch { target, .. } => *target = targets[0],
                InstructionKind::Switch { targets: slots } => *slots = targets,
                _ => {
                    return Err(malformed_error!(
                        "Fixup refers to non-branch instruction {}",
                        instruction.offset
                    ))
                }
            }
        }

        for region in std::mem::take(&mut self.regions) {
            let handler = match region.filter_start {
                Some(filter) => HandlerKind::Filter {
                    filter_start: self.resolve(&filter)?,
                },
                None => region.handler,
            };
            let resolved = ProtectedRegion::new(
                self.resolve(&region.try_start)?,
                self.resolve(&region.try_end)?,
                self.resolve(&region.handler_start)?,
                self.resolve(&region.handler_end)?,
                handler,
            );
            self.body.regions.push(resolved);
        }

        Ok(self.body)
    }

    fn resolve(&self, label: &str) -> Result<u32> {
        self.labels
            .get(label)
            .copied()
            .ok_or_else(|| Error::UndefinedLabel(label.to_string()))
    }
}
