use crate::{
    body::{Instruction, ProtectedRegion, Variable},
    model::MethodRef,
};

/// The per-method input of the analyses.
///
/// Bodies are not validated on construction; inconsistencies such as unresolvable
/// branch targets surface as [`Error::Malformed`](crate::Error::Malformed) when a
/// control-flow graph is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodBody {
    /// The method this body belongs to
    pub method: MethodRef,
    /// Formal parameters, `this` first for instance methods
    pub parameters: Vec<Variable>,
    /// Declared locals
    pub locals: Vec<Variable>,
    /// Instructions in offset order
    pub instructions: Vec<Instruction>,
    /// Protected regions, innermost first
    pub regions: Vec<ProtectedRegion>,
}

impl MethodBody {
    /// Creates an empty body for `method`.
    #[must_use]
    pub fn new(method: MethodRef) -> Self {
        MethodBody {
            method,
            parameters: Vec::new(),
            locals: Vec::new(),
            instructions: Vec::new(),
            regions: Vec::new(),
        }
    }

    /// Returns `true` if the body has no instructions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Finds the instruction at `offset`.
    #[must_use]
    pub fn instruction_at(&self, offset: u32) -> Option<&Instruction> {
        self.instructions
            .binary_search_by_key(&offset, |instr| instr.offset)
            .ok()
            .map(|index| &self.instructions[index])
    }

    /// Returns the offset just past the last instruction.
    ///
    /// Region end bounds may point here. Offsets are treated as instruction indices
    /// when the reader did not assign byte offsets, so this is `last offset + 1`.
    #[must_use]
    pub fn end_offset(&self) -> u32 {
        self.instructions
            .last()
            .map_or(0, |instr| instr.offset.saturating_add(1))
    }
}
