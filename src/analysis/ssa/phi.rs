//! Phi nodes.
//!
//! A phi node `v3 = phi(v1 from n2, v2 from n4)` takes the value of `v1` when control
//! arrives from `n2` and the value of `v2` when it arrives from `n4`. Phi nodes sit at
//! the top of a block and are evaluated before its first instruction.

use std::fmt;

use crate::{analysis::ssa::SsaVarId, body::Variable, utils::graph::NodeId};

/// The value a phi node takes when control arrives from `predecessor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhiOperand {
    value: SsaVarId,
    predecessor: NodeId,
}

impl PhiOperand {
    /// Creates an operand.
    #[must_use]
    pub const fn new(value: SsaVarId, predecessor: NodeId) -> Self {
        PhiOperand { value, predecessor }
    }

    /// Returns the incoming variable.
    #[must_use]
    pub const fn value(&self) -> SsaVarId {
        self.value
    }

    /// Returns the predecessor block the value flows from.
    #[must_use]
    pub const fn predecessor(&self) -> NodeId {
        self.predecessor
    }
}

impl fmt::Display for PhiOperand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} from {}", self.value, self.predecessor)
    }
}

/// Merge of the versions of one body variable at a control flow join.
///
/// Once construction is done a phi node has exactly one operand per predecessor of
/// its block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhiNode {
    result: SsaVarId,
    origin: Variable,
    operands: Vec<PhiOperand>,
}

impl PhiNode {
    /// Creates a phi node without operands.
    #[must_use]
    pub fn new(result: SsaVarId, origin: Variable) -> Self {
        PhiNode {
            result,
            origin,
            operands: Vec::new(),
        }
    }

    /// Returns the variable this phi node defines.
    #[must_use]
    pub const fn result(&self) -> SsaVarId {
        self.result
    }

    /// Returns the body variable being merged.
    #[must_use]
    pub fn origin(&self) -> &Variable {
        &self.origin
    }

    /// Returns the operands in the order their predecessors were renamed.
    #[must_use]
    pub fn operands(&self) -> &[PhiOperand] {
        &self.operands
    }

    /// Returns the value flowing in from `predecessor`.
    #[must_use]
    pub fn operand_from(&self, predecessor: NodeId) -> Option<SsaVarId> {
        self.operands
            .iter()
            .find(|operand| operand.predecessor == predecessor)
            .map(PhiOperand::value)
    }

    /// Returns `true` if every operand carries the same value, which makes the phi
    /// node a plain copy of it.
    #[must_use]
    pub fn is_trivial(&self) -> bool {
        self.operands
            .split_first()
            .is_some_and(|(first, rest)| rest.iter().all(|op| op.value == first.value))
    }

    /// Adds an operand.
    pub fn add_operand(&mut self, operand: PhiOperand) {
        self.operands.push(operand);
    }
}

impl fmt::Display for PhiNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = phi(", self.result)?;
        for (i, operand) in self.operands.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{operand}")?;
        }
        write!(f, ")")
    }
}
