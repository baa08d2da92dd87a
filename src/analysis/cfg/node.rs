use strum::Display;

use crate::{body::Instruction, utils::graph::NodeId};

/// Role of a CFG node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum CfgNodeKind {
    /// The unique entry node, id 0
    Entry,
    /// The unique exit node, id 1
    Exit,
    /// A basic block of the method body
    BasicBlock,
}

/// A node of a [`ControlFlowGraph`](crate::analysis::ControlFlowGraph).
///
/// Nodes are immutable once the graph is built. Everything derived from the graph
/// structure (dominators, orderings, loops) lives in side tables of the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CfgNode {
    id: NodeId,
    kind: CfgNodeKind,
    instructions: Vec<Instruction>,
}

impl CfgNode {
    pub(crate) fn entry() -> Self {
        CfgNode {
            id: NodeId::new(0),
            kind: CfgNodeKind::Entry,
            instructions: Vec::new(),
        }
    }

    pub(crate) fn exit() -> Self {
        CfgNode {
            id: NodeId::new(1),
            kind: CfgNodeKind::Exit,
            instructions: Vec::new(),
        }
    }

    pub(crate) fn block(id: NodeId, instructions: Vec<Instruction>) -> Self {
        CfgNode {
            id,
            kind: CfgNodeKind::BasicBlock,
            instructions,
        }
    }

    /// Returns the node id.
    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Returns the node kind.
    #[must_use]
    pub fn kind(&self) -> CfgNodeKind {
        self.kind
    }

    /// Returns the instructions of the block; empty for Entry and Exit.
    #[must_use]
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Returns `true` for basic blocks.
    #[must_use]
    pub fn is_block(&self) -> bool {
        self.kind == CfgNodeKind::BasicBlock
    }

    /// Offset of the leading instruction.
    #[must_use]
    pub fn start_offset(&self) -> Option<u32> {
        self.instructions.first().map(|instr| instr.offset)
    }

    /// The last instruction of the block.
    #[must_use]
    pub fn terminator(&self) -> Option<&Instruction> {
        self.instructions.last()
    }

    /// Label of the leading instruction, or the node kind for Entry and Exit.
    #[must_use]
    pub fn label(&self) -> String {
        self.instructions
            .first()
            .map_or_else(|| self.kind.to_string(), Instruction::label)
    }
}
