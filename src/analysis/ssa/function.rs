//! A method body in SSA form.

use crate::{
    analysis::{
        ssa::{PhiNode, SsaVarId, SsaVariable},
        ControlFlowGraph,
    },
    body::{Instruction, Variable},
    model::MethodRef,
    utils::graph::NodeId,
};

/// An instruction together with the SSA versions it reads and writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SsaInstruction {
    instruction: Instruction,
    pub(crate) def: Option<SsaVarId>,
    pub(crate) uses: Vec<SsaVarId>,
}

impl SsaInstruction {
    /// Returns the underlying instruction.
    #[must_use]
    pub fn instruction(&self) -> &Instruction {
        &self.instruction
    }

    /// Returns the version this instruction defines.
    #[must_use]
    pub const fn def(&self) -> Option<SsaVarId> {
        self.def
    }

    /// Returns the versions read, in the order of
    /// [`Instruction::used_variables`].
    #[must_use]
    pub fn uses(&self) -> &[SsaVarId] {
        &self.uses
    }
}

/// A CFG node with its phi nodes and renamed instructions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SsaBlock {
    id: NodeId,
    pub(crate) phis: Vec<PhiNode>,
    pub(crate) instructions: Vec<SsaInstruction>,
}

impl SsaBlock {
    /// Returns the CFG node this block mirrors.
    #[must_use]
    pub const fn id(&self) -> NodeId {
        self.id
    }

    /// Returns the phi nodes, ordered by origin.
    #[must_use]
    pub fn phi_nodes(&self) -> &[PhiNode] {
        &self.phis
    }

    /// Returns the phi node merging `origin`, if the block has one.
    #[must_use]
    pub fn phi_for(&self, origin: &Variable) -> Option<&PhiNode> {
        self.phis.iter().find(|phi| phi.origin() == origin)
    }

    /// Returns the renamed instructions.
    #[must_use]
    pub fn instructions(&self) -> &[SsaInstruction] {
        &self.instructions
    }
}

/// A method body in SSA form, built by [`SsaBuilder`](crate::analysis::ssa::SsaBuilder).
///
/// Blocks are indexed by the [`NodeId`] of the CFG node they mirror, Entry and Exit
/// included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SsaFunction {
    method: Option<MethodRef>,
    pub(crate) blocks: Vec<SsaBlock>,
    pub(crate) variables: Vec<SsaVariable>,
}

impl SsaFunction {
    /// Creates a function whose blocks hold the CFG's instructions, not renamed yet.
    pub(crate) fn unrenamed(cfg: &ControlFlowGraph) -> Self {
        let blocks = cfg
            .node_ids()
            .map(|id| SsaBlock {
                id,
                phis: Vec::new(),
                instructions: cfg
                    .node(id)
                    .map(|node| {
                        node.instructions()
                            .iter()
                            .map(|instruction| SsaInstruction {
                                instruction: instruction.clone(),
                                def: None,
                                uses: Vec::new(),
                            })
                            .collect()
                    })
                    .unwrap_or_default(),
            })
            .collect();

        SsaFunction {
            method: cfg.method().cloned(),
            blocks,
            variables: Vec::new(),
        }
    }

    /// Returns the method this body belongs to, if known.
    #[must_use]
    pub fn method(&self) -> Option<&MethodRef> {
        self.method.as_ref()
    }

    /// Returns every block in node order.
    #[must_use]
    pub fn blocks(&self) -> &[SsaBlock] {
        &self.blocks
    }

    /// Returns the block mirroring `node`.
    #[must_use]
    pub fn block(&self, node: NodeId) -> Option<&SsaBlock> {
        self.blocks.get(node.index())
    }

    /// Returns every SSA variable, indexed by [`SsaVarId`].
    #[must_use]
    pub fn variables(&self) -> &[SsaVariable] {
        &self.variables
    }

    /// Returns the variable with the given id.
    #[must_use]
    pub fn variable(&self, id: SsaVarId) -> Option<&SsaVariable> {
        self.variables.get(id.index())
    }

    /// Returns the number of SSA variables.
    #[must_use]
    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }

    /// Iterates over the versions of `origin` in id order.
    pub fn versions<'a, 'b>(&'a self, origin: &'b Variable) -> impl Iterator<Item = &'a SsaVariable> + 'b
    where
        'a: 'b,
    {
        self.variables.iter().filter(move |var| var.origin() == origin)
    }

    /// Returns the value `origin` holds on entry to the method.
    #[must_use]
    pub fn initial_version(&self, origin: &Variable) -> Option<&SsaVariable> {
        self.versions(origin).find(|var| var.version() == 0)
    }

    /// Iterates over every phi node with the block it sits in.
    pub fn phi_nodes(&self) -> impl Iterator<Item = (NodeId, &PhiNode)> + '_ {
        self.blocks
            .iter()
            .flat_map(|block| block.phis.iter().map(move |phi| (block.id, phi)))
    }

    /// Returns the total number of phi nodes.
    #[must_use]
    pub fn phi_count(&self) -> usize {
        self.blocks.iter().map(|block| block.phis.len()).sum()
    }

    /// Iterates over the variables nothing reads.
    pub fn dead_variables(&self) -> impl Iterator<Item = &SsaVariable> + '_ {
        self.variables.iter().filter(|var| var.is_dead())
    }
}
