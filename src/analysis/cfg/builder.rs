//! Control flow graph construction from a flat instruction list.
//!
//! Construction follows the two-pass leader method.
//!
//! 1. **Leaders.** One linear scan over the instructions marks as leaders the first
//!    instruction, every instruction following a block terminator, protected-block
//!    markers, the instructions at region boundaries, and every branch target. A leader
//!    receives its node id when it is first seen, so a branch target gets its node at
//!    the moment the branch is scanned. Ids 0 and 1 are Entry and Exit; leaders get
//!    `2, 3, …`.
//! 2. **Edges.** Blocks are walked in lexical order. Branches connect to their targets,
//!    returns and throws to Exit, and blocks that can fall through to the next block.
//!    Blocks inside a try range get an edge to the region's handler, and `endfinally`
//!    blocks continue at the targets of the `leave` instructions of their try range.
//!    Finally, the last block is connected to Exit.
//!
//! A `return` connects straight to Exit even inside a try block with a `finally`
//! handler; the handler is not interposed on that path.

use std::collections::{HashMap, HashSet};

use crate::{
    analysis::{
        cfg::{CfgEdgeKind, CfgNode, ControlFlowGraph},
        AnalysisConfig,
    },
    body::{
        label_for, BranchKind, HandlerKind, Instruction, InstructionKind, MethodBody,
        ProtectedRegion,
    },
    model::MethodRef,
    utils::graph::{DirectedGraph, NodeId},
    Result,
};

/// Builds [`ControlFlowGraph`]s from method bodies.
///
/// # Examples
///
/// ```rust
/// use flowscope::analysis::{CfgBuilder, ControlFlowGraph};
/// use flowscope::body::{BranchKind, MethodBodyBuilder};
///
/// let mut builder = MethodBodyBuilder::new("Demo::Choose()".into());
/// builder.nop().branch(BranchKind::Conditional, "other").ret(None);
/// builder.label("other")?;
/// builder.ret(None);
/// let body = builder.finish()?;
///
/// let cfg = CfgBuilder::new().build(&body)?;
/// assert_eq!(cfg.block_count(), 3);
/// assert!(cfg.has_edge(ControlFlowGraph::ENTRY, cfg.node_at_offset(0).unwrap()));
/// # Ok::<(), flowscope::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct CfgBuilder {
    config: AnalysisConfig,
}

impl CfgBuilder {
    /// Creates a builder with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder with the given configuration.
    #[must_use]
    pub fn with_config(config: AnalysisConfig) -> Self {
        CfgBuilder { config }
    }

    /// Returns the configuration used by this builder.
    #[must_use]
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Builds the control flow graph of `body`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Malformed`](crate::Error::Malformed) if a branch targets an offset
    /// that is not an instruction of the body, a protected region bound does not match
    /// an instruction, or instruction offsets are not strictly increasing.
    pub fn build(&self, body: &MethodBody) -> Result<ControlFlowGraph> {
        let graph = Construction::new(
            &body.instructions,
            &body.regions,
            Some(&body.method),
            &self.config,
        )
        .run()?;
        Ok(ControlFlowGraph::new(Some(body.method.clone()), graph))
    }

    /// Builds a control flow graph from instructions and regions that are not wrapped
    /// in a [`MethodBody`].
    ///
    /// # Errors
    ///
    /// Same as [`build`](Self::build).
    pub fn from_parts(
        &self,
        instructions: &[Instruction],
        regions: &[ProtectedRegion],
    ) -> Result<ControlFlowGraph> {
        let graph = Construction::new(instructions, regions, None, &self.config).run()?;
        Ok(ControlFlowGraph::new(None, graph))
    }
}

/// State of one graph construction.
struct Construction<'a> {
    instructions: &'a [Instruction],
    regions: &'a [ProtectedRegion],
    method: Option<&'a MethodRef>,
    config: &'a AnalysisConfig,
    /// Instruction offset -> instruction index
    index_of: HashMap<u32, usize>,
    /// Leader instruction index -> node id, in discovery order
    node_of: HashMap<usize, NodeId>,
    next_id: usize,
}

impl<'a> Construction<'a> {
    fn new(
        instructions: &'a [Instruction],
        regions: &'a [ProtectedRegion],
        method: Option<&'a MethodRef>,
        config: &'a AnalysisConfig,
    ) -> Self {
        Construction {
            instructions,
            regions,
            method,
            config,
            index_of: HashMap::with_capacity(instructions.len()),
            node_of: HashMap::new(),
            next_id: 2,
        }
    }

    fn run(mut self) -> Result<DirectedGraph<CfgNode, CfgEdgeKind>> {
        self.index_offsets()?;
        let boundaries = self.region_boundaries()?;
        self.find_leaders(&boundaries)?;

        let graph = self.connect()?;
        log::debug!(
            "built CFG for {}: {} blocks, {} edges",
            self.method_name(),
            graph.node_count() - 2,
            graph.edge_count()
        );
        Ok(graph)
    }

    fn method_name(&self) -> String {
        self.method
            .map_or_else(|| "<anonymous>".to_string(), ToString::to_string)
    }

    fn index_offsets(&mut self) -> Result<()> {
        let mut previous: Option<u32> = None;
        for (index, instr) in self.instructions.iter().enumerate() {
            if previous.is_some_and(|p| p >= instr.offset) {
                return Err(malformed_error!(
                    "{}: instruction offsets are not strictly increasing at {}",
                    self.method_name(),
                    instr.label()
                ));
            }
            previous = Some(instr.offset);
            self.index_of.insert(instr.offset, index);
        }
        Ok(())
    }

    /// Validates region bounds and returns the instruction indices they start blocks at.
    fn region_boundaries(&self) -> Result<HashSet<usize>> {
        let last_offset = self.instructions.last().map(|instr| instr.offset);
        let mut boundaries = HashSet::new();

        for region in self.regions {
            let ends = [region.try_end, region.handler_end];
            for bound in region.boundaries() {
                if let Some(&index) = self.index_of.get(&bound) {
                    boundaries.insert(index);
                } else if !(ends.contains(&bound) && last_offset.is_some_and(|last| bound > last)) {
                    return Err(malformed_error!(
                        "{}: protected region bound {} does not match any instruction",
                        self.method_name(),
                        label_for(bound)
                    ));
                }
            }
        }

        Ok(boundaries)
    }

    fn mark_leader(&mut self, index: usize) {
        if !self.node_of.contains_key(&index) {
            self.node_of.insert(index, NodeId::new(self.next_id));
            self.next_id += 1;
        }
    }

    fn find_leaders(&mut self, boundaries: &HashSet<usize>) -> Result<()> {
        let instructions = self.instructions;
        for (index, instr) in instructions.iter().enumerate() {
            let follows_terminator = index > 0 && instructions[index - 1].is_terminator();
            let is_marker = matches!(instr.kind, InstructionKind::ProtectedMarker(_));

            if index == 0 || follows_terminator || is_marker || boundaries.contains(&index) {
                self.mark_leader(index);
            }

            for &target in instr.branch_targets() {
                let target_index = self.resolve_target(instr, target)?;
                self.mark_leader(target_index);
            }
        }
        Ok(())
    }

    fn resolve_target(&self, instr: &Instruction, target: u32) -> Result<usize> {
        self.index_of.get(&target).copied().ok_or_else(|| {
            malformed_error!(
                "{}: branch at {} targets {} which is not an instruction of the method",
                self.method_name(),
                instr.label(),
                label_for(target)
            )
        })
    }

    fn target_node(&self, instr: &Instruction, target: u32) -> Result<NodeId> {
        let index = self.resolve_target(instr, target)?;
        self.node_of.get(&index).copied().ok_or_else(|| {
            malformed_error!(
                "{}: branch target {} has no block",
                self.method_name(),
                label_for(target)
            )
        })
    }

    fn connect(&self) -> Result<DirectedGraph<CfgNode, CfgEdgeKind>> {
        // (leader index, node id) in lexical order
        let mut starts: Vec<(usize, NodeId)> =
            self.node_of.iter().map(|(&index, &id)| (index, id)).collect();
        starts.sort_unstable();

        let mut blocks: Vec<(NodeId, usize, usize)> = starts
            .iter()
            .enumerate()
            .map(|(position, &(start, id))| {
                let end = starts
                    .get(position + 1)
                    .map_or(self.instructions.len(), |&(next, _)| next);
                (id, start, end)
            })
            .collect();
        blocks.sort_by_key(|&(id, _, _)| id);

        let mut graph = DirectedGraph::with_capacity(blocks.len() + 2);
        graph.add_node(CfgNode::entry());
        graph.add_node(CfgNode::exit());
        for &(id, start, end) in &blocks {
            let added = graph.add_node(CfgNode::block(id, self.instructions[start..end].to_vec()));
            debug_assert_eq!(added, id);
        }

        let Some(&(_, first_block)) = starts.first() else {
            graph.add_edge(ControlFlowGraph::ENTRY, ControlFlowGraph::EXIT, CfgEdgeKind::Entry)?;
            return Ok(graph);
        };
        graph.add_edge(ControlFlowGraph::ENTRY, first_block, CfgEdgeKind::Entry)?;

        for (position, &(start, id)) in starts.iter().enumerate() {
            let end = starts
                .get(position + 1)
                .map_or(self.instructions.len(), |&(next, _)| next);
            let last = &self.instructions[end - 1];
            let next_block = starts.get(position + 1).map(|&(_, next)| next);

            self.connect_terminator(&mut graph, id, last)?;

            if last.falls_through() {
                let target = next_block.unwrap_or(ControlFlowGraph::EXIT);
                graph.add_edge(id, target, CfgEdgeKind::FallThrough)?;
            }

            if self.config.exceptional_edges {
                self.connect_handlers(&mut graph, id, self.instructions[start].offset)?;
            }
        }

        if let Some(&(_, last_block)) = starts.last() {
            graph.add_edge(last_block, ControlFlowGraph::EXIT, CfgEdgeKind::FallThrough)?;
        }

        Ok(graph)
    }

    fn connect_terminator(
        &self,
        graph: &mut DirectedGraph<CfgNode, CfgEdgeKind>,
        block: NodeId,
        last: &Instruction,
    ) -> Result<()> {
        match &last.kind {
            InstructionKind::Branch { kind, target } => {
                let edge = match kind {
                    BranchKind::Unconditional => CfgEdgeKind::Unconditional,
                    BranchKind::Conditional => CfgEdgeKind::ConditionalTrue,
                    BranchKind::Leave => CfgEdgeKind::Leave,
                };
                graph.add_edge(block, self.target_node(last, *target)?, edge)?;
            }
            InstructionKind::Switch { targets } => {
                for (case, &target) in targets.iter().enumerate() {
                    let node = self.target_node(last, target)?;
                    graph.add_edge(block, node, CfgEdgeKind::Switch { case })?;
                }
            }
            InstructionKind::Return { .. } => {
                graph.add_edge(block, ControlFlowGraph::EXIT, CfgEdgeKind::Return)?;
            }
            InstructionKind::Throw { .. } | InstructionKind::Rethrow => {
                graph.add_edge(block, ControlFlowGraph::EXIT, CfgEdgeKind::Throw)?;
            }
            InstructionKind::EndFinally => {
                let continuations = if self.config.finally_edges {
                    self.finally_continuations(last)?
                } else {
                    Vec::new()
                };
                if continuations.is_empty() {
                    graph.add_edge(block, ControlFlowGraph::EXIT, CfgEdgeKind::EndFinally)?;
                }
                for target in continuations {
                    graph.add_edge(block, target, CfgEdgeKind::EndFinally)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Targets of `leave` instructions that exit the try range of the `finally` handler
    /// containing `end_finally`.
    fn finally_continuations(&self, end_finally: &Instruction) -> Result<Vec<NodeId>> {
        let mut targets = Vec::new();
        for region in self.regions {
            if region.handler != HandlerKind::Finally
                || !region.handler_contains(end_finally.offset)
            {
                continue;
            }
            for instr in self.instructions {
                if !region.try_contains(instr.offset) {
                    continue;
                }
                if let InstructionKind::Branch {
                    kind: BranchKind::Leave,
                    target,
                } = instr.kind
                {
                    if !region.try_contains(target) {
                        let node = self.target_node(instr, target)?;
                        if !targets.contains(&node) {
                            targets.push(node);
                        }
                    }
                }
            }
        }
        Ok(targets)
    }

    fn connect_handlers(
        &self,
        graph: &mut DirectedGraph<CfgNode, CfgEdgeKind>,
        block: NodeId,
        leading_offset: u32,
    ) -> Result<()> {
        for region in self.regions {
            if !region.try_contains(leading_offset) {
                continue;
            }
            for entry in region.entry_offsets() {
                let Some(node) = self
                    .index_of
                    .get(&entry)
                    .and_then(|index| self.node_of.get(index))
                else {
                    return Err(malformed_error!(
                        "{}: handler entry {} does not start a block",
                        self.method_name(),
                        label_for(entry)
                    ));
                };
                let kind = CfgEdgeKind::ExceptionHandler {
                    exception_type: region.exception_type().cloned(),
                };
                graph.add_edge(block, *node, kind)?;
            }
        }
        Ok(())
    }
}
