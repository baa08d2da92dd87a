//! SSA construction.
//!
//! Construction follows Cytron et al. in two phases:
//!
//! 1. **Phi placement**: every variable gets a phi node in each block of the iterated
//!    dominance frontier of the blocks that assign it. Entry counts as an assigning
//!    block because every variable has a value on entry.
//! 2. **Renaming**: a pre-order walk of the dominator tree keeps one stack of live
//!    versions per variable. Phi nodes and definitions push a new version, uses read
//!    the top of the stack, and each block fills in its operand of every phi node in
//!    its successors. Leaving a block pops what it pushed.
//!
//! Blocks unreachable from Entry are renamed as roots of their own, starting from the
//! entry versions.

use std::collections::BTreeMap;

use crate::{
    analysis::{
        ssa::{DefSite, PhiNode, PhiOperand, SsaFunction, SsaVarId, SsaVariable, UseSite},
        ControlFlowGraph,
    },
    body::Variable,
    utils::graph::NodeId,
};

enum Visit {
    Enter(NodeId),
    /// Origins whose stacks the block pushed to
    Leave(Vec<usize>),
}

/// Converts a [`ControlFlowGraph`] into an [`SsaFunction`].
///
/// # Examples
///
/// ```rust
/// use flowscope::analysis::{CfgBuilder, SsaBuilder};
/// use flowscope::body::{BranchKind, MethodBodyBuilder, Variable};
///
/// let x = Variable::local("x");
/// let mut builder = MethodBodyBuilder::new("Demo::Pick()".into());
/// builder
///     .branch(BranchKind::Conditional, "other")
///     .constant(x.clone())
///     .branch(BranchKind::Unconditional, "done");
/// builder.label("other")?;
/// builder.constant(x.clone());
/// builder.label("done")?;
/// builder.ret(Some(x.clone()));
///
/// let cfg = CfgBuilder::new().build(&builder.finish()?)?;
/// let ssa = SsaBuilder::build(&cfg);
///
/// let done = cfg.node_at_offset(4).unwrap();
/// let phi = ssa.block(done).and_then(|b| b.phi_for(&x)).unwrap();
/// assert_eq!(phi.operands().len(), 2);
/// assert_eq!(ssa.block(done).unwrap().instructions()[0].uses(), &[phi.result()]);
/// # Ok::<(), flowscope::Error>(())
/// ```
pub struct SsaBuilder<'a> {
    cfg: &'a ControlFlowGraph,
    function: SsaFunction,
    /// Every variable of the body, sorted
    origins: Vec<Variable>,
    index: BTreeMap<Variable, usize>,
    /// Origin -> blocks assigning it, Entry included
    def_blocks: Vec<Vec<NodeId>>,
    /// Origin -> live versions, innermost last
    stacks: Vec<Vec<SsaVarId>>,
    next_version: Vec<u32>,
}

impl<'a> SsaBuilder<'a> {
    /// Builds the SSA form of `cfg`.
    #[must_use]
    pub fn build(cfg: &'a ControlFlowGraph) -> SsaFunction {
        let mut builder = SsaBuilder {
            cfg,
            function: SsaFunction::unrenamed(cfg),
            origins: Vec::new(),
            index: BTreeMap::new(),
            def_blocks: Vec::new(),
            stacks: Vec::new(),
            next_version: Vec::new(),
        };

        builder.collect_origins();
        builder.place_phi_nodes();
        builder.rename_variables();

        log::debug!(
            "built SSA form of {}: {} variables, {} versions, {} phi nodes",
            cfg.method()
                .map_or_else(|| "<anonymous>".to_string(), ToString::to_string),
            builder.origins.len(),
            builder.function.variable_count(),
            builder.function.phi_count()
        );
        builder.function
    }

    /// Finds every variable and the blocks assigning it, then creates version 0 of
    /// each at Entry.
    fn collect_origins(&mut self) {
        let mut defs: BTreeMap<Variable, Vec<NodeId>> = BTreeMap::new();
        for node in self.cfg.node_ids() {
            let Some(block) = self.cfg.node(node) else {
                continue;
            };
            for instruction in block.instructions() {
                for used in instruction.used_variables() {
                    defs.entry(used.clone()).or_default();
                }
                if let Some(defined) = instruction.defined_variable() {
                    let blocks = defs.entry(defined.clone()).or_default();
                    if blocks.last() != Some(&node) {
                        blocks.push(node);
                    }
                }
            }
        }

        for (slot, (origin, mut blocks)) in defs.into_iter().enumerate() {
            blocks.push(ControlFlowGraph::ENTRY);
            let initial = self.new_variable(slot, &origin, DefSite::Entry);

            self.index.insert(origin.clone(), slot);
            self.origins.push(origin);
            self.def_blocks.push(blocks);
            self.stacks.push(vec![initial]);
        }
    }

    fn new_variable(&mut self, slot: usize, origin: &Variable, site: DefSite) -> SsaVarId {
        if self.next_version.len() <= slot {
            self.next_version.resize(slot + 1, 0);
        }
        let version = self.next_version[slot];
        self.next_version[slot] += 1;

        let id = SsaVarId::new(self.function.variables.len());
        self.function
            .variables
            .push(SsaVariable::new(id, origin.clone(), version, site));
        id
    }

    /// Places phi nodes at the iterated dominance frontier of each origin's
    /// assignments. Exit holds no instructions, so it never receives one.
    fn place_phi_nodes(&mut self) {
        for slot in 0..self.origins.len() {
            let frontier = self
                .cfg
                .iterated_dominance_frontier(self.def_blocks[slot].iter().copied());
            for block in frontier {
                if block == ControlFlowGraph::EXIT {
                    continue;
                }
                let origin = self.origins[slot].clone();
                let result = self.new_variable(slot, &origin, DefSite::Phi(block));
                if let Some(target) = self.function.blocks.get_mut(block.index()) {
                    target.phis.push(PhiNode::new(result, origin));
                }
            }
        }
    }

    fn rename_variables(&mut self) {
        let cfg = self.cfg;
        let roots = std::iter::once(ControlFlowGraph::ENTRY).chain(
            cfg.node_ids()
                .filter(|&node| node != ControlFlowGraph::ENTRY && cfg.idom(node).is_none()),
        );

        for root in roots {
            let mut visits = vec![Visit::Enter(root)];
            while let Some(visit) = visits.pop() {
                match visit {
                    Visit::Enter(node) => {
                        let pushed = self.rename_block(node);
                        visits.push(Visit::Leave(pushed));
                        for &child in cfg.dominator_tree_children(node).iter().rev() {
                            visits.push(Visit::Enter(child));
                        }
                    }
                    Visit::Leave(pushed) => {
                        for slot in pushed {
                            self.stacks[slot].pop();
                        }
                    }
                }
            }
        }
    }

    /// Returns the innermost live version of `origin`.
    fn current(&self, origin: &Variable) -> Option<SsaVarId> {
        let slot = *self.index.get(origin)?;
        self.stacks[slot].last().copied()
    }

    /// Renames the phi nodes and instructions of `node` and fills in its operands of
    /// the successors' phi nodes. Returns the origins it pushed a version for.
    fn rename_block(&mut self, node: NodeId) -> Vec<usize> {
        let cfg = self.cfg;
        let mut pushed = Vec::new();
        let Some(block) = self.function.blocks.get(node.index()) else {
            return pushed;
        };

        let phi_defs: Vec<(usize, SsaVarId)> = block
            .phis
            .iter()
            .filter_map(|phi| Some((*self.index.get(phi.origin())?, phi.result())))
            .collect();
        for (slot, result) in phi_defs {
            self.stacks[slot].push(result);
            pushed.push(slot);
        }

        for index in 0..self.function.blocks[node.index()].instructions.len() {
            let instruction = self.function.blocks[node.index()].instructions[index]
                .instruction()
                .clone();

            let mut uses = Vec::new();
            for used in instruction.used_variables() {
                if let Some(current) = self.current(used) {
                    self.function.variables[current.index()]
                        .add_use(UseSite::Instruction { block: node, index });
                    uses.push(current);
                }
            }

            let mut def = None;
            if let Some(defined) = instruction.defined_variable() {
                if let Some(&slot) = self.index.get(defined) {
                    let site = DefSite::Instruction { block: node, index };
                    let id = self.new_variable(slot, defined, site);
                    self.stacks[slot].push(id);
                    pushed.push(slot);
                    def = Some(id);
                }
            }

            let renamed = &mut self.function.blocks[node.index()].instructions[index];
            renamed.uses = uses;
            renamed.def = def;
        }

        for successor in cfg.successors(node) {
            let Some(target) = self.function.blocks.get(successor.index()) else {
                continue;
            };
            let incoming: Vec<Option<SsaVarId>> = target
                .phis
                .iter()
                .map(|phi| self.current(phi.origin()))
                .collect();

            for (phi, value) in incoming.into_iter().enumerate() {
                let Some(value) = value else {
                    continue;
                };
                self.function.blocks[successor.index()].phis[phi]
                    .add_operand(PhiOperand::new(value, node));
                self.function.variables[value.index()].add_use(UseSite::PhiOperand {
                    block: successor,
                    phi,
                });
            }
        }

        pushed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analysis::CfgBuilder,
        body::{BranchKind, MethodBodyBuilder},
        test::{cfg_from_edges, n},
    };

    fn build(builder: MethodBodyBuilder) -> (ControlFlowGraph, SsaFunction) {
        let cfg = CfgBuilder::new().build(&builder.finish().unwrap()).unwrap();
        let ssa = SsaBuilder::build(&cfg);
        (cfg, ssa)
    }

    /// Every phi node has exactly one operand per predecessor of its block.
    fn assert_operands_match_predecessors(cfg: &ControlFlowGraph, ssa: &SsaFunction) {
        for (block, phi) in ssa.phi_nodes() {
            let mut preds: Vec<NodeId> = cfg.predecessors(block).collect();
            let mut sources: Vec<NodeId> =
                phi.operands().iter().map(PhiOperand::predecessor).collect();
            preds.sort();
            sources.sort();
            assert_eq!(sources, preds, "{phi} in {block}");
        }
    }

    #[test]
    fn test_straight_line_has_no_phis() {
        let [a, b] = ["a", "b"].map(Variable::local);
        let mut builder = MethodBodyBuilder::new("Demo::Line()".into());
        builder
            .constant(a.clone())
            .copy(b.clone(), a.clone())
            .constant(a.clone())
            .ret(Some(a.clone()));
        let (cfg, ssa) = build(builder);

        assert_eq!(ssa.phi_count(), 0);
        // a_0, a_1, a_2, b_0, b_1
        assert_eq!(ssa.variable_count(), 5);

        let block = ssa.block(cfg.node_at_offset(0).unwrap()).unwrap();
        let [first, copy, second, ret] = block.instructions() else {
            panic!("expected four instructions");
        };
        let name = |id: SsaVarId| ssa.variable(id).unwrap().to_string();
        assert_eq!(name(first.def().unwrap()), "a_1");
        assert_eq!(copy.uses().iter().map(|&id| name(id)).collect::<Vec<_>>(), ["a_1"]);
        assert_eq!(name(copy.def().unwrap()), "b_1");
        assert_eq!(name(second.def().unwrap()), "a_2");
        assert_eq!(name(ret.uses()[0]), "a_2");
        assert!(ret.def().is_none());
    }

    #[test]
    fn test_diamond_places_one_phi_at_join() {
        let [x, y] = ["x", "y"].map(Variable::local);
        let mut builder = MethodBodyBuilder::new("Demo::Diamond()".into());
        builder
            .constant(y.clone())
            .branch(BranchKind::Conditional, "right")
            .constant(x.clone())
            .branch(BranchKind::Unconditional, "join");
        builder.label("right").unwrap();
        builder.constant(x.clone());
        builder.label("join").unwrap();
        builder.copy(y.clone(), x.clone()).ret(Some(y.clone()));
        let (cfg, ssa) = build(builder);

        let join = cfg.node_at_offset(5).unwrap();
        let left = cfg.node_at_offset(2).unwrap();
        let right = cfg.node_at_offset(4).unwrap();
        let block = ssa.block(join).unwrap();

        // y is only assigned in dominators of the join
        assert_eq!(block.phi_nodes().len(), 1);
        let phi = block.phi_for(&x).unwrap();
        assert_operands_match_predecessors(&cfg, &ssa);

        let from_left = ssa.variable(phi.operand_from(left).unwrap()).unwrap();
        let from_right = ssa.variable(phi.operand_from(right).unwrap()).unwrap();
        assert_eq!(from_left.def_site().block(), left);
        assert_eq!(from_right.def_site().block(), right);
        assert_ne!(from_left.id(), from_right.id());

        assert_eq!(block.instructions()[0].uses(), &[phi.result()]);
        assert_eq!(ssa.variable(phi.result()).unwrap().def_site(), DefSite::Phi(join));
    }

    #[test]
    fn test_loop_header_merges_entry_and_back_edge() {
        let i = Variable::local("i");
        let mut builder = MethodBodyBuilder::new("Demo::Count()".into());
        builder.constant(i.clone());
        builder.label("head").unwrap();
        builder
            .nop()
            .branch(BranchKind::Conditional, "done")
            .basic(Some(i.clone()))
            .branch(BranchKind::Unconditional, "head");
        builder.label("done").unwrap();
        builder.ret(Some(i.clone()));
        let (cfg, ssa) = build(builder);

        let head = cfg.node_at_offset(1).unwrap();
        let body = cfg.node_at_offset(3).unwrap();
        let before = cfg.node_at_offset(0).unwrap();
        let phi = ssa.block(head).unwrap().phi_for(&i).unwrap();
        assert_operands_match_predecessors(&cfg, &ssa);

        let initial = ssa.variable(phi.operand_from(before).unwrap()).unwrap();
        let incremented = ssa.variable(phi.operand_from(body).unwrap()).unwrap();
        assert_eq!(initial.def_site().block(), before);
        assert_eq!(incremented.def_site().block(), body);

        // The exit block reads the header's merged value
        let done = ssa.block(cfg.node_at_offset(5).unwrap()).unwrap();
        assert_eq!(done.instructions()[0].uses(), &[phi.result()]);
    }

    #[test]
    fn test_parameter_reads_entry_version() {
        let p = Variable::parameter("p");
        let mut builder = MethodBodyBuilder::new("Demo::Echo(object)".into());
        builder.parameter(p.clone()).ret(Some(p.clone()));
        let (cfg, ssa) = build(builder);

        let initial = ssa.initial_version(&p).unwrap();
        assert_eq!(initial.def_site(), DefSite::Entry);
        assert_eq!(initial.to_string(), "p_0");
        let ret = &ssa.block(cfg.node_at_offset(0).unwrap()).unwrap().instructions()[0];
        assert_eq!(ret.uses(), &[initial.id()]);
        assert_eq!(ssa.versions(&p).count(), 1);
        let method = ssa.method().map(ToString::to_string);
        assert_eq!(method.as_deref(), Some("Demo::Echo(object)"));
    }

    #[test]
    fn test_dead_definitions_are_reported() {
        let x = Variable::local("x");
        let mut builder = MethodBodyBuilder::new("Demo::Dead()".into());
        builder.constant(x.clone()).constant(x.clone()).ret(Some(x.clone()));
        let (_, ssa) = build(builder);

        let dead: Vec<String> = ssa.dead_variables().map(ToString::to_string).collect();
        assert_eq!(dead, ["x_0", "x_1"]);
    }

    #[test]
    fn test_unreachable_block_is_renamed() {
        let x = Variable::local("x");
        let mut builder = MethodBodyBuilder::new("Demo::Dead()".into());
        builder
            .constant(x.clone())
            .ret(Some(x.clone()))
            .copy(x.clone(), x.clone())
            .ret(Some(x.clone()));
        let (cfg, ssa) = build(builder);

        let dead = cfg.node_at_offset(2).unwrap();
        assert!(cfg.idom(dead).is_none());
        let block = ssa.block(dead).unwrap();
        let copy = &block.instructions()[0];
        let initial = ssa.initial_version(&x).unwrap();
        assert_eq!(copy.uses(), &[initial.id()]);
        assert_eq!(block.instructions()[1].uses(), &[copy.def().unwrap()]);
    }

    #[test]
    fn test_graph_without_instructions() {
        let cfg = cfg_from_edges(3, &[(0, 2), (2, 1)]);
        let ssa = SsaBuilder::build(&cfg);
        assert_eq!(ssa.variable_count(), 0);
        assert_eq!(ssa.blocks().len(), 3);
        assert_eq!(ssa.block(n(2)).unwrap().id(), n(2));
        assert!(ssa.method().is_none());
    }
}
