//! Copy propagation.
//!
//! A forward must-analysis of `dest = source` copies. A copy is available at a point
//! if it was executed on every path reaching the point and neither of its variables
//! was redefined since. Merge points keep only the copies available on all incoming
//! paths.

use std::collections::BTreeMap;

use crate::{
    analysis::{
        dataflow::{DataFlowAnalysis, DataFlowResults, Direction},
        ControlFlowGraph,
    },
    body::{Instruction, InstructionKind, Variable},
    utils::graph::NodeId,
    Result,
};

/// Copies available at a program point: `dest -> source`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CopyFacts {
    copies: BTreeMap<Variable, Variable>,
}

impl CopyFacts {
    /// Returns the direct source of `variable`, if it currently holds a copy.
    #[must_use]
    pub fn source(&self, variable: &Variable) -> Option<&Variable> {
        self.copies.get(variable)
    }

    /// Follows copy chains from `variable` to the original value.
    #[must_use]
    pub fn resolve<'a>(&'a self, variable: &'a Variable) -> &'a Variable {
        let mut current = variable;
        // Chains cannot cycle: a copy kills every copy that mentions its destination
        while let Some(source) = self.copies.get(current) {
            current = source;
        }
        current
    }

    /// Returns the number of available copies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.copies.len()
    }

    /// Returns `true` if no copy is available.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.copies.is_empty()
    }

    fn kill(&mut self, variable: &Variable) {
        self.copies
            .retain(|dest, source| dest != variable && source != variable);
    }

    fn apply(&mut self, instruction: &Instruction) {
        if let Some(dest) = instruction.defined_variable() {
            self.kill(dest);
        }
        if let InstructionKind::Copy { dest, source } = &instruction.kind {
            if dest != source {
                self.copies.insert(dest.clone(), source.clone());
            }
        }
    }
}

/// The copy propagation analysis. Use with a
/// [`DataFlowSolver`](crate::analysis::DataFlowSolver).
#[derive(Debug, Clone, Copy, Default)]
pub struct CopyPropagation;

impl CopyPropagation {
    /// Creates the analysis.
    #[must_use]
    pub fn new() -> Self {
        CopyPropagation
    }
}

impl DataFlowAnalysis for CopyPropagation {
    type Fact = CopyFacts;
    const DIRECTION: Direction = Direction::Forward;
    const NAME: &'static str = "copy-propagation";

    fn boundary(&self, _cfg: &ControlFlowGraph) -> CopyFacts {
        CopyFacts::default()
    }

    fn initial(&self, _cfg: &ControlFlowGraph) -> CopyFacts {
        CopyFacts::default()
    }

    fn join(&self, facts: &[&CopyFacts]) -> Result<CopyFacts> {
        let Some((first, rest)) = facts.split_first() else {
            return Ok(CopyFacts::default());
        };
        let mut joined = (*first).clone();
        for other in rest {
            joined
                .copies
                .retain(|dest, source| other.copies.get(dest) == Some(source));
        }
        Ok(joined)
    }

    fn transfer(
        &mut self,
        cfg: &ControlFlowGraph,
        node: NodeId,
        input: &CopyFacts,
    ) -> Result<CopyFacts> {
        let mut output = input.clone();
        if let Some(block) = cfg.node(node) {
            for instruction in block.instructions() {
                output.apply(instruction);
            }
        }
        Ok(output)
    }
}

impl DataFlowResults<CopyPropagation> {
    /// Resolves `variable` through the copies available at the end of `node`.
    ///
    /// Returns `variable` itself if it holds no copy there.
    #[must_use]
    pub fn resolve<'a>(&'a self, node: NodeId, variable: &'a Variable) -> &'a Variable {
        match self.output(node) {
            Some(facts) => facts.resolve(variable),
            None => variable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analysis::{CfgBuilder, DataFlowSolver},
        body::{BranchKind, MethodBodyBuilder},
    };

    #[test]
    fn test_chain_resolves_to_origin() {
        let [a, b, c] = ["a", "b", "c"].map(Variable::local);
        let mut builder = MethodBodyBuilder::new("Demo::Chain()".into());
        builder
            .constant(a.clone())
            .copy(b.clone(), a.clone())
            .copy(c.clone(), b.clone())
            .ret(Some(c.clone()));
        let cfg = CfgBuilder::new().build(&builder.finish().unwrap()).unwrap();

        let results = DataFlowSolver::new(CopyPropagation::new()).solve(&cfg).unwrap();
        let block = cfg.node_at_offset(0).unwrap();
        assert_eq!(results.resolve(block, &c), &a);
        assert_eq!(results.output(block).unwrap().source(&c), Some(&b));
        assert_eq!(results.resolve(block, &a), &a);
    }

    #[test]
    fn test_redefinition_kills_copy() {
        let [a, b] = ["a", "b"].map(Variable::local);
        let mut builder = MethodBodyBuilder::new("Demo::Kill()".into());
        builder
            .copy(b.clone(), a.clone())
            .constant(a.clone())
            .ret(Some(b.clone()));
        let cfg = CfgBuilder::new().build(&builder.finish().unwrap()).unwrap();

        let results = DataFlowSolver::new(CopyPropagation).solve(&cfg).unwrap();
        let block = cfg.node_at_offset(0).unwrap();
        assert!(results.output(block).unwrap().is_empty());
        assert_eq!(results.resolve(block, &b), &b);
    }

    #[test]
    fn test_merge_keeps_common_copies() {
        let [a, b, c, x] = ["a", "b", "c", "x"].map(Variable::local);
        let mut builder = MethodBodyBuilder::new("Demo::Merge()".into());
        builder
            .copy(x.clone(), a.clone())
            .branch(BranchKind::Conditional, "other")
            .copy(b.clone(), a.clone())
            .branch(BranchKind::Unconditional, "join");
        builder.label("other").unwrap();
        builder.copy(c.clone(), a.clone());
        builder.label("join").unwrap();
        builder.ret(None);
        let cfg = CfgBuilder::new().build(&builder.finish().unwrap()).unwrap();

        let results = DataFlowSolver::new(CopyPropagation).solve(&cfg).unwrap();
        let join = cfg.node_at_offset(5).unwrap();
        let facts = results.input(join).unwrap();
        assert_eq!(facts.len(), 1);
        assert_eq!(facts.source(&x), Some(&a));
        assert_eq!(facts.source(&b), None);
        assert_eq!(facts.source(&c), None);
    }

    #[test]
    fn test_loop_invalidates_copy() {
        let [a, b] = ["a", "b"].map(Variable::local);
        let mut builder = MethodBodyBuilder::new("Demo::Loop()".into());
        builder.copy(b.clone(), a.clone());
        builder.label("head").unwrap();
        builder
            .nop()
            .basic(Some(a.clone()))
            .branch(BranchKind::Conditional, "head")
            .ret(Some(b.clone()));
        let cfg = CfgBuilder::new().build(&builder.finish().unwrap()).unwrap();

        let results = DataFlowSolver::new(CopyPropagation).solve(&cfg).unwrap();
        let head = cfg.node_at_offset(1).unwrap();
        assert!(results.input(head).unwrap().is_empty());
    }
}
