//! Type inference.
//!
//! A forward may-analysis that tracks, for every variable, the most precise type its
//! value is known to have. Allocations give exact types, copies carry their source's
//! type and declared variable types fill in everything else. At merge points the
//! incoming types are widened to their least common supertype in the
//! [`ClassHierarchy`].
//!
//! A variable missing from a fact has not been assigned a type yet. It is refined by
//! whatever the other paths know, the same way an undefined value would be.

use std::{collections::BTreeMap, fmt};

use crate::{
    analysis::{
        dataflow::{DataFlowAnalysis, DataFlowResults, Direction},
        ClassHierarchy, ControlFlowGraph,
    },
    body::{Instruction, InstructionKind, MethodBody, Variable},
    model::TypeName,
    utils::graph::NodeId,
    Result,
};

/// The type inferred for one variable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InferredType {
    /// Only `null` reaches the variable. Merges into any named type.
    Null,
    /// The value has the named type or one of its subtypes.
    Known(TypeName),
    /// Paths disagree and the types share no supertype.
    Varying,
}

impl InferredType {
    /// Returns the named type, if one is known.
    #[must_use]
    pub fn type_name(&self) -> Option<&str> {
        match self {
            InferredType::Known(name) => Some(name),
            InferredType::Null | InferredType::Varying => None,
        }
    }

    /// Merges two types at a control flow join.
    #[must_use]
    pub fn merge(&self, other: &InferredType, hierarchy: &ClassHierarchy) -> InferredType {
        match (self, other) {
            (a, b) if a == b => a.clone(),
            (InferredType::Null, InferredType::Known(name))
            | (InferredType::Known(name), InferredType::Null) => {
                InferredType::Known(name.clone())
            }
            (InferredType::Known(a), InferredType::Known(b)) => {
                match common_supertype(hierarchy, a, b) {
                    Some(common) => InferredType::Known(common),
                    None => InferredType::Varying,
                }
            }
            _ => InferredType::Varying,
        }
    }
}

impl fmt::Display for InferredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InferredType::Null => write!(f, "null"),
            InferredType::Known(name) => write!(f, "{name}"),
            InferredType::Varying => write!(f, "varying"),
        }
    }
}

/// Returns the least common supertype of `a` and `b`.
///
/// Among the shared supertypes (each type counts as its own) the ones with no shared
/// subtype are minimal. A minimal class wins over minimal interfaces; several minimal
/// interfaces and no class give `None`.
fn common_supertype(hierarchy: &ClassHierarchy, a: &str, b: &str) -> Option<TypeName> {
    if hierarchy.is_subtype(a, b) {
        return Some(b.to_string());
    }
    if hierarchy.is_subtype(b, a) {
        return Some(a.to_string());
    }

    let of_b = hierarchy.supertypes(b);
    let shared: Vec<TypeName> = hierarchy
        .supertypes(a)
        .into_iter()
        .filter(|ty| of_b.contains(ty))
        .collect();

    let minimal: Vec<&TypeName> = shared
        .iter()
        .filter(|ty| {
            !shared
                .iter()
                .any(|other| other != *ty && hierarchy.is_subtype(other, ty))
        })
        .collect();

    match minimal
        .iter()
        .find(|ty| !hierarchy.is_interface(ty.as_str()))
    {
        Some(class) => Some((*class).clone()),
        None if minimal.len() == 1 => Some(minimal[0].clone()),
        None => None,
    }
}

/// Types known at a program point: `variable -> type`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeFacts {
    types: BTreeMap<Variable, InferredType>,
}

impl TypeFacts {
    /// Returns the type inferred for `variable`.
    #[must_use]
    pub fn get(&self, variable: &Variable) -> Option<&InferredType> {
        self.types.get(variable)
    }

    /// Returns the named type of `variable`, if one is known.
    #[must_use]
    pub fn type_name(&self, variable: &Variable) -> Option<&str> {
        self.types.get(variable)?.type_name()
    }

    /// Iterates over every typed variable in order.
    pub fn iter(&self) -> impl Iterator<Item = (&Variable, &InferredType)> + '_ {
        self.types.iter()
    }

    /// Returns the number of typed variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns `true` if no variable has a type.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    fn assign(&mut self, variable: &Variable, ty: Option<InferredType>) {
        match ty {
            Some(ty) => {
                self.types.insert(variable.clone(), ty);
            }
            None => {
                self.types.remove(variable);
            }
        }
    }

    fn apply(&mut self, instruction: &Instruction) {
        let Some(dest) = instruction.defined_variable() else {
            return;
        };
        let declared = dest.ty.clone().map(InferredType::Known);

        let ty = match &instruction.kind {
            InstructionKind::LoadNull { .. } => Some(InferredType::Null),
            InstructionKind::CreateObject { object_type, .. } => {
                Some(InferredType::Known(object_type.clone()))
            }
            InstructionKind::CreateArray { element_type, .. } => {
                Some(InferredType::Known(format!("{element_type}[]")))
            }
            InstructionKind::Copy { source, .. } => self
                .types
                .get(source)
                .cloned()
                .or_else(|| source.ty.clone().map(InferredType::Known))
                .or(declared),
            _ => declared,
        };
        self.assign(dest, ty);
    }
}

/// The type inference analysis. Use with a
/// [`DataFlowSolver`](crate::analysis::DataFlowSolver).
///
/// # Examples
///
/// ```rust
/// use flowscope::analysis::{CfgBuilder, ClassHierarchy, DataFlowSolver, TypeInference};
/// use flowscope::body::{BranchKind, MethodBodyBuilder, Variable};
/// use flowscope::model::{TypeDefinition, TypeUniverse};
///
/// let universe: TypeUniverse = [
///     TypeDefinition::class("Shape", None),
///     TypeDefinition::class("Circle", Some("Shape")),
///     TypeDefinition::class("Square", Some("Shape")),
/// ]
/// .into_iter()
/// .collect();
/// let hierarchy = ClassHierarchy::from_universe(&universe);
///
/// let shape = Variable::local("shape");
/// let mut builder = MethodBodyBuilder::new("Demo::Pick()".into());
/// builder
///     .branch(BranchKind::Conditional, "square")
///     .new_object(shape.clone(), "Circle")
///     .branch(BranchKind::Unconditional, "done");
/// builder.label("square")?;
/// builder.new_object(shape.clone(), "Square");
/// builder.label("done")?;
/// builder.ret(Some(shape.clone()));
/// let body = builder.finish()?;
///
/// let cfg = CfgBuilder::new().build(&body)?;
/// let results = DataFlowSolver::new(TypeInference::new(&hierarchy, &body)).solve(&cfg)?;
/// assert_eq!(results.type_at_exit(&shape), Some("Shape"));
/// # Ok::<(), flowscope::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct TypeInference<'h> {
    hierarchy: &'h ClassHierarchy,
    entry: TypeFacts,
}

impl<'h> TypeInference<'h> {
    /// Prepares the inference of `body`. Parameters with a declared type start out
    /// with that type.
    #[must_use]
    pub fn new(hierarchy: &'h ClassHierarchy, body: &MethodBody) -> Self {
        let mut entry = TypeFacts::default();
        for parameter in &body.parameters {
            let declared = parameter.ty.clone().map(InferredType::Known);
            entry.assign(parameter, declared);
        }
        TypeInference { hierarchy, entry }
    }

    /// Returns the hierarchy types are merged through.
    #[must_use]
    pub fn hierarchy(&self) -> &'h ClassHierarchy {
        self.hierarchy
    }
}

impl DataFlowAnalysis for TypeInference<'_> {
    type Fact = TypeFacts;
    const DIRECTION: Direction = Direction::Forward;
    const NAME: &'static str = "type-inference";

    fn boundary(&self, _cfg: &ControlFlowGraph) -> TypeFacts {
        self.entry.clone()
    }

    fn initial(&self, _cfg: &ControlFlowGraph) -> TypeFacts {
        TypeFacts::default()
    }

    fn join(&self, facts: &[&TypeFacts]) -> Result<TypeFacts> {
        let Some((first, rest)) = facts.split_first() else {
            return Ok(TypeFacts::default());
        };
        let mut joined = (*first).clone();
        for other in rest {
            for (variable, ty) in &other.types {
                let merged = match joined.types.get(variable) {
                    Some(existing) => existing.merge(ty, self.hierarchy),
                    None => ty.clone(),
                };
                joined.types.insert(variable.clone(), merged);
            }
        }
        Ok(joined)
    }

    fn transfer(
        &mut self,
        cfg: &ControlFlowGraph,
        node: NodeId,
        input: &TypeFacts,
    ) -> Result<TypeFacts> {
        let mut output = input.clone();
        if let Some(block) = cfg.node(node) {
            for instruction in block.instructions() {
                output.apply(instruction);
            }
        }
        Ok(output)
    }
}

impl DataFlowResults<TypeInference<'_>> {
    /// Returns the facts reaching Exit.
    #[must_use]
    pub fn types_at_exit(&self) -> Option<&TypeFacts> {
        self.input(ControlFlowGraph::EXIT)
    }

    /// Returns the named type of `variable` on reaching Exit, if one is known.
    #[must_use]
    pub fn type_at_exit(&self, variable: &Variable) -> Option<&str> {
        self.types_at_exit()?.type_name(variable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analysis::{CfgBuilder, DataFlowSolver},
        body::{BranchKind, Dispatch, MethodBodyBuilder},
        test::shapes_universe,
    };

    fn shapes() -> ClassHierarchy {
        ClassHierarchy::from_universe(&shapes_universe())
    }

    fn solve<'h>(
        hierarchy: &'h ClassHierarchy,
        body: &MethodBody,
    ) -> DataFlowResults<TypeInference<'h>> {
        let cfg = CfgBuilder::new().build(body).unwrap();
        DataFlowSolver::new(TypeInference::new(hierarchy, body))
            .solve(&cfg)
            .unwrap()
    }

    fn diamond(left: &str, right: &str, x: &Variable) -> MethodBody {
        let mut builder = MethodBodyBuilder::new("Demo::Diamond()".into());
        builder
            .branch(BranchKind::Conditional, "right")
            .new_object(x.clone(), left)
            .branch(BranchKind::Unconditional, "join");
        builder.label("right").unwrap();
        builder.new_object(x.clone(), right);
        builder.label("join").unwrap();
        builder.ret(Some(x.clone()));
        builder.finish().unwrap()
    }

    #[test]
    fn test_common_supertype() {
        let hierarchy = shapes();
        let lcs = |a, b| common_supertype(&hierarchy, a, b);
        assert_eq!(lcs("Circle", "Circle").as_deref(), Some("Circle"));
        assert_eq!(lcs("UnitSquare", "Square").as_deref(), Some("Square"));
        assert_eq!(lcs("Circle", "UnitSquare").as_deref(), Some("Shape"));
        assert_eq!(lcs("Circle", "Program").as_deref(), Some("System.Object"));
        assert_eq!(lcs("Circle", "IShape").as_deref(), Some("IShape"));
        assert_eq!(lcs("Circle", "int"), None);
    }

    #[test]
    fn test_merge_rules() {
        let hierarchy = shapes();
        let circle = InferredType::Known("Circle".into());
        let square = InferredType::Known("Square".into());

        assert_eq!(InferredType::Null.merge(&circle, &hierarchy), circle);
        assert_eq!(circle.merge(&InferredType::Null, &hierarchy), circle);
        assert_eq!(
            circle.merge(&square, &hierarchy),
            InferredType::Known("Shape".into())
        );
        assert_eq!(
            circle.merge(&InferredType::Known("int".into()), &hierarchy),
            InferredType::Varying
        );
        assert_eq!(InferredType::Varying.merge(&circle, &hierarchy), InferredType::Varying);
        assert_eq!(circle.to_string(), "Circle");
        assert_eq!(InferredType::Null.to_string(), "null");
    }

    #[test]
    fn test_allocation_and_copy() {
        let hierarchy = shapes();
        let [a, b, items] = ["a", "b", "items"].map(Variable::local);
        let mut builder = MethodBodyBuilder::new("Demo::Copy()".into());
        builder
            .new_object(a.clone(), "Circle")
            .copy(b.clone(), a.clone())
            .new_array(items.clone(), "Shape")
            .ret(None);
        let results = solve(&hierarchy, &builder.finish().unwrap());

        assert_eq!(results.type_at_exit(&a), Some("Circle"));
        assert_eq!(results.type_at_exit(&b), Some("Circle"));
        assert_eq!(results.type_at_exit(&items), Some("Shape[]"));
    }

    #[test]
    fn test_join_widens_to_common_supertype() {
        let hierarchy = shapes();
        let x = Variable::local("x");

        let results = solve(&hierarchy, &diamond("Circle", "Square", &x));
        assert_eq!(results.type_at_exit(&x), Some("Shape"));

        let results = solve(&hierarchy, &diamond("Circle", "Program", &x));
        assert_eq!(results.type_at_exit(&x), Some("System.Object"));
    }

    #[test]
    fn test_unrelated_types_vary() {
        let hierarchy = shapes();
        let x = Variable::local("x");
        let results = solve(&hierarchy, &diamond("Circle", "Unrelated", &x));
        let facts = results.types_at_exit().unwrap();
        assert_eq!(facts.get(&x), Some(&InferredType::Varying));
        assert_eq!(facts.type_name(&x), None);
    }

    #[test]
    fn test_null_on_one_path() {
        let hierarchy = shapes();
        let x = Variable::local("x");
        let mut builder = MethodBodyBuilder::new("Demo::Maybe()".into());
        builder
            .null(x.clone())
            .branch(BranchKind::Conditional, "done")
            .new_object(x.clone(), "Circle");
        builder.label("done").unwrap();
        builder.ret(Some(x.clone()));

        let results = solve(&hierarchy, &builder.finish().unwrap());
        assert_eq!(results.type_at_exit(&x), Some("Circle"));
    }

    #[test]
    fn test_declared_types_seed_parameters_and_untyped_definitions() {
        let hierarchy = shapes();
        let shape = Variable::parameter("shape").typed("IShape");
        let area = Variable::local("area").typed("float64");
        let untyped = Variable::local("untyped");
        let mut builder = MethodBodyBuilder::new("Demo::Area(IShape)".into());
        builder
            .parameter(shape.clone())
            .call(
                Some(area.clone()),
                "IShape::Area()".into(),
                vec![shape.clone()],
                Dispatch::Virtual,
            )
            .basic(Some(untyped.clone()))
            .ret(Some(area.clone()));

        let results = solve(&hierarchy, &builder.finish().unwrap());
        let facts = results.types_at_exit().unwrap();
        assert_eq!(facts.type_name(&shape), Some("IShape"));
        assert_eq!(facts.type_name(&area), Some("float64"));
        assert_eq!(facts.get(&untyped), None);
        assert_eq!(facts.len(), 2);
    }

    #[test]
    fn test_redefinition_replaces_type() {
        let hierarchy = shapes();
        let x = Variable::local("x");
        let mut builder = MethodBodyBuilder::new("Demo::Redefine()".into());
        builder
            .new_object(x.clone(), "Circle")
            .basic(Some(x.clone()))
            .ret(None);

        let results = solve(&hierarchy, &builder.finish().unwrap());
        assert!(results.types_at_exit().unwrap().is_empty());
    }

    #[test]
    fn test_loop_reaches_fixpoint() {
        let hierarchy = shapes();
        let x = Variable::local("x");
        let mut builder = MethodBodyBuilder::new("Demo::Loop()".into());
        builder.new_object(x.clone(), "UnitSquare");
        builder.label("head").unwrap();
        builder
            .nop()
            .branch(BranchKind::Conditional, "done")
            .new_object(x.clone(), "Circle")
            .branch(BranchKind::Unconditional, "head");
        builder.label("done").unwrap();
        builder.ret(Some(x.clone()));

        let results = solve(&hierarchy, &builder.finish().unwrap());
        assert_eq!(results.type_at_exit(&x), Some("Shape"));
    }
}
