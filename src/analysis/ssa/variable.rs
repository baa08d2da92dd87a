//! SSA variables and their definition and use sites.
//!
//! Every assignment of a body variable (its *origin*) becomes a distinct
//! [`SsaVariable`] with its own version number. Version 0 is the value the origin holds
//! on entry to the method: a parameter's argument, or whatever an unassigned local
//! contains.

use std::fmt;

use crate::{body::Variable, utils::graph::NodeId};

/// Index of a variable in its [`SsaFunction`](crate::analysis::ssa::SsaFunction).
///
/// Ids are unique within one function only.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SsaVarId(usize);

impl SsaVarId {
    /// Creates an id from a raw index.
    #[must_use]
    pub const fn new(index: usize) -> Self {
        SsaVarId(index)
    }

    /// Returns the raw index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for SsaVarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SsaVarId({})", self.0)
    }
}

impl fmt::Display for SsaVarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Where an SSA variable receives its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DefSite {
    /// The value on entry to the method
    Entry,
    /// A phi node at the top of a block
    Phi(NodeId),
    /// An instruction of a block
    Instruction {
        /// Block holding the instruction
        block: NodeId,
        /// Index of the instruction within the block
        index: usize,
    },
}

impl DefSite {
    /// Returns `true` for phi node definitions.
    #[must_use]
    pub const fn is_phi(&self) -> bool {
        matches!(self, DefSite::Phi(_))
    }

    /// Returns the block the definition lives in; Entry for initial values.
    #[must_use]
    pub const fn block(&self) -> NodeId {
        match self {
            DefSite::Entry => NodeId::new(0),
            DefSite::Phi(block) | DefSite::Instruction { block, .. } => *block,
        }
    }
}

/// Where an SSA variable is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UseSite {
    /// An operand of an instruction
    Instruction {
        /// Block holding the instruction
        block: NodeId,
        /// Index of the instruction within the block
        index: usize,
    },
    /// An operand of a phi node
    PhiOperand {
        /// Block holding the phi node
        block: NodeId,
        /// Index of the phi node within the block
        phi: usize,
    },
}

/// One version of a body variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SsaVariable {
    id: SsaVarId,
    origin: Variable,
    version: u32,
    def_site: DefSite,
    uses: Vec<UseSite>,
}

impl SsaVariable {
    pub(crate) fn new(id: SsaVarId, origin: Variable, version: u32, def_site: DefSite) -> Self {
        SsaVariable {
            id,
            origin,
            version,
            def_site,
            uses: Vec::new(),
        }
    }

    /// Returns the id of this variable.
    #[must_use]
    pub const fn id(&self) -> SsaVarId {
        self.id
    }

    /// Returns the body variable this is a version of.
    #[must_use]
    pub fn origin(&self) -> &Variable {
        &self.origin
    }

    /// Returns the version number; 0 is the value on entry.
    #[must_use]
    pub const fn version(&self) -> u32 {
        self.version
    }

    /// Returns where this variable is defined.
    #[must_use]
    pub const fn def_site(&self) -> DefSite {
        self.def_site
    }

    /// Returns every place this variable is read, in renaming order.
    #[must_use]
    pub fn uses(&self) -> &[UseSite] {
        &self.uses
    }

    /// Returns `true` if nothing reads this variable.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.uses.is_empty()
    }

    pub(crate) fn add_use(&mut self, site: UseSite) {
        self.uses.push(site);
    }
}

impl fmt::Display for SsaVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.origin.name, self.version)
    }
}
