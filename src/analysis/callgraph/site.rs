//! Call sites and the per-method call records of a [`CallGraph`](super::CallGraph).

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
};

use crate::model::MethodRef;

/// A call instruction inside a method.
///
/// The site is identified within its caller by the instruction label (`L_XXXX`). It
/// carries the target named by the instruction and, once resolved, every method the
/// call may reach at runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    label: String,
    static_target: MethodRef,
    callees: BTreeSet<MethodRef>,
}

impl CallSite {
    /// Creates an unresolved call site.
    #[must_use]
    pub fn new(label: impl Into<String>, static_target: MethodRef) -> Self {
        CallSite {
            label: label.into(),
            static_target,
            callees: BTreeSet::new(),
        }
    }

    /// Label of the call instruction.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The method named by the call instruction.
    #[must_use]
    pub fn static_target(&self) -> &MethodRef {
        &self.static_target
    }

    /// Methods this site may invoke.
    #[must_use]
    pub fn callees(&self) -> &BTreeSet<MethodRef> {
        &self.callees
    }

    /// Returns `true` once at least one callee has been attached.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        !self.callees.is_empty()
    }

    /// Returns `true` if the site may reach more than one method.
    #[must_use]
    pub fn is_polymorphic(&self) -> bool {
        self.callees.len() > 1
    }

    pub(crate) fn attach(&mut self, callee: MethodRef) -> bool {
        self.callees.insert(callee)
    }
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.label, self.static_target)?;
        if self.is_resolved() {
            let callees: Vec<String> = self.callees.iter().map(ToString::to_string).collect();
            write!(f, " -> [{}]", callees.join(", "))?;
        }
        Ok(())
    }
}

/// Back-reference from a callee to one call site that may invoke it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallSiteRef {
    /// Method containing the call site
    pub caller: MethodRef,
    /// Label of the call instruction within `caller`
    pub label: String,
}

impl CallSiteRef {
    /// Creates a call-site reference.
    #[must_use]
    pub fn new(caller: MethodRef, label: impl Into<String>) -> Self {
        CallSiteRef {
            caller,
            label: label.into(),
        }
    }
}

impl fmt::Display for CallSiteRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.caller, self.label)
    }
}

/// Everything the call graph records about one method.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MethodCallInfo {
    pub(crate) call_sites: BTreeMap<String, CallSite>,
    pub(crate) invocations: BTreeSet<CallSiteRef>,
    pub(crate) is_root: bool,
}

impl MethodCallInfo {
    /// Call sites in the method's own code, in label order.
    pub fn call_sites(&self) -> impl Iterator<Item = &CallSite> {
        self.call_sites.values()
    }

    /// The call site with the given label.
    #[must_use]
    pub fn call_site(&self, label: &str) -> Option<&CallSite> {
        self.call_sites.get(label)
    }

    /// Call sites elsewhere that may invoke this method.
    pub fn invocations(&self) -> impl Iterator<Item = &CallSiteRef> {
        self.invocations.iter()
    }

    /// Returns `true` if the method is an analysis entry point.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.is_root
    }
}
