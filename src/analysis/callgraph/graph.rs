//! The call graph container.

use std::collections::{BTreeMap, BTreeSet};

use crate::{
    analysis::callgraph::{CallGraphBuilder, CallSite, CallSiteRef, MethodCallInfo},
    model::{MethodRef, TypeUniverse},
    Error, Result,
};

/// Maps methods to their call sites and callees to the sites that may invoke them.
///
/// The graph is filled incrementally: call sites are recorded with their static target
/// as they are discovered, and the possible callees are attached once dispatch has been
/// resolved. Attaching a callee also records the reverse edge, so [`callers`] and
/// [`invocations`] stay consistent with [`callees`] and [`call_sites`].
///
/// [`call_sites`] and [`invocations`] create an empty record for a method the graph
/// has never seen, the same first-touch policy as [`method_info_mut`]. The read-only
/// queries ([`call_site`], [`callees`], [`callers`]) return empty results instead.
///
/// [`callers`]: CallGraph::callers
/// [`invocations`]: CallGraph::invocations
/// [`callees`]: CallGraph::callees
/// [`call_sites`]: CallGraph::call_sites
/// [`call_site`]: CallGraph::call_site
/// [`method_info_mut`]: CallGraph::method_info_mut
///
/// # Examples
///
/// ```rust
/// use flowscope::analysis::CallGraph;
/// use flowscope::model::MethodRef;
///
/// let main = MethodRef::from("Program::Main()");
/// let area = MethodRef::from("IShape::Area()");
///
/// let mut graph = CallGraph::new();
/// graph.add_root(main.clone());
/// graph.add_call_site(&main, "L_0001", area.clone());
/// graph.add_callees(&main, "L_0001", ["Circle::Area()".into(), "Square::Area()".into()])?;
///
/// assert_eq!(graph.callees(&main).len(), 2);
/// assert!(graph.callers(&MethodRef::from("Circle::Area()")).contains(&main));
/// assert_eq!(graph.call_sites(&MethodRef::from("Unknown::M()")).count(), 0);
/// assert_eq!(graph.method_count(), 4);
/// # Ok::<(), flowscope::Error>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallGraph {
    methods: BTreeMap<MethodRef, MethodCallInfo>,
    roots: BTreeSet<MethodRef>,
}

impl CallGraph {
    /// Creates an empty call graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the call graph reachable from `roots` over `universe`.
    ///
    /// Shorthand for [`CallGraphBuilder::build`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::MethodNotFound`] if a root is not defined in `universe`.
    pub fn build(universe: &TypeUniverse, roots: &[MethodRef]) -> Result<Self> {
        CallGraphBuilder::new(universe).build(roots)
    }

    /// Registers `method` as an analysis entry point.
    pub fn add_root(&mut self, method: MethodRef) {
        self.method_info_mut(&method).is_root = true;
        self.roots.insert(method);
    }

    /// Records a call site of `caller` with its statically declared target.
    ///
    /// If the site already exists it is returned unchanged.
    pub fn add_call_site(
        &mut self,
        caller: &MethodRef,
        label: &str,
        static_target: MethodRef,
    ) -> &mut CallSite {
        self.method_info_mut(caller)
            .call_sites
            .entry(label.to_string())
            .or_insert_with(|| CallSite::new(label, static_target))
    }

    /// Attaches resolved callees to a call site and back-links every callee to it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GraphError`] if `caller` has no call site labelled `label`.
    pub fn add_callees<I>(&mut self, caller: &MethodRef, label: &str, callees: I) -> Result<()>
    where
        I: IntoIterator<Item = MethodRef>,
    {
        let Some(site) = self
            .methods
            .get_mut(caller)
            .and_then(|info| info.call_sites.get_mut(label))
        else {
            return Err(Error::GraphError(format!(
                "{caller} has no call site {label}"
            )));
        };

        let added: Vec<MethodRef> = callees
            .into_iter()
            .filter(|callee| site.attach(callee.clone()))
            .collect();

        for callee in added {
            self.method_info_mut(&callee)
                .invocations
                .insert(CallSiteRef::new(caller.clone(), label));
        }
        Ok(())
    }

    /// Returns the record of `method`, creating an empty one on first touch.
    pub fn method_info_mut(&mut self, method: &MethodRef) -> &mut MethodCallInfo {
        self.methods.entry(method.clone()).or_default()
    }

    /// Returns the record of `method`, if the graph has seen it.
    #[must_use]
    pub fn method_info(&self, method: &MethodRef) -> Option<&MethodCallInfo> {
        self.methods.get(method)
    }

    /// Iterates over the call sites in `method`, in label order.
    ///
    /// An unknown `method` gets an empty record.
    pub fn call_sites(&mut self, method: &MethodRef) -> impl Iterator<Item = &CallSite> + '_ {
        self.method_info_mut(method).call_sites()
    }

    /// Returns the call site of `method` labelled `label`.
    #[must_use]
    pub fn call_site(&self, method: &MethodRef, label: &str) -> Option<&CallSite> {
        self.methods.get(method)?.call_site(label)
    }

    /// Iterates over the call sites that may invoke `callee`.
    ///
    /// An unknown `callee` gets an empty record.
    pub fn invocations(&mut self, callee: &MethodRef) -> impl Iterator<Item = &CallSiteRef> + '_ {
        self.method_info_mut(callee).invocations()
    }

    /// Returns every method `method` may call.
    #[must_use]
    pub fn callees(&self, method: &MethodRef) -> BTreeSet<&MethodRef> {
        self.methods
            .get(method)
            .into_iter()
            .flat_map(MethodCallInfo::call_sites)
            .flat_map(|site| site.callees().iter())
            .collect()
    }

    /// Returns every method that may call `method`.
    #[must_use]
    pub fn callers(&self, method: &MethodRef) -> BTreeSet<&MethodRef> {
        self.methods
            .get(method)
            .into_iter()
            .flat_map(MethodCallInfo::invocations)
            .map(|site| &site.caller)
            .collect()
    }

    /// Iterates over the entry points.
    pub fn roots(&self) -> impl Iterator<Item = &MethodRef> {
        self.roots.iter()
    }

    /// Returns `true` if `method` is an entry point.
    #[must_use]
    pub fn is_root(&self, method: &MethodRef) -> bool {
        self.roots.contains(method)
    }

    /// Iterates over every method the graph knows, callers and callees alike.
    pub fn methods(&self) -> impl Iterator<Item = &MethodRef> {
        self.methods.keys()
    }

    /// Returns the number of known methods.
    #[must_use]
    pub fn method_count(&self) -> usize {
        self.methods.len()
    }

    /// Returns the number of recorded call sites.
    #[must_use]
    pub fn call_site_count(&self) -> usize {
        self.methods.values().map(|info| info.call_sites.len()).sum()
    }

    /// Returns the methods reachable from the roots through resolved call sites.
    #[must_use]
    pub fn reachable(&self) -> BTreeSet<&MethodRef> {
        let mut seen: BTreeSet<&MethodRef> = BTreeSet::new();
        let mut worklist: Vec<&MethodRef> = self.roots.iter().collect();

        while let Some(method) = worklist.pop() {
            if seen.insert(method) {
                worklist.extend(self.callees(method));
            }
        }
        seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(text: &str) -> MethodRef {
        MethodRef::from(text)
    }

    #[test]
    fn test_read_only_queries_leave_unknown_method_absent() {
        let graph = CallGraph::new();
        let ghost = m("Ghost::Run()");
        assert!(graph.callees(&ghost).is_empty());
        assert!(graph.callers(&ghost).is_empty());
        assert!(graph.call_site(&ghost, "L_0000").is_none());
        assert!(graph.method_info(&ghost).is_none());
        assert_eq!(graph.method_count(), 0);
    }

    #[test]
    fn test_site_queries_create_empty_record() {
        let mut graph = CallGraph::new();
        let (ghost, phantom) = (m("Ghost::Run()"), m("Phantom::Run()"));

        assert_eq!(graph.call_sites(&ghost).count(), 0);
        assert_eq!(graph.method_info(&ghost), Some(&MethodCallInfo::default()));
        assert_eq!(graph.invocations(&phantom).count(), 0);
        assert!(graph.method_info(&phantom).is_some());

        assert_eq!(graph.method_count(), 2);
        assert_eq!(graph.methods().collect::<Vec<_>>(), vec![&ghost, &phantom]);
        assert!(!graph.is_root(&ghost));
        assert_eq!(graph.call_site_count(), 0);
    }

    #[test]
    fn test_method_info_created_on_first_touch() {
        let mut graph = CallGraph::new();
        let method = m("A::Run()");
        assert!(!graph.method_info_mut(&method).is_root());
        assert_eq!(graph.method_count(), 1);
        assert_eq!(graph.method_info(&method), Some(&MethodCallInfo::default()));
    }

    #[test]
    fn test_add_callees_back_links() {
        let mut graph = CallGraph::new();
        let (main, helper) = (m("P::Main()"), m("P::Helper()"));
        graph.add_root(main.clone());
        graph.add_call_site(&main, "L_0000", helper.clone());
        graph.add_call_site(&main, "L_0004", helper.clone());
        graph.add_callees(&main, "L_0000", [helper.clone()]).unwrap();
        graph.add_callees(&main, "L_0004", [helper.clone()]).unwrap();

        let sites: Vec<String> = graph
            .invocations(&helper)
            .map(ToString::to_string)
            .collect();
        assert_eq!(sites, vec!["P::Main()@L_0000", "P::Main()@L_0004"]);
        assert_eq!(graph.callers(&helper).into_iter().collect::<Vec<_>>(), vec![&main]);
        assert_eq!(graph.call_site_count(), 2);
        assert!(graph.is_root(&main));
        assert!(!graph.is_root(&helper));
        assert_eq!(graph.reachable().len(), 2);
    }

    #[test]
    fn test_add_call_site_keeps_existing() {
        let mut graph = CallGraph::new();
        let main = m("P::Main()");
        graph.add_call_site(&main, "L_0000", m("A::F()"));
        let site = graph.add_call_site(&main, "L_0000", m("B::G()"));
        assert_eq!(site.static_target(), &m("A::F()"));
    }

    #[test]
    fn test_add_callees_without_site_fails() {
        let mut graph = CallGraph::new();
        let main = m("P::Main()");
        let result = graph.add_callees(&main, "L_0002", [m("A::F()")]);
        assert!(matches!(result, Err(Error::GraphError(_))));
        assert!(graph.method_info(&m("A::F()")).is_none());
    }
}
