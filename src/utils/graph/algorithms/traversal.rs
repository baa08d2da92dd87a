//! Depth-first orderings.
//!
//! - [`postorder`] - Depth-first postorder from a list of roots sharing one visited set
//! - [`reverse_postorder`] - The reversed postorder (useful for forward data flow)
//! - [`topological_order`] - Reverse postorder started from every zero-predecessor node
//!
//! All traversals are iterative, so deep graphs cannot overflow the call stack.
//! Visited-marking happens before a node's successors are expanded, which makes the
//! traversals tolerant of cycles.

use crate::utils::graph::{NodeId, Predecessors, Successors};

#[derive(Clone, Copy)]
enum Visit {
    Enter,
    Leave,
}

/// Computes a depth-first postorder starting from each root in turn.
///
/// Roots already visited by an earlier root are skipped. Out-of-range roots are
/// ignored. Successors are explored in the order the graph yields them.
///
/// # Examples
///
/// ```rust,ignore
/// use flowscope::utils::graph::{algorithms::postorder, DirectedGraph};
///
/// let mut graph: DirectedGraph<(), ()> = DirectedGraph::new();
/// let a = graph.add_node(());
/// let b = graph.add_node(());
/// graph.add_edge(a, b, ())?;
///
/// assert_eq!(postorder(&graph, [a]), vec![b, a]);
/// ```
pub fn postorder<G, I>(graph: &G, roots: I) -> Vec<NodeId>
where
    G: Successors,
    I: IntoIterator<Item = NodeId>,
{
    let node_count = graph.node_count();
    let mut visited = vec![false; node_count];
    let mut result = Vec::with_capacity(node_count);

    for root in roots {
        visit_from(graph, root, &mut visited, &mut result);
    }

    result
}

/// Computes the reverse of [`postorder`].
pub fn reverse_postorder<G, I>(graph: &G, roots: I) -> Vec<NodeId>
where
    G: Successors,
    I: IntoIterator<Item = NodeId>,
{
    let mut order = postorder(graph, roots);
    order.reverse();
    order
}

/// Computes a topological order covering every node of the graph.
///
/// The depth-first search starts from all nodes without predecessors (ascending id).
/// Nodes left unvisited afterwards, which only happens for cycles that cannot be
/// reached from any such node, are picked up by restarting the search from the
/// lowest unvisited id. The result is the reverse of the combined postorder: for
/// every edge that is not a back edge, the source precedes the target.
///
/// Applied to [`Reversed`](crate::utils::graph::Reversed) this yields the backward
/// order, rooted at the zero-successor nodes of the original graph.
pub fn topological_order<G>(graph: &G) -> Vec<NodeId>
where
    G: Successors + Predecessors,
{
    let node_count = graph.node_count();
    let mut visited = vec![false; node_count];
    let mut result = Vec::with_capacity(node_count);

    let roots: Vec<NodeId> = graph
        .node_ids()
        .filter(|&node| graph.predecessors(node).next().is_none())
        .collect();
    for root in roots {
        visit_from(graph, root, &mut visited, &mut result);
    }

    for index in 0..node_count {
        if !visited[index] {
            visit_from(graph, NodeId::new(index), &mut visited, &mut result);
        }
    }

    result.reverse();
    result
}

fn visit_from<G: Successors>(
    graph: &G,
    root: NodeId,
    visited: &mut [bool],
    result: &mut Vec<NodeId>,
) {
    if root.index() >= visited.len() || visited[root.index()] {
        return;
    }

    let mut stack = vec![(root, Visit::Enter)];
    while let Some((node, state)) = stack.pop() {
        match state {
            Visit::Enter => {
                if visited[node.index()] {
                    continue;
                }
                visited[node.index()] = true;
                stack.push((node, Visit::Leave));

                // Reversed so the first successor is explored first
                let successors: Vec<NodeId> = graph.successors(node).collect();
                for &succ in successors.iter().rev() {
                    if succ.index() < visited.len() && !visited[succ.index()] {
                        stack.push((succ, Visit::Enter));
                    }
                }
            }
            Visit::Leave => result.push(node),
        }
    }
}
