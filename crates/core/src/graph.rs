//! Intra-repository dependency graph
//!
//! Nodes are module identities; an edge `a -> b` means `a` requires `b` and
//! both live in the repository. Cycles are allowed. Transitive closure is
//! computed with petgraph's iterative `Dfs`, which keeps its own visited set
//! per start node, so a cycle can neither loop forever nor blow the stack.

use crate::discovery::ModuleSet;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Dfs, EdgeRef};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Directed graph of requirements between located modules
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    inner: DiGraph<String, ()>,
    /// Identity to node index for O(1) lookups
    index: HashMap<String, NodeIndex>,
}

impl DependencyGraph {
    /// Create a new empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph for a module set
    ///
    /// Identities in `excluded` get no node, so no edge goes into or out of
    /// them. Requirements on modules outside the set are ignored.
    pub fn build(modules: &ModuleSet, excluded: &BTreeSet<String>) -> Self {
        let mut graph = Self::new();

        for identity in modules.modules.keys() {
            if !excluded.contains(identity) {
                graph.add_module(identity);
            }
        }

        for (identity, module) in &modules.modules {
            for require in module.manifest.requires() {
                graph.add_dependency(identity, &require.path);
            }
        }

        graph
    }

    /// Add a node for `identity` unless one exists
    pub fn add_module(&mut self, identity: &str) -> NodeIndex {
        if let Some(&idx) = self.index.get(identity) {
            return idx;
        }
        let idx = self.inner.add_node(identity.to_string());
        self.index.insert(identity.to_string(), idx);
        idx
    }

    /// Record that `from` requires `to`
    ///
    /// Returns `false` (and adds nothing) unless both are nodes. Repeated
    /// requirements collapse into a single edge.
    pub fn add_dependency(&mut self, from: &str, to: &str) -> bool {
        match (self.index.get(from), self.index.get(to)) {
            (Some(&a), Some(&b)) => {
                self.inner.update_edge(a, b, ());
                true
            }
            _ => false,
        }
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.index.contains_key(identity)
    }

    /// Get the number of nodes in the graph
    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    /// Get the number of edges in the graph
    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    /// All edges as `(source, target)` identity pairs, sorted
    pub fn edges(&self) -> Vec<(&str, &str)> {
        let mut edges: Vec<(&str, &str)> = self
            .inner
            .edge_references()
            .map(|e| (self.inner[e.source()].as_str(), self.inner[e.target()].as_str()))
            .collect();
        edges.sort_unstable();
        edges
    }

    /// Modules `identity` requires directly
    pub fn direct_dependencies(&self, identity: &str) -> BTreeSet<String> {
        let Some(&start) = self.index.get(identity) else {
            return BTreeSet::new();
        };
        self.inner
            .neighbors(start)
            .map(|n| self.inner[n].clone())
            .collect()
    }

    /// Every module reachable from `identity`, excluding `identity` itself
    ///
    /// A module that reaches itself through a cycle is fine; it is simply
    /// left out of its own result.
    pub fn transitive_dependencies(&self, identity: &str) -> BTreeSet<String> {
        let Some(&start) = self.index.get(identity) else {
            return BTreeSet::new();
        };

        let mut reachable = BTreeSet::new();
        let mut dfs = Dfs::new(&self.inner, start);
        while let Some(node) = dfs.next(&self.inner) {
            if node != start {
                reachable.insert(self.inner[node].clone());
            }
        }
        reachable
    }

    /// Transitive dependencies of every node
    pub fn closure(&self) -> BTreeMap<String, BTreeSet<String>> {
        self.index
            .keys()
            .map(|identity| (identity.clone(), self.transitive_dependencies(identity)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(nodes: &[&str], edges: &[(&str, &str)]) -> DependencyGraph {
        let mut graph = DependencyGraph::new();
        for node in nodes {
            graph.add_module(node);
        }
        for (from, to) in edges {
            graph.add_dependency(from, to);
        }
        graph
    }

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_new_graph_is_empty() {
        let graph = DependencyGraph::new();
        assert_eq!(graph.node_count(), 0);
        assert_eq!(graph.edge_count(), 0);
        assert!(graph.closure().is_empty());
    }

    #[test]
    fn test_chain_closure() {
        let graph = graph(&["root", "a", "b"], &[("root", "a"), ("a", "b")]);

        assert_eq!(graph.direct_dependencies("root"), set(&["a"]));
        assert_eq!(graph.transitive_dependencies("root"), set(&["a", "b"]));
        assert_eq!(graph.transitive_dependencies("a"), set(&["b"]));
        assert!(graph.transitive_dependencies("b").is_empty());
    }

    #[test]
    fn test_cycle_terminates() {
        let graph = graph(&["root", "a", "b"], &[("root", "a"), ("a", "b"), ("b", "root")]);

        assert_eq!(graph.transitive_dependencies("root"), set(&["a", "b"]));
        assert_eq!(graph.transitive_dependencies("a"), set(&["b", "root"]));
        assert_eq!(graph.transitive_dependencies("b"), set(&["a", "root"]));
    }

    #[test]
    fn test_self_loop_is_permitted() {
        let graph = graph(&["a"], &[("a", "a")]);

        assert_eq!(graph.edge_count(), 1);
        assert!(graph.transitive_dependencies("a").is_empty());
    }

    #[test]
    fn test_unknown_endpoints_are_ignored() {
        let mut graph = graph(&["a"], &[]);

        assert!(!graph.add_dependency("a", "golang.org/x/mod"));
        assert!(!graph.add_dependency("missing", "a"));
        assert_eq!(graph.edge_count(), 0);
        assert!(graph.transitive_dependencies("missing").is_empty());
    }

    #[test]
    fn test_duplicate_edges_collapse() {
        let graph = graph(&["a", "b"], &[("a", "b"), ("a", "b")]);

        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.edges(), vec![("a", "b")]);
    }

    #[test]
    fn test_closure_matches_repeated_edge_following() {
        let graph = graph(
            &["r", "a", "b", "c", "d"],
            &[("r", "a"), ("r", "c"), ("a", "b"), ("c", "b"), ("b", "d")],
        );

        for (node, reachable) in graph.closure() {
            // Fixed point of one-hop expansion
            let mut expected = graph.direct_dependencies(&node);
            loop {
                let next: BTreeSet<String> = expected
                    .iter()
                    .flat_map(|n| graph.direct_dependencies(n))
                    .chain(expected.iter().cloned())
                    .collect();
                if next == expected {
                    break;
                }
                expected = next;
            }
            expected.remove(&node);
            assert_eq!(reachable, expected, "closure mismatch for {node}");
        }
    }
}
