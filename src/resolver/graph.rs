// src/resolver/graph.rs

//! Dependency graph data structures and algorithms
//!
//! Provides graph construction, cycle detection and topological
//! ordering for package dependencies. Resolution is by name only; an
//! edge `A -> B` means "A depends on B".

use std::collections::{HashMap, HashSet};

/// Name-keyed dependency graph with deterministic (insertion) ordering
#[derive(Debug, Default)]
pub struct DependencyGraph {
    /// Node names in insertion order
    nodes: Vec<String>,
    seen: HashSet<String>,
    /// Outgoing edges: package -> its dependencies, in insertion order
    edges: HashMap<String, Vec<String>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, name: &str) {
        if self.seen.insert(name.to_string()) {
            self.nodes.push(name.to_string());
        }
    }

    /// Record "`from` depends on `to`". Both endpoints become nodes.
    pub fn add_edge(&mut self, from: &str, to: &str) {
        self.add_node(from);
        self.add_node(to);
        let deps = self.edges.entry(from.to_string()).or_default();
        if !deps.iter().any(|d| d == to) {
            deps.push(to.to_string());
        }
    }

    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    pub fn dependencies_of(&self, name: &str) -> &[String] {
        self.edges.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    /// Depth-first cycle search. Returns the participants of the first
    /// cycle found, or `None` for an acyclic graph.
    pub fn detect_cycle(&self) -> Option<Vec<String>> {
        let mut visited = HashSet::new();
        let mut stack = HashSet::new();
        let mut cycle = Vec::new();

        for name in &self.nodes {
            if !visited.contains(name)
                && self.dfs_cycle(name, &mut visited, &mut stack, &mut cycle)
            {
                cycle.reverse();
                return Some(cycle);
            }
        }
        None
    }

    fn dfs_cycle(
        &self,
        name: &str,
        visited: &mut HashSet<String>,
        stack: &mut HashSet<String>,
        cycle: &mut Vec<String>,
    ) -> bool {
        visited.insert(name.to_string());
        stack.insert(name.to_string());

        for dep in self.dependencies_of(name) {
            if !visited.contains(dep) {
                if self.dfs_cycle(dep, visited, stack, cycle) {
                    cycle.push(name.to_string());
                    return true;
                }
            } else if stack.contains(dep) {
                // Back-edge: dep is on the current path.
                cycle.push(dep.clone());
                cycle.push(name.to_string());
                return true;
            }
        }

        stack.remove(name);
        false
    }

    /// Topological order emitting every package after its dependencies,
    /// so iterating the result installs dependencies first. Ties break
    /// by insertion order. The graph must already be acyclic.
    pub fn topo_order(&self) -> Vec<String> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut done = HashSet::new();

        for name in &self.nodes {
            self.post_order(name, &mut done, &mut order);
        }
        order
    }

    fn post_order(&self, name: &str, done: &mut HashSet<String>, order: &mut Vec<String>) {
        if !done.insert(name.to_string()) {
            return;
        }
        for dep in self.dependencies_of(name) {
            self.post_order(dep, done, order);
        }
        order.push(name.to_string());
    }
}
