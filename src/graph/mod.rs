//! Dependency graph over agent fields.
//!
//! Nodes are the schedulable agents of a [`FieldRegistry`], addressed by their
//! declaration position. An edge `a -> b` means the instruction of `a`
//! references `{b}`, so `b` has to be resolved first. Input references are
//! leaves and never become nodes.

mod scheduler;

pub use scheduler::{CycleWarning, Schedule, VisitState, schedule};

use crate::reference::extract_references;
use crate::template::FieldRegistry;

/// Adjacency list over agent positions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    names: Vec<String>,
    /// `edges[i]` lists the agents node `i` depends on, in first-reference order.
    edges: Vec<Vec<usize>>,
}

impl DependencyGraph {
    /// Build the graph from each agent's instruction.
    ///
    /// Brace references to unknown names or to input fields are ignored here;
    /// they stay literal text during substitution.
    pub fn build(registry: &FieldRegistry<'_>) -> Self {
        let agents = registry.agents();
        let mut graph = DependencyGraph {
            names: agents.iter().map(|a| a.name().to_string()).collect(),
            edges: Vec::with_capacity(agents.len()),
        };

        for agent in agents {
            let deps = extract_references(&agent.config.instruction)
                .agents
                .iter()
                .filter_map(|name| registry.agent_position(name))
                .collect();
            graph.edges.push(deps);
        }

        graph
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn name(&self, node: usize) -> &str {
        &self.names[node]
    }

    /// Agent names in declaration order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Direct dependencies of `node`.
    pub fn dependencies(&self, node: usize) -> &[usize] {
        &self.edges[node]
    }

    /// Direct dependencies of the agent called `name`, by name.
    pub fn dependency_names(&self, name: &str) -> Vec<&str> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|node| self.edges[node].iter().map(|&d| self.name(d)).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{Field, Template};

    fn graph_for(template: &Template) -> DependencyGraph {
        let registry = FieldRegistry::build(template).unwrap();
        DependencyGraph::build(&registry)
    }

    #[test]
    fn test_edges_follow_agent_references() {
        let template = Template::new("")
            .with_field(Field::input("x"))
            .with_field(Field::agent("a", "use {b} and {c} with /x"))
            .with_field(Field::agent("b", "use {c}"))
            .with_field(Field::agent("c", "base /x"));
        let graph = graph_for(&template);

        assert_eq!(graph.len(), 3);
        assert_eq!(graph.names(), &["a", "b", "c"]);
        assert_eq!(graph.dependency_names("a"), vec!["b", "c"]);
        assert_eq!(graph.dependency_names("b"), vec!["c"]);
        assert!(graph.dependency_names("c").is_empty());
    }

    #[test]
    fn test_dangling_and_input_brace_references_are_ignored() {
        let template = Template::new("")
            .with_field(Field::input("x"))
            .with_field(Field::agent("a", "{x} {ghost} {b}"))
            .with_field(Field::agent("b", "plain"));
        let graph = graph_for(&template);

        assert_eq!(graph.dependencies(0), &[1]);
    }

    #[test]
    fn test_duplicate_references_produce_single_edge() {
        let template = Template::new("")
            .with_field(Field::agent("a", "{b} then {b} again"))
            .with_field(Field::agent("b", "plain"));
        let graph = graph_for(&template);

        assert_eq!(graph.dependencies(0), &[1]);
    }

    #[test]
    fn test_self_reference_is_an_edge() {
        let template = Template::new("").with_field(Field::agent("a", "more {a}"));
        let graph = graph_for(&template);

        assert_eq!(graph.dependencies(0), &[0]);
    }

    #[test]
    fn test_no_agents() {
        let template = Template::new("/x").with_field(Field::input("x"));
        let graph = graph_for(&template);

        assert!(graph.is_empty());
        assert!(graph.dependency_names("x").is_empty());
    }
}
