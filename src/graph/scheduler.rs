//! Topological scheduling with cycle tolerance.
//!
//! Depth-first traversal with three-colour marking. The traversal state is an
//! explicit array indexed by node, and the path being explored is an explicit
//! frame stack, so chain depth is bounded by memory rather than the native
//! stack. Roots are visited in declaration order and dependencies in
//! first-reference order, so the result is deterministic.
//!
//! A dependency found in progress closes a cycle. The back-edge is recorded and
//! skipped; the node still completes and is appended, so every agent appears in
//! the order exactly once and scheduling always terminates.

use super::DependencyGraph;
use serde::Serialize;
use tracing::warn;

/// Per-node traversal mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitState {
    Unvisited,
    InProgress,
    Done,
}

/// A back-edge skipped while scheduling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleWarning {
    /// Agent whose instruction closes the cycle.
    pub field: String,
    /// Dependency that was still in progress.
    pub dependency: String,
}

impl std::fmt::Display for CycleWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "dependency cycle: '{}' references '{}' which is still being resolved",
            self.field, self.dependency
        )
    }
}

/// Execution order produced by [`schedule`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schedule {
    /// Node indices; each node follows all of its non-cyclic dependencies.
    pub order: Vec<usize>,
    pub cycles: Vec<CycleWarning>,
}

impl Schedule {
    /// The order as agent names.
    pub fn names<'g>(&self, graph: &'g DependencyGraph) -> Vec<&'g str> {
        self.order.iter().map(|&node| graph.name(node)).collect()
    }

    pub fn has_cycles(&self) -> bool {
        !self.cycles.is_empty()
    }

    /// Group the order into waves of mutually independent agents.
    ///
    /// A node's wave is one past the highest wave among dependencies scheduled
    /// before it. Dependencies scheduled after it are back-edges and are
    /// unresolved at that point in a sequential run as well, so running each
    /// wave to completion before the next yields the same context as running
    /// the order one node at a time.
    pub fn waves(&self, graph: &DependencyGraph) -> Vec<Vec<usize>> {
        let mut position = vec![usize::MAX; graph.len()];
        for (pos, &node) in self.order.iter().enumerate() {
            position[node] = pos;
        }

        let mut level = vec![0usize; graph.len()];
        let mut waves: Vec<Vec<usize>> = Vec::new();

        for (pos, &node) in self.order.iter().enumerate() {
            let wave = graph
                .dependencies(node)
                .iter()
                .filter(|&&dep| position[dep] < pos)
                .map(|&dep| level[dep] + 1)
                .max()
                .unwrap_or(0);
            level[node] = wave;

            if waves.len() <= wave {
                waves.resize_with(wave + 1, Vec::new);
            }
            waves[wave].push(node);
        }

        waves
    }
}

/// Compute a dependency-respecting order over all nodes of `graph`.
pub fn schedule(graph: &DependencyGraph) -> Schedule {
    let mut state = vec![VisitState::Unvisited; graph.len()];
    let mut result = Schedule {
        order: Vec::with_capacity(graph.len()),
        cycles: Vec::new(),
    };
    // (node, index of the next dependency to examine)
    let mut stack: Vec<(usize, usize)> = Vec::new();

    for root in 0..graph.len() {
        if state[root] != VisitState::Unvisited {
            continue;
        }
        state[root] = VisitState::InProgress;
        stack.push((root, 0));

        while let Some(frame) = stack.last_mut() {
            let (node, next) = *frame;
            let deps = graph.dependencies(node);

            if next == deps.len() {
                stack.pop();
                state[node] = VisitState::Done;
                result.order.push(node);
                continue;
            }
            frame.1 += 1;

            let dep = deps[next];
            match state[dep] {
                VisitState::Done => {}
                VisitState::Unvisited => {
                    state[dep] = VisitState::InProgress;
                    stack.push((dep, 0));
                }
                VisitState::InProgress => {
                    let warning = CycleWarning {
                        field: graph.name(node).to_string(),
                        dependency: graph.name(dep).to_string(),
                    };
                    warn!(field = %warning.field, dependency = %warning.dependency, "{}", warning);
                    result.cycles.push(warning);
                }
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{Field, FieldRegistry, Template};

    fn graph_for(agents: &[(&str, &str)]) -> DependencyGraph {
        let mut template = Template::new("");
        for (name, instruction) in agents {
            template = template.with_field(Field::agent(*name, *instruction));
        }
        let registry = FieldRegistry::build(&template).unwrap();
        DependencyGraph::build(&registry)
    }

    fn assert_respects_dependencies(graph: &DependencyGraph, schedule: &Schedule) {
        let mut pos = vec![0; graph.len()];
        for (i, &node) in schedule.order.iter().enumerate() {
            pos[node] = i;
        }
        for node in 0..graph.len() {
            for &dep in graph.dependencies(node) {
                assert!(
                    pos[dep] < pos[node],
                    "{} scheduled before its dependency {}",
                    graph.name(node),
                    graph.name(dep)
                );
            }
        }
    }

    #[test]
    fn test_independent_agents_keep_declaration_order() {
        let graph = graph_for(&[("a", "x"), ("b", "y"), ("c", "z")]);
        let schedule = schedule(&graph);
        assert_eq!(schedule.names(&graph), vec!["a", "b", "c"]);
        assert!(!schedule.has_cycles());
    }

    #[test]
    fn test_chain_is_reversed() {
        let graph = graph_for(&[("a", "{b}"), ("b", "{c}"), ("c", "leaf")]);
        let schedule = schedule(&graph);
        assert_eq!(schedule.names(&graph), vec!["c", "b", "a"]);
        assert_respects_dependencies(&graph, &schedule);
    }

    #[test]
    fn test_diamond() {
        let graph = graph_for(&[
            ("top", "{left} {right}"),
            ("left", "{base}"),
            ("right", "{base}"),
            ("base", "leaf"),
        ]);
        let schedule = schedule(&graph);
        assert_eq!(schedule.names(&graph), vec!["base", "left", "right", "top"]);
        assert_respects_dependencies(&graph, &schedule);
    }

    #[test]
    fn test_every_node_scheduled_once() {
        let graph = graph_for(&[
            ("a", "{d}"),
            ("b", "{a} {d}"),
            ("c", "none"),
            ("d", "none"),
            ("e", "{b} {c}"),
        ]);
        let schedule = schedule(&graph);

        let mut seen = schedule.order.clone();
        seen.sort_unstable();
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
        assert_respects_dependencies(&graph, &schedule);
    }

    #[test]
    fn test_deterministic_across_runs() {
        let agents = [("p", "{q} {r}"), ("q", "{s}"), ("r", "{s} {q}"), ("s", "x")];
        let first = schedule(&graph_for(&agents));
        for _ in 0..10 {
            assert_eq!(schedule(&graph_for(&agents)), first);
        }
    }

    #[test]
    fn test_two_node_cycle_terminates() {
        let graph = graph_for(&[("a", "{b}"), ("b", "{a}")]);
        let schedule = schedule(&graph);

        assert_eq!(schedule.names(&graph), vec!["b", "a"]);
        assert_eq!(
            schedule.cycles,
            vec![CycleWarning {
                field: "b".to_string(),
                dependency: "a".to_string(),
            }]
        );
    }

    #[test]
    fn test_self_cycle() {
        let graph = graph_for(&[("a", "again {a}")]);
        let schedule = schedule(&graph);

        assert_eq!(schedule.order, vec![0]);
        assert_eq!(schedule.cycles.len(), 1);
        assert_eq!(schedule.cycles[0].field, "a");
        assert_eq!(schedule.cycles[0].dependency, "a");
    }

    #[test]
    fn test_cycle_keeps_remaining_dependencies_ordered() {
        // a -> b -> a closes a cycle, but b also needs c which must come first.
        let graph = graph_for(&[("a", "{b}"), ("b", "{a} {c}"), ("c", "leaf")]);
        let schedule = schedule(&graph);

        assert_eq!(schedule.names(&graph), vec!["c", "b", "a"]);
        assert_eq!(schedule.cycles.len(), 1);
    }

    #[test]
    fn test_cycle_warning_display() {
        let warning = CycleWarning {
            field: "a".to_string(),
            dependency: "b".to_string(),
        };
        assert_eq!(
            warning.to_string(),
            "dependency cycle: 'a' references 'b' which is still being resolved"
        );
    }

    #[test]
    fn test_waves_group_independent_agents() {
        let graph = graph_for(&[
            ("top", "{left} {right}"),
            ("left", "{base}"),
            ("right", "{base}"),
            ("base", "leaf"),
            ("solo", "leaf"),
        ]);
        let schedule = schedule(&graph);
        let waves: Vec<Vec<&str>> = schedule
            .waves(&graph)
            .iter()
            .map(|w| w.iter().map(|&n| graph.name(n)).collect())
            .collect();

        assert_eq!(
            waves,
            vec![vec!["base", "solo"], vec!["left", "right"], vec!["top"]]
        );
    }

    #[test]
    fn test_waves_ignore_back_edges() {
        let graph = graph_for(&[("a", "{b}"), ("b", "{a}")]);
        let schedule = schedule(&graph);
        let waves = schedule.waves(&graph);

        // b runs first without a; a then sees b.
        assert_eq!(waves, vec![vec![1], vec![0]]);
    }

    #[test]
    fn test_long_chain_does_not_exhaust_stack() {
        let count = 10_000;
        let names: Vec<String> = (0..count).map(|i| format!("a{}", i)).collect();
        let instructions: Vec<String> = (0..count)
            .map(|i| match names.get(i + 1) {
                Some(next) => format!("x{{{}}}", next),
                None => "leaf".to_string(),
            })
            .collect();
        let agents: Vec<(&str, &str)> = names
            .iter()
            .zip(&instructions)
            .map(|(n, i)| (n.as_str(), i.as_str()))
            .collect();

        let graph = graph_for(&agents);
        let schedule = schedule(&graph);

        assert_eq!(schedule.order.len(), count);
        assert_eq!(schedule.order.first(), Some(&(count - 1)));
        assert_eq!(schedule.order.last(), Some(&0));
        assert!(!schedule.has_cycles());
        assert_eq!(schedule.waves(&graph).len(), count);
    }

    #[test]
    fn test_long_cycle_reports_single_back_edge() {
        let count = 5_000;
        let agents_owned: Vec<(String, String)> = (0..count)
            .map(|i| (format!("n{}", i), format!("{{n{}}}", (i + 1) % count)))
            .collect();
        let agents: Vec<(&str, &str)> = agents_owned
            .iter()
            .map(|(n, i)| (n.as_str(), i.as_str()))
            .collect();

        let graph = graph_for(&agents);
        let schedule = schedule(&graph);

        assert_eq!(schedule.order.len(), count);
        assert_eq!(schedule.cycles.len(), 1);
        assert_eq!(schedule.cycles[0].field, format!("n{}", count - 1));
        assert_eq!(schedule.cycles[0].dependency, "n0");
    }

    #[test]
    fn test_empty_graph() {
        let graph = DependencyGraph::default();
        let schedule = schedule(&graph);
        assert!(schedule.order.is_empty());
        assert!(schedule.waves(&graph).is_empty());
    }
}
