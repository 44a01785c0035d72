//! Task dependency graph and cycle detection.
//!
//! An edge `task -> depends_on` means `depends_on` must be completed before
//! `task`. Adding `task -> depends_on` creates a cycle exactly when `task` is
//! already reachable from `depends_on`.

use std::collections::{HashMap, HashSet};

#[derive(Debug, Default)]
pub struct DependencyGraph {
    edges: HashMap<i32, Vec<i32>>,
}

impl DependencyGraph {
    pub fn from_edges<I>(edges: I) -> Self
    where
        I: IntoIterator<Item = (i32, i32)>,
    {
        let mut graph = DependencyGraph::default();
        for (task_id, depends_on_id) in edges {
            graph.add_edge(task_id, depends_on_id);
        }
        graph
    }

    pub fn add_edge(&mut self, task_id: i32, depends_on_id: i32) {
        let targets = self.edges.entry(task_id).or_default();
        if !targets.contains(&depends_on_id) {
            targets.push(depends_on_id);
        }
    }

    pub fn has_edge(&self, task_id: i32, depends_on_id: i32) -> bool {
        self.depends_on(task_id).contains(&depends_on_id)
    }

    pub fn depends_on(&self, task_id: i32) -> &[i32] {
        self.edges.get(&task_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// True if `to` can be reached from `from` by following dependency edges.
    pub fn path_exists(&self, from: i32, to: i32) -> bool {
        let mut visited = HashSet::new();
        self.visit(from, to, &mut visited)
    }

    fn visit(&self, current: i32, target: i32, visited: &mut HashSet<i32>) -> bool {
        if current == target {
            return true;
        }
        if !visited.insert(current) {
            return false;
        }
        self.depends_on(current)
            .iter()
            .any(|&next| self.visit(next, target, visited))
    }

    pub fn would_create_cycle(&self, task_id: i32, depends_on_id: i32) -> bool {
        task_id == depends_on_id || self.path_exists(depends_on_id, task_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_back_edge_is_a_cycle() {
        let graph = DependencyGraph::from_edges([(2, 1)]);
        assert!(graph.would_create_cycle(1, 2));
        assert!(!graph.would_create_cycle(3, 2));
    }

    #[test]
    fn transitive_back_edge_is_a_cycle() {
        // 4 -> 3 -> 2 -> 1
        let graph = DependencyGraph::from_edges([(4, 3), (3, 2), (2, 1)]);
        assert!(graph.would_create_cycle(1, 4));
        assert!(!graph.would_create_cycle(4, 1));
    }

    #[test]
    fn diamond_is_not_a_cycle() {
        // 4 depends on 2 and 3, both depend on 1
        let graph = DependencyGraph::from_edges([(4, 2), (4, 3), (2, 1), (3, 1)]);
        assert!(!graph.would_create_cycle(5, 4));
        assert!(!graph.would_create_cycle(4, 1));
        assert!(graph.would_create_cycle(1, 4));
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        assert!(DependencyGraph::default().would_create_cycle(9, 9));
    }

    #[test]
    fn existing_cycle_does_not_loop_forever() {
        let graph = DependencyGraph::from_edges([(1, 2), (2, 3), (3, 1)]);
        assert!(!graph.path_exists(1, 42));
        assert!(graph.path_exists(1, 3));
    }

    #[test]
    fn duplicate_edges_are_collapsed() {
        let graph = DependencyGraph::from_edges([(1, 2), (1, 2)]);
        assert_eq!(graph.depends_on(1), &[2]);
        assert!(graph.has_edge(1, 2));
        assert!(!graph.has_edge(2, 1));
    }
}
