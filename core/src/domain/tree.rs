// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Dependency forest projection
//!
//! Tasks and dependency edges form a DAG in which children may be shared, so
//! the projection is an arena of nodes addressed by index rather than owning
//! child pointers. A dependency points downward to the tasks that wait for
//! it: roots are tasks with no outgoing dep edge.

use std::collections::HashMap;

use crate::domain::task::Task;

#[derive(Debug)]
pub struct TaskForest {
    nodes: Vec<TaskNode>,
    roots: Vec<usize>,
}

#[derive(Debug)]
pub struct TaskNode {
    pub task: Task,
    pub children: Vec<usize>,
}

impl TaskForest {
    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    pub fn node(&self, idx: usize) -> &TaskNode {
        &self.nodes[idx]
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Build the forest from a task list and (task, depends_on) edges. Edges
/// whose endpoints are outside the task list (e.g. filtered out by project)
/// are ignored for wiring but still suppress root status on the waiting
/// side only if the dependency itself is present.
pub fn project_forest(tasks: Vec<Task>, edges: &[(String, String)]) -> TaskForest {
    let index: HashMap<String, usize> = tasks
        .iter()
        .enumerate()
        .map(|(i, t)| (t.id.clone(), i))
        .collect();

    let mut nodes: Vec<TaskNode> = tasks
        .into_iter()
        .map(|task| TaskNode {
            task,
            children: Vec::new(),
        })
        .collect();

    let mut has_parent = vec![false; nodes.len()];
    for (task_id, depends_on) in edges {
        let (Some(&child), Some(&parent)) = (index.get(task_id), index.get(depends_on)) else {
            continue;
        };
        nodes[parent].children.push(child);
        has_parent[child] = true;
    }

    let roots = (0..nodes.len()).filter(|&i| !has_parent[i]).collect();
    TaskForest { nodes, roots }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::task::TaskStatus;
    use chrono::Utc;

    fn task(id: &str) -> Task {
        Task {
            id: id.to_string(),
            title: id.to_string(),
            body: String::new(),
            status: TaskStatus::Ready,
            priority: 5,
            claimed_by: None,
            claimed_at: None,
            done_at: None,
            created_at: Utc::now(),
            attempt: 0,
            max_attempts: 3,
            project_id: None,
            metadata: None,
            requires_approval: false,
            approved_by: None,
            approved_at: None,
            rejection_reason: None,
        }
    }

    fn visit_count(forest: &TaskForest) -> HashMap<String, usize> {
        let mut counts = HashMap::new();
        fn walk(forest: &TaskForest, idx: usize, counts: &mut HashMap<String, usize>) {
            *counts
                .entry(forest.node(idx).task.id.clone())
                .or_insert(0) += 1;
            for &child in &forest.node(idx).children {
                walk(forest, child, counts);
            }
        }
        for &root in forest.roots() {
            walk(forest, root, &mut counts);
        }
        counts
    }

    #[test]
    fn chain_projects_top_down() {
        // c depends on b depends on a: a is the single root.
        let edges = vec![
            ("b".to_string(), "a".to_string()),
            ("c".to_string(), "b".to_string()),
        ];
        let forest = project_forest(vec![task("a"), task("b"), task("c")], &edges);
        assert_eq!(forest.roots().len(), 1);
        assert_eq!(forest.node(forest.roots()[0]).task.id, "a");

        let counts = visit_count(&forest);
        assert_eq!(counts.len(), 3);
        assert!(counts.values().all(|&n| n == 1));
    }

    #[test]
    fn independent_tasks_are_all_roots() {
        let forest = project_forest(vec![task("a"), task("b")], &[]);
        assert_eq!(forest.roots().len(), 2);
    }

    #[test]
    fn shared_dependent_appears_under_both_deps() {
        // c depends on both a and b; a and b are roots, c is a shared child.
        let edges = vec![
            ("c".to_string(), "a".to_string()),
            ("c".to_string(), "b".to_string()),
        ];
        let forest = project_forest(vec![task("a"), task("b"), task("c")], &edges);
        assert_eq!(forest.roots().len(), 2);
        let counts = visit_count(&forest);
        assert_eq!(counts["c"], 2);
        assert_eq!(counts["a"], 1);
    }

    #[test]
    fn edges_outside_the_filter_are_ignored() {
        let edges = vec![("b".to_string(), "zz".to_string())];
        let forest = project_forest(vec![task("a"), task("b")], &edges);
        assert_eq!(forest.roots().len(), 2);
    }
}
