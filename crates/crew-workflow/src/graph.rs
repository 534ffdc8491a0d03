//! Static task graph
//!
//! Nodes are tasks in declaration order, edges run from each context task to
//! the task that reads it. The graph is validated once at construction; after
//! that it is immutable and every query is independent of execution.

use crate::task::TaskSpec;
use crew_core::{Error, Result};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

/// Directed acyclic graph of tasks
#[derive(Debug, Clone)]
pub struct TaskGraph {
    names: Vec<String>,
    index: HashMap<String, usize>,
    dependencies: Vec<Vec<usize>>,
    dependents: Vec<Vec<usize>>,
    order: Vec<usize>,
}

impl TaskGraph {
    /// Build and validate the graph for `tasks`
    ///
    /// Rejects duplicate names, context references to unknown tasks, and
    /// cycles (including a task listing itself).
    pub fn new(tasks: &[TaskSpec]) -> Result<Self> {
        let mut index = HashMap::with_capacity(tasks.len());
        for (i, task) in tasks.iter().enumerate() {
            if index.insert(task.name.clone(), i).is_some() {
                return Err(Error::InvalidGraph(format!(
                    "duplicate task name '{}'",
                    task.name
                )));
            }
        }

        let mut dependencies = vec![Vec::new(); tasks.len()];
        let mut dependents = vec![Vec::new(); tasks.len()];
        for (i, task) in tasks.iter().enumerate() {
            for dep in &task.context {
                let &j = index.get(dep).ok_or_else(|| {
                    Error::InvalidGraph(format!(
                        "task '{}' references unknown context task '{dep}'",
                        task.name
                    ))
                })?;
                if !dependencies[i].contains(&j) {
                    dependencies[i].push(j);
                    dependents[j].push(i);
                }
            }
        }

        let order = kahn(&dependencies, &dependents).ok_or_else(|| {
            Error::InvalidGraph("task context wiring contains a cycle".to_string())
        })?;

        Ok(Self {
            names: tasks.iter().map(|t| t.name.clone()).collect(),
            index,
            dependencies,
            dependents,
            order,
        })
    }

    /// Number of tasks
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the graph has no tasks
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Name of task `i`
    pub fn name(&self, i: usize) -> &str {
        &self.names[i]
    }

    /// Index of the task called `name`
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Tasks that task `i` reads, in context order
    pub fn dependencies(&self, i: usize) -> &[usize] {
        &self.dependencies[i]
    }

    /// Tasks that read task `i`
    pub fn dependents(&self, i: usize) -> &[usize] {
        &self.dependents[i]
    }

    /// Topological order, ties broken by declaration index
    pub fn topological_order(&self) -> &[usize] {
        &self.order
    }

    /// Tasks nothing depends on, in declaration order
    pub fn sinks(&self) -> Vec<usize> {
        (0..self.len())
            .filter(|&i| self.dependents[i].is_empty())
            .collect()
    }

    /// The single task nothing depends on, if there is exactly one
    pub fn sink(&self) -> Option<usize> {
        match self.sinks().as_slice() {
            [only] => Some(*only),
            _ => None,
        }
    }

    /// Tasks not yet started whose dependencies have all started
    ///
    /// `started[i]` tells whether task `i` has been scheduled. Returned in
    /// declaration order.
    pub fn ready(&self, started: &[bool]) -> Vec<usize> {
        (0..self.len())
            .filter(|&i| !started[i] && self.dependencies[i].iter().all(|&d| started[d]))
            .collect()
    }
}

fn kahn(dependencies: &[Vec<usize>], dependents: &[Vec<usize>]) -> Option<Vec<usize>> {
    let mut in_degree: Vec<usize> = dependencies.iter().map(Vec::len).collect();
    let mut heap: BinaryHeap<Reverse<usize>> = in_degree
        .iter()
        .enumerate()
        .filter(|&(_, &d)| d == 0)
        .map(|(i, _)| Reverse(i))
        .collect();

    let mut order = Vec::with_capacity(dependencies.len());
    while let Some(Reverse(i)) = heap.pop() {
        order.push(i);
        for &next in &dependents[i] {
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                heap.push(Reverse(next));
            }
        }
    }

    (order.len() == dependencies.len()).then_some(order)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(name: &str, context: &[&str]) -> TaskSpec {
        TaskSpec::new(name, "do it", "done", "agent").with_context(context.iter().copied())
    }

    #[test]
    fn test_report_shape() {
        let graph = TaskGraph::new(&[
            task("data_collection", &[]),
            task("news_reading", &[]),
            task("market_research", &[]),
            task(
                "financial_analysis",
                &["data_collection", "news_reading", "market_research"],
            ),
        ])
        .unwrap();

        assert_eq!(graph.topological_order(), &[0, 1, 2, 3]);
        assert_eq!(graph.sink(), Some(3));
        assert_eq!(graph.dependencies(3), &[0, 1, 2]);
        assert_eq!(graph.dependents(1), &[3]);
        assert_eq!(graph.index_of("news_reading"), Some(1));
    }

    #[test]
    fn test_order_respects_edges_before_declaration() {
        let graph = TaskGraph::new(&[
            task("report", &["research"]),
            task("research", &[]),
            task("other", &[]),
        ])
        .unwrap();

        assert_eq!(graph.topological_order(), &[1, 0, 2]);
        assert_eq!(graph.sinks(), vec![0, 2]);
        assert_eq!(graph.sink(), None);
    }

    #[test]
    fn test_ready() {
        let graph = TaskGraph::new(&[task("a", &[]), task("b", &["a"]), task("c", &[])]).unwrap();

        assert_eq!(graph.ready(&[false, false, false]), vec![0, 2]);
        assert_eq!(graph.ready(&[true, false, false]), vec![1, 2]);
        assert!(graph.ready(&[true, true, true]).is_empty());
    }

    #[test]
    fn test_rejects_cycle() {
        let result = TaskGraph::new(&[task("a", &["b"]), task("b", &["a"])]);
        assert!(matches!(result, Err(Error::InvalidGraph(msg)) if msg.contains("cycle")));
    }

    #[test]
    fn test_rejects_self_reference() {
        let result = TaskGraph::new(&[task("a", &["a"])]);
        assert!(matches!(result, Err(Error::InvalidGraph(_))));
    }

    #[test]
    fn test_rejects_unknown_reference() {
        let result = TaskGraph::new(&[task("a", &["missing"])]);
        assert!(matches!(result, Err(Error::InvalidGraph(msg)) if msg.contains("missing")));
    }

    #[test]
    fn test_rejects_duplicate_names() {
        let result = TaskGraph::new(&[task("a", &[]), task("a", &[])]);
        assert!(matches!(result, Err(Error::InvalidGraph(msg)) if msg.contains("duplicate")));
    }
}
