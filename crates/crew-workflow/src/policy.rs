//! Scheduling policies
//!
//! A policy decides which ready task runs next. The crew only ever asks when
//! at least one task is ready, and treats an answer outside the ready set as
//! the first ready task.

use crate::graph::TaskGraph;
use crate::task::{TaskOutput, TaskSpec};
use async_trait::async_trait;
use crew_core::{Agent, Context, Result};
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::{debug, warn};

const OUTPUT_PREVIEW_CHARS: usize = 300;

/// What a policy can see when choosing
pub struct SchedulingState<'a> {
    /// The validated graph
    pub graph: &'a TaskGraph,
    /// Tasks with rendered text, indexed like the graph
    pub tasks: &'a [TaskSpec],
    /// Candidate task indices, in declaration order, never empty
    pub ready: &'a [usize],
    /// Outputs finished so far, in completion order
    pub completed: &'a [TaskOutput],
}

impl SchedulingState<'_> {
    fn first_ready(&self) -> usize {
        self.ready[0]
    }
}

/// Chooses the next task to run
#[async_trait]
pub trait SchedulingPolicy: Send + Sync {
    /// Pick one index out of `state.ready`
    async fn next_task(&self, state: &SchedulingState<'_>, context: &mut Context) -> Result<usize>;

    /// Policy name for logs
    fn name(&self) -> &str;
}

/// Runs ready tasks in declaration order
///
/// Because the ready set is recomputed after every task, this yields the
/// graph's topological order with declaration-index tie break.
pub struct SequentialPolicy;

#[async_trait]
impl SchedulingPolicy for SequentialPolicy {
    async fn next_task(&self, state: &SchedulingState<'_>, _context: &mut Context) -> Result<usize> {
        Ok(state.first_ready())
    }

    fn name(&self) -> &str {
        "sequential"
    }
}

/// Lets a manager agent pick among ready tasks
pub struct ManagerPolicy {
    manager: Arc<dyn Agent>,
}

impl ManagerPolicy {
    /// Wrap a manager agent
    pub fn new(manager: Arc<dyn Agent>) -> Self {
        Self { manager }
    }

    fn prompt(state: &SchedulingState<'_>) -> String {
        let mut prompt = String::new();

        if state.completed.is_empty() {
            prompt.push_str("No tasks have been completed yet.\n");
        } else {
            prompt.push_str("Completed tasks:\n");
            for output in state.completed {
                let preview: String = output.raw.chars().take(OUTPUT_PREVIEW_CHARS).collect();
                let _ = writeln!(prompt, "- {} ({}): {}", output.name, output.agent, preview);
            }
        }

        prompt.push_str("\nTasks ready to run:\n");
        for &i in state.ready {
            let task = &state.tasks[i];
            let _ = writeln!(prompt, "- {} ({}): {}", task.name, task.agent, task.description);
        }

        prompt.push_str(
            "\nWhich task should run next? Do not repeat completed tasks. \
             Answer with the task name only.",
        );
        prompt
    }

    /// The ready task whose name appears earliest in `answer`
    fn choose(answer: &str, state: &SchedulingState<'_>) -> Option<usize> {
        let answer = answer.to_lowercase();
        state
            .ready
            .iter()
            .filter_map(|&i| {
                answer
                    .find(&state.tasks[i].name.to_lowercase())
                    .map(|pos| (pos, i))
            })
            .min()
            .map(|(_, i)| i)
    }
}

#[async_trait]
impl SchedulingPolicy for ManagerPolicy {
    async fn next_task(&self, state: &SchedulingState<'_>, context: &mut Context) -> Result<usize> {
        if let [only] = state.ready {
            return Ok(*only);
        }

        let answer = self
            .manager
            .process(Self::prompt(state), context)
            .await?;

        match Self::choose(&answer, state) {
            Some(i) => {
                debug!(manager = self.manager.name(), task = state.graph.name(i), "Manager chose task");
                Ok(i)
            }
            None => {
                let fallback = state.first_ready();
                warn!(
                    manager = self.manager.name(),
                    answer = %answer,
                    fallback = state.graph.name(fallback),
                    "Manager named no ready task, using first ready task"
                );
                Ok(fallback)
            }
        }
    }

    fn name(&self) -> &str {
        "manager"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crew_core::Error;

    struct FixedAnswer(&'static str);

    #[async_trait]
    impl Agent for FixedAnswer {
        async fn process(&self, _input: String, _context: &mut Context) -> Result<String> {
            Ok(self.0.to_string())
        }

        fn name(&self) -> &str {
            "Project Manager"
        }
    }

    struct Failing;

    #[async_trait]
    impl Agent for Failing {
        async fn process(&self, _input: String, _context: &mut Context) -> Result<String> {
            Err(Error::ProcessingFailed("boom".to_string()))
        }

        fn name(&self) -> &str {
            "Project Manager"
        }
    }

    fn tasks() -> Vec<TaskSpec> {
        vec![
            TaskSpec::new("data_collection", "Collect IBM data", "metrics", "Stock Data Collector"),
            TaskSpec::new("news_reading", "Read IBM news", "summary", "News Reader"),
            TaskSpec::new("financial_analysis", "Write report", "report", "Financial Analyst")
                .with_context(["data_collection", "news_reading"]),
        ]
    }

    async fn pick(policy: &dyn SchedulingPolicy, ready: &[usize]) -> Result<usize> {
        let tasks = tasks();
        let graph = TaskGraph::new(&tasks).unwrap();
        let state = SchedulingState {
            graph: &graph,
            tasks: &tasks,
            ready,
            completed: &[],
        };
        policy.next_task(&state, &mut Context::default()).await
    }

    #[tokio::test]
    async fn test_sequential_takes_first_ready() {
        assert_eq!(pick(&SequentialPolicy, &[1, 2]).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_manager_choice() {
        let policy = ManagerPolicy::new(Arc::new(FixedAnswer("Run news_reading next.")));
        assert_eq!(pick(&policy, &[0, 1]).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_manager_earliest_mention_wins() {
        let policy = ManagerPolicy::new(Arc::new(FixedAnswer(
            "Data_Collection first, news_reading after",
        )));
        assert_eq!(pick(&policy, &[0, 1]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_manager_unknown_answer_falls_back() {
        let policy = ManagerPolicy::new(Arc::new(FixedAnswer("financial_analysis")));
        assert_eq!(pick(&policy, &[0, 1]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_manager_not_asked_for_single_candidate() {
        let policy = ManagerPolicy::new(Arc::new(Failing));
        assert_eq!(pick(&policy, &[2]).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_manager_failure_propagates() {
        let policy = ManagerPolicy::new(Arc::new(Failing));
        assert!(pick(&policy, &[0, 1]).await.is_err());
    }

    #[test]
    fn test_prompt_lists_ready_tasks() {
        let tasks = tasks();
        let graph = TaskGraph::new(&tasks).unwrap();
        let completed = vec![TaskOutput {
            name: "data_collection".to_string(),
            agent: "Stock Data Collector".to_string(),
            description: "Collect IBM data".to_string(),
            raw: "P/E Ratio: 20.1".to_string(),
        }];
        let state = SchedulingState {
            graph: &graph,
            tasks: &tasks,
            ready: &[1],
            completed: &completed,
        };

        let prompt = ManagerPolicy::prompt(&state);
        assert!(prompt.contains("- data_collection (Stock Data Collector): P/E Ratio: 20.1"));
        assert!(prompt.contains("- news_reading (News Reader): Read IBM news"));
        assert!(!prompt.contains("financial_analysis"));
    }
}
