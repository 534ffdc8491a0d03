//! Task definitions and outputs

use serde::{Deserialize, Serialize};

/// One unit of work in a crew
///
/// `description` and `expected_output` are templates rendered against the
/// kickoff inputs. `context` names the tasks whose outputs this task reads;
/// those names are the edges of the [`TaskGraph`](crate::TaskGraph).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSpec {
    /// Unique task name
    pub name: String,
    /// What to do
    pub description: String,
    /// What a good answer looks like
    pub expected_output: String,
    /// Role of the agent that runs this task
    pub agent: String,
    /// Tasks whose outputs this one reads
    pub context: Vec<String>,
    /// Run without blocking the tasks after it
    pub async_execution: bool,
    /// File the output is written to, relative to the crew output directory
    pub output_file: Option<String>,
}

impl TaskSpec {
    /// Create a synchronous task with no context
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        expected_output: impl Into<String>,
        agent: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            expected_output: expected_output.into(),
            agent: agent.into(),
            context: Vec::new(),
            async_execution: false,
            output_file: None,
        }
    }

    /// Set the context tasks
    pub fn with_context<I, S>(mut self, context: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.context = context.into_iter().map(Into::into).collect();
        self
    }

    /// Mark the task as asynchronous
    pub fn async_execution(mut self, async_execution: bool) -> Self {
        self.async_execution = async_execution;
        self
    }

    /// Write the output to `path`
    pub fn output_file(mut self, path: impl Into<String>) -> Self {
        self.output_file = Some(path.into());
        self
    }
}

/// Result of a completed task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskOutput {
    /// Task name
    pub name: String,
    /// Role of the agent that produced it
    pub agent: String,
    /// Rendered task description
    pub description: String,
    /// Final answer text
    pub raw: String,
}
