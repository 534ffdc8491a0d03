//! Executor-backed agents

use crate::executor::{AgentExecutor, ExecutorEventHandler, NoOpEventHandler};
use async_trait::async_trait;
use crew_core::{Agent, Context, Result};
use tracing::{Instrument, info_span};

/// An [`Agent`] that answers through an [`AgentExecutor`]
///
/// Agents with no tools make a single completion per prompt, which is how the
/// planner and the manager run.
pub struct ExecutorAgent {
    executor: AgentExecutor,
    name: String,
}

impl ExecutorAgent {
    pub fn new(executor: AgentExecutor, name: impl Into<String>) -> Self {
        Self {
            executor,
            name: name.into(),
        }
    }

    /// Answer `input`, reporting tool calls to `events`
    ///
    /// Logs are tagged with the run and task from `context`; the usage of the
    /// loop is recorded on it.
    pub async fn process_with_events(
        &self,
        input: String,
        context: &mut Context,
        events: &dyn ExecutorEventHandler,
    ) -> Result<String> {
        let span = info_span!(
            "agent",
            role = %self.name,
            run_id = %context.run_id(),
            task = context.task().unwrap_or("-"),
        );
        let output = self.executor.run(input, events).instrument(span).await?;

        context.record_usage(output.usage);
        Ok(output.text)
    }
}

#[async_trait]
impl Agent for ExecutorAgent {
    async fn process(&self, input: String, context: &mut Context) -> Result<String> {
        self.process_with_events(input, context, &NoOpEventHandler)
            .await
    }

    fn name(&self) -> &str {
        &self.name
    }
}
