//! Crew run notifications

use crate::task::TaskOutput;
use async_trait::async_trait;
use crew_llm::ToolCall;
use crew_runtime::ExecutorEventHandler;
use serde_json::Value;
use std::sync::Arc;

/// Receives progress notifications during a crew run
///
/// Every method has an empty default, so implementors only override what
/// they print or record.
#[async_trait]
pub trait CrewEventHandler: Send + Sync {
    /// The planning step produced a plan
    async fn on_plan(&self, _plan: &str) {}

    /// A task is about to run
    async fn on_task_start(&self, _task: &str, _agent: &str) {}

    /// A task attempt failed and will be retried
    async fn on_task_retry(&self, _task: &str, _attempt: usize, _error: &str) {}

    /// A task finished
    async fn on_task_complete(&self, _output: &TaskOutput) {}

    /// An async task was left running because nothing reads its output
    async fn on_task_detached(&self, _task: &str) {}

    /// An agent called a tool
    async fn on_tool_start(&self, _task: &str, _tool: &str, _input: &Value) {}

    /// A tool call returned
    async fn on_tool_done(
        &self,
        _task: &str,
        _tool: &str,
        _result: std::result::Result<&Value, &str>,
        _duration_ms: u64,
    ) {
    }
}

/// Handler that ignores every event
pub struct NoOpCrewEventHandler;

#[async_trait]
impl CrewEventHandler for NoOpCrewEventHandler {}

/// Forwards executor tool events to a crew handler, tagged with the task
pub(crate) struct TaskToolEvents {
    task: String,
    inner: Arc<dyn CrewEventHandler>,
}

impl TaskToolEvents {
    pub(crate) fn new(task: impl Into<String>, inner: Arc<dyn CrewEventHandler>) -> Self {
        Self {
            task: task.into(),
            inner,
        }
    }
}

#[async_trait]
impl ExecutorEventHandler for TaskToolEvents {
    async fn on_tool_start(&self, call: &ToolCall) {
        self.inner
            .on_tool_start(&self.task, &call.name, &call.arguments)
            .await;
    }

    async fn on_tool_done(
        &self,
        call: &ToolCall,
        result: std::result::Result<&Value, &str>,
        duration_ms: u64,
    ) {
        self.inner
            .on_tool_done(&self.task, &call.name, result, duration_ms)
            .await;
    }
}
