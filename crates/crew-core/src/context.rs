//! Per-run state shared by the agents of a crew
//!
//! A `Context` is created once per kickoff. It holds the run id, the inputs
//! the task templates are rendered with, the task currently executing, and
//! the token usage of every LLM call made for the run.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Token usage accumulated over a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageMetrics {
    /// Tokens sent to the model
    pub prompt_tokens: usize,
    /// Tokens generated by the model
    pub completion_tokens: usize,
    /// Number of completed LLM requests
    pub successful_requests: usize,
}

impl UsageMetrics {
    /// Prompt plus completion tokens
    pub fn total_tokens(&self) -> usize {
        self.prompt_tokens + self.completion_tokens
    }

    /// Fold another set of counters into this one
    pub fn add(&mut self, other: UsageMetrics) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.successful_requests += other.successful_requests;
    }
}

/// State of one crew run
///
/// # Example
///
/// ```
/// use crew_core::Context;
///
/// let mut ctx = Context::new("run-1").with_inputs([("company_stock", "IBM")]);
/// ctx.enter_task("data_collection");
///
/// assert_eq!(ctx.run_id(), "run-1");
/// assert_eq!(ctx.task(), Some("data_collection"));
/// assert_eq!(ctx.inputs()["company_stock"], "IBM");
/// ```
#[derive(Debug, Clone, Default)]
pub struct Context {
    run_id: String,
    task: Option<String>,
    inputs: BTreeMap<String, String>,
    usage: UsageMetrics,
}

impl Context {
    /// Start the context of run `run_id`
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            ..Self::default()
        }
    }

    /// Replace the kickoff inputs
    pub fn with_inputs<I, K, V>(mut self, inputs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.inputs = inputs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Task currently executing, if any
    pub fn task(&self) -> Option<&str> {
        self.task.as_deref()
    }

    /// Mark `task` as the one executing
    pub fn enter_task(&mut self, task: &str) {
        self.task = Some(task.to_string());
    }

    /// Kickoff inputs, ordered by name
    pub fn inputs(&self) -> &BTreeMap<String, String> {
        &self.inputs
    }

    pub fn record_usage(&mut self, usage: UsageMetrics) {
        self.usage.add(usage);
    }

    /// Usage accumulated so far
    pub fn usage(&self) -> UsageMetrics {
        self.usage
    }

    /// Context for a task running concurrently with the rest of the run
    ///
    /// The fork keeps the run id and inputs but counts usage from zero; the
    /// parent merges it back with [`Context::absorb`].
    pub fn fork(&self) -> Self {
        Self {
            run_id: self.run_id.clone(),
            task: None,
            inputs: self.inputs.clone(),
            usage: UsageMetrics::default(),
        }
    }

    /// Merge the usage counted by a fork
    pub fn absorb(&mut self, fork: &Context) {
        self.usage.add(fork.usage);
    }
}
