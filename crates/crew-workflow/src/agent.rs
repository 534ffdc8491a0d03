//! Agent definitions

use serde::{Deserialize, Serialize};

/// Declarative description of a crew member
///
/// The system prompt handed to the model is derived from the role, goal and
/// backstory. Tools are referenced by registry name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSpec {
    /// Role, also the agent's unique name within a crew
    pub role: String,
    /// What the agent is trying to achieve
    pub goal: String,
    /// Persona text
    pub backstory: String,
    /// Names of the tools this agent may call
    pub tools: Vec<String>,
    /// Maximum LLM round trips per task attempt
    pub max_iter: usize,
    /// Whether the agent may hand work to other agents
    pub allow_delegation: bool,
    /// Time limit for one task attempt, in seconds
    pub max_execution_time: Option<u64>,
    /// Extra attempts after a failed one
    pub max_retry_limit: usize,
}

impl AgentSpec {
    /// Create an agent with no tools, 20 iterations and 2 retries
    pub fn new(
        role: impl Into<String>,
        goal: impl Into<String>,
        backstory: impl Into<String>,
    ) -> Self {
        Self {
            role: role.into(),
            goal: goal.into(),
            backstory: backstory.into(),
            tools: Vec::new(),
            max_iter: 20,
            allow_delegation: false,
            max_execution_time: None,
            max_retry_limit: 2,
        }
    }

    /// Set the tool names
    pub fn with_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tools = tools.into_iter().map(Into::into).collect();
        self
    }

    /// Set the iteration budget
    pub fn max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Allow or forbid delegation
    pub fn allow_delegation(mut self, allow: bool) -> Self {
        self.allow_delegation = allow;
        self
    }

    /// Limit each task attempt to `seconds`
    pub fn max_execution_time(mut self, seconds: u64) -> Self {
        self.max_execution_time = Some(seconds);
        self
    }

    /// Set the number of retries after a failed attempt
    pub fn max_retry_limit(mut self, retries: usize) -> Self {
        self.max_retry_limit = retries;
        self
    }

    /// System prompt derived from role, goal and backstory
    pub fn system_prompt(&self) -> String {
        let mut prompt = format!(
            "You are {}. {}\nYour personal goal is: {}",
            self.role, self.backstory, self.goal
        );
        if !self.tools.is_empty() {
            prompt.push_str("\nUse the tools available to you when they help.");
        }
        prompt
    }
}
