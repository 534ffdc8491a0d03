//! Shared provider and tools for the agents of a crew

use crate::agent::ExecutorAgent;
use crate::executor::{AgentExecutor, ExecutorConfig};
use crew_core::{Error, Result};
use crew_llm::LLMProvider;
use crew_tools::ToolRegistry;
use std::sync::Arc;
use tracing::debug;

const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Owns the LLM provider and the registry every agent's tools come from
///
/// ```no_run
/// use crew_runtime::AgentRuntime;
/// use crew_llm::providers::OpenAIProvider;
/// use std::sync::Arc;
///
/// # fn example() -> crew_core::Result<()> {
/// let runtime = AgentRuntime::builder()
///     .provider(Arc::new(OpenAIProvider::from_env().unwrap()))
///     .default_model("gpt-4o-mini")
///     .build()?;
///
/// let researcher = runtime.create_agent(
///     runtime.executor_config("You are a market researcher."),
///     "Stock Market Researcher",
///     &["web_search", "scrape_website"],
/// )?;
/// # Ok(())
/// # }
/// ```
pub struct AgentRuntime {
    provider: Arc<dyn LLMProvider>,
    tools: Arc<ToolRegistry>,
    default_model: String,
}

impl AgentRuntime {
    pub fn builder() -> AgentRuntimeBuilder {
        AgentRuntimeBuilder::default()
    }

    /// Registry agents pick their tools from
    pub fn tools(&self) -> &Arc<ToolRegistry> {
        &self.tools
    }

    /// Executor settings for the runtime's model with `system_prompt`
    pub fn executor_config(&self, system_prompt: impl Into<String>) -> ExecutorConfig {
        ExecutorConfig {
            model: self.default_model.clone(),
            system_prompt: system_prompt.into(),
            ..ExecutorConfig::default()
        }
    }

    /// Create an agent restricted to the named tools
    ///
    /// Every name must be registered; an unknown one is a configuration error.
    pub fn create_agent<S: AsRef<str>>(
        &self,
        config: ExecutorConfig,
        name: impl Into<String>,
        tool_names: &[S],
    ) -> Result<ExecutorAgent> {
        let name = name.into();
        let tools = self.tools.subset(tool_names)?;
        debug!(agent = %name, tools = tools.len(), model = %config.model, "Creating agent");

        let executor = AgentExecutor::new(self.provider.clone(), Arc::new(tools), config);
        Ok(ExecutorAgent::new(executor, name))
    }
}

#[derive(Default)]
pub struct AgentRuntimeBuilder {
    provider: Option<Arc<dyn LLMProvider>>,
    default_model: Option<String>,
}

impl AgentRuntimeBuilder {
    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Model used by every agent, `gpt-4o-mini` if unset
    pub fn default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = Some(model.into());
        self
    }

    pub fn build(self) -> Result<AgentRuntime> {
        let provider = self
            .provider
            .ok_or_else(|| Error::InitializationFailed("Provider not set".to_string()))?;

        Ok(AgentRuntime {
            provider,
            tools: Arc::new(ToolRegistry::new()),
            default_model: self
                .default_model
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crew_core::{Agent, Context};
    use crew_llm::testing::{ScriptedProvider, text_response};

    #[test]
    fn test_builder_requires_provider() {
        let result = AgentRuntime::builder().build();
        assert!(matches!(result, Err(Error::InitializationFailed(_))));
    }

    #[test]
    fn test_executor_config_uses_runtime_model() {
        let runtime = AgentRuntime::builder()
            .provider(Arc::new(ScriptedProvider::new([])))
            .default_model("local-model")
            .build()
            .unwrap();

        let config = runtime.executor_config("You are an analyst.");
        assert_eq!(config.model, "local-model");
        assert_eq!(config.system_prompt, "You are an analyst.");
    }

    #[test]
    fn test_unknown_tool_is_configuration_error() {
        let runtime = AgentRuntime::builder()
            .provider(Arc::new(ScriptedProvider::new([])))
            .build()
            .unwrap();

        let result = runtime.create_agent(runtime.executor_config("x"), "agent", &["nope"]);
        assert!(matches!(result, Err(Error::Configuration(msg)) if msg.contains("nope")));
    }

    #[tokio::test]
    async fn test_created_agent_uses_default_model() {
        let provider = Arc::new(ScriptedProvider::new([text_response("done")]));
        let runtime = AgentRuntime::builder()
            .provider(provider.clone())
            .build()
            .unwrap();

        let agent = runtime
            .create_agent(runtime.executor_config("You read news."), "News Reader", &[] as &[&str])
            .unwrap();
        agent
            .process("Read".to_string(), &mut Context::default())
            .await
            .unwrap();

        assert_eq!(provider.requests()[0].model, DEFAULT_MODEL);
    }
}
