//! The tool-calling loop behind every crew agent
//!
//! Each iteration sends the conversation to the model. Tool calls in the
//! reply are executed and their results appended; a reply without calls is
//! the answer. When `max_iterations` replies in a row asked for tools, the
//! model is asked once more, without tools, for its final answer.

use async_trait::async_trait;
use crew_core::{Error, Result, UsageMetrics};
use crew_llm::{
    CompletionRequest, CompletionResponse, FinishReason, LLMError, LLMProvider, Message,
    TokenUsage, ToolCall, ToolDefinition,
};
use crew_tools::ToolRegistry;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

const FINAL_ANSWER_PROMPT: &str = "You have used all available steps. Stop using tools and give \
your best complete final answer now, based on the information gathered so far.";

/// Tool call notifications, for printing traces
#[async_trait]
pub trait ExecutorEventHandler: Send + Sync {
    async fn on_tool_start(&self, _call: &ToolCall) {}

    /// `result` is the tool's value or the error text the model will see
    async fn on_tool_done(
        &self,
        _call: &ToolCall,
        _result: std::result::Result<&Value, &str>,
        _duration_ms: u64,
    ) {
    }
}

pub struct NoOpEventHandler;

#[async_trait]
impl ExecutorEventHandler for NoOpEventHandler {}

#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub model: String,
    pub system_prompt: String,
    /// Replies that may request tools before a final answer is forced
    pub max_iterations: usize,
    pub max_tokens: usize,
    pub temperature: Option<f32>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            system_prompt: "You are a helpful assistant.".to_string(),
            max_iterations: 10,
            max_tokens: 4096,
            temperature: Some(0.7),
        }
    }
}

/// Final answer of a loop and what it cost
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutorOutput {
    pub text: String,
    /// Summed over every completion of the loop
    pub usage: UsageMetrics,
    /// Completions made, including a forced final answer
    pub iterations: usize,
}

pub struct AgentExecutor {
    provider: Arc<dyn LLMProvider>,
    tools: Arc<ToolRegistry>,
    config: ExecutorConfig,
}

impl AgentExecutor {
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        tools: Arc<ToolRegistry>,
        config: ExecutorConfig,
    ) -> Self {
        Self {
            provider,
            tools,
            config,
        }
    }

    /// Answer `prompt`, calling tools as the model asks
    ///
    /// Tool failures, including calls to tools this agent lacks, go back to
    /// the model as error results. Provider failures end the loop.
    pub async fn run(&self, prompt: String, events: &dyn ExecutorEventHandler) -> Result<ExecutorOutput> {
        let definitions = self.definitions();
        let mut conversation = vec![Message::user(prompt)];
        let mut usage = UsageMetrics::default();

        for iteration in 1..=self.config.max_iterations {
            let reply = self.complete(&conversation, definitions.clone()).await?;
            usage.add(metrics(reply.usage));
            debug!(
                iteration,
                finish = ?reply.finish,
                calls = reply.message.calls().len(),
                "Model replied"
            );

            if reply.message.calls().is_empty() {
                if reply.finish == FinishReason::Length {
                    warn!(iteration, "Answer cut off at the token limit");
                }
                info!(iteration, "Agent answered");
                return Ok(ExecutorOutput {
                    text: answer_text(&reply),
                    usage,
                    iterations: iteration,
                });
            }

            let results = self.call_tools(reply.message.calls(), events).await;
            conversation.push(reply.message);
            conversation.extend(results);
        }

        warn!(
            max_iterations = self.config.max_iterations,
            "Iteration budget spent, asking for a final answer"
        );
        conversation.push(Message::user(FINAL_ANSWER_PROMPT));
        let reply = self.complete(&conversation, Vec::new()).await?;
        usage.add(metrics(reply.usage));

        Ok(ExecutorOutput {
            text: answer_text(&reply),
            usage,
            iterations: self.config.max_iterations + 1,
        })
    }

    async fn complete(
        &self,
        conversation: &[Message],
        tools: Vec<ToolDefinition>,
    ) -> Result<CompletionResponse> {
        let request = CompletionRequest::new(&self.config.model, conversation.to_vec())
            .with_system(&self.config.system_prompt)
            .with_tools(tools)
            .with_sampling(self.config.max_tokens, self.config.temperature);

        self.provider.complete(request).await.map_err(engine_error)
    }

    fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .list_tools()
            .iter()
            .map(|tool| ToolDefinition {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                parameters: tool.input_schema(),
            })
            .collect()
    }

    async fn call_tools(&self, calls: &[ToolCall], events: &dyn ExecutorEventHandler) -> Vec<Message> {
        let mut results = Vec::with_capacity(calls.len());

        for call in calls {
            info!(tool = %call.name, call_id = %call.id, "Calling tool");
            events.on_tool_start(call).await;

            let started = Instant::now();
            let outcome = match self.tools.get(&call.name) {
                Some(tool) => tool.execute(call.arguments.clone()).await,
                None => Err(Error::ProcessingFailed(format!("no tool named '{}'", call.name))),
            };
            let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

            match outcome {
                Ok(value) => {
                    let text = match &value {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    info!(tool = %call.name, duration_ms, result_length = text.len(), "Tool returned");
                    events.on_tool_done(call, Ok(&value), duration_ms).await;
                    results.push(Message::tool_output(&call.id, text));
                }
                Err(e) => {
                    let reason = format!("Error: {e}");
                    warn!(tool = %call.name, duration_ms, error = %e, "Tool failed");
                    events.on_tool_done(call, Err(&reason), duration_ms).await;
                    results.push(Message::tool_failure(&call.id, reason));
                }
            }
        }

        results
    }
}

/// Permanent provider failures are configuration errors, so they are not retried
fn engine_error(err: LLMError) -> Error {
    if err.is_permanent() {
        Error::Configuration(err.to_string())
    } else {
        Error::ProcessingFailed(err.to_string())
    }
}

fn metrics(usage: TokenUsage) -> UsageMetrics {
    UsageMetrics {
        prompt_tokens: usage.prompt_tokens,
        completion_tokens: usage.completion_tokens,
        successful_requests: 1,
    }
}

fn answer_text(reply: &CompletionResponse) -> String {
    reply.message.text().unwrap_or_default().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crew_llm::testing::{ScriptedProvider, text_response, tool_call_response};
    use crew_tools::Tool;
    use serde_json::json;
    use std::sync::Mutex;

    struct QuoteTool;

    #[async_trait]
    impl Tool for QuoteTool {
        async fn execute(&self, params: Value) -> Result<Value> {
            match params["ticker"].as_str() {
                Some("IBM") => Ok(json!("Stock Data for IBM:\nOpen Price: 100.0")),
                _ => Err(Error::ProcessingFailed("unknown ticker".to_string())),
            }
        }

        fn name(&self) -> &str {
            "stock_data"
        }

        fn description(&self) -> &str {
            "Fetch stock data"
        }

        fn input_schema(&self) -> Value {
            json!({"type": "object", "properties": {"ticker": {"type": "string"}}})
        }
    }

    #[derive(Default)]
    struct RecordingHandler {
        events: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ExecutorEventHandler for RecordingHandler {
        async fn on_tool_start(&self, call: &ToolCall) {
            self.events.lock().unwrap().push(format!("start:{}", call.name));
        }

        async fn on_tool_done(
            &self,
            call: &ToolCall,
            result: std::result::Result<&Value, &str>,
            _duration_ms: u64,
        ) {
            let status = if result.is_ok() { "ok" } else { "err" };
            self.events
                .lock()
                .unwrap()
                .push(format!("done:{}:{status}", call.name));
        }
    }

    fn executor(provider: Arc<ScriptedProvider>, max_iterations: usize) -> AgentExecutor {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(QuoteTool));

        AgentExecutor::new(
            provider,
            Arc::new(registry),
            ExecutorConfig {
                system_prompt: "You collect stock data.".to_string(),
                max_iterations,
                ..ExecutorConfig::default()
            },
        )
    }

    #[tokio::test]
    async fn test_tool_loop_accumulates_usage() {
        let provider = Arc::new(ScriptedProvider::new([
            tool_call_response("call_1", "stock_data", json!({"ticker": "IBM"})),
            text_response("IBM opened at 100.0"),
        ]));
        let handler = RecordingHandler::default();

        let output = executor(provider.clone(), 5)
            .run("Collect IBM".to_string(), &handler)
            .await
            .unwrap();

        assert_eq!(output.text, "IBM opened at 100.0");
        assert_eq!(output.iterations, 2);
        assert_eq!(output.usage.total_tokens(), 30);
        assert_eq!(output.usage.successful_requests, 2);

        let requests = provider.requests();
        assert_eq!(requests[0].system.as_deref(), Some("You collect stock data."));
        assert_eq!(requests[0].tools.len(), 1);
        assert_eq!(requests[0].tools[0].name, "stock_data");
        assert_eq!(requests[1].messages.len(), 3);
        assert_eq!(
            requests[1].messages[2],
            Message::tool_output("call_1", "Stock Data for IBM:\nOpen Price: 100.0")
        );

        let events = handler.events.lock().unwrap().clone();
        assert_eq!(events, ["start:stock_data", "done:stock_data:ok"]);
    }

    #[tokio::test]
    async fn test_tool_errors_go_back_to_model() {
        let provider = Arc::new(ScriptedProvider::new([
            tool_call_response("call_1", "stock_data", json!({"ticker": "NOPE"})),
            tool_call_response("call_2", "missing_tool", json!({})),
            text_response("No data available"),
        ]));

        let output = executor(provider.clone(), 5)
            .run("Collect NOPE".to_string(), &NoOpEventHandler)
            .await
            .unwrap();

        assert_eq!(output.text, "No data available");
        let requests = provider.requests();
        match requests[1].messages.last().unwrap() {
            Message::Tool {
                call_id,
                content,
                is_error,
            } => {
                assert_eq!(call_id, "call_1");
                assert!(content.contains("unknown ticker"));
                assert!(*is_error);
            }
            other => panic!("unexpected message: {other:?}"),
        }
        assert!(matches!(
            requests[2].messages.last().unwrap(),
            Message::Tool { content, is_error: true, .. } if content.contains("missing_tool")
        ));
    }

    #[tokio::test]
    async fn test_max_iterations_forces_final_answer() {
        let provider = Arc::new(ScriptedProvider::new([
            tool_call_response("call_1", "stock_data", json!({"ticker": "IBM"})),
            tool_call_response("call_2", "stock_data", json!({"ticker": "IBM"})),
            text_response("Best effort answer"),
        ]));

        let output = executor(provider.clone(), 2)
            .run("Collect IBM".to_string(), &NoOpEventHandler)
            .await
            .unwrap();

        assert_eq!(output.text, "Best effort answer");
        assert_eq!(output.iterations, 3);
        assert_eq!(output.usage.successful_requests, 3);
        let last = provider.requests().pop().unwrap();
        assert!(last.tools.is_empty());
        assert_eq!(last.messages.last().unwrap().text(), Some(FINAL_ANSWER_PROMPT));
    }

    #[tokio::test]
    async fn test_transient_provider_failure_is_processing_error() {
        let provider = Arc::new(ScriptedProvider::from_results([Err(LLMError::Status {
            status: 503,
            body: "overloaded".to_string(),
        })]));

        let result = executor(provider, 3)
            .run("hi".to_string(), &NoOpEventHandler)
            .await;

        let err = result.unwrap_err();
        assert!(matches!(err, Error::ProcessingFailed(ref msg) if msg.contains("503")));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_auth_failure_is_configuration_error() {
        let provider = Arc::new(ScriptedProvider::from_results([Err(LLMError::Unauthorized)]));

        let err = executor(provider, 3)
            .run("hi".to_string(), &NoOpEventHandler)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Configuration(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_unknown_model_is_configuration_error() {
        let err = engine_error(LLMError::UnknownModel("gpt-x".to_string()));
        assert!(matches!(err, Error::Configuration(msg) if msg.contains("gpt-x")));
    }
}
