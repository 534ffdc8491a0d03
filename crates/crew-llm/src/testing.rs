//! Scripted provider for exercising agent loops without a network
//!
//! Enabled with the `testing` feature.

use crate::{
    CompletionRequest, CompletionResponse, FinishReason, LLMError, LLMProvider, Message, Result,
    TokenUsage, ToolCall,
};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

const SCRIPTED_USAGE: TokenUsage = TokenUsage {
    prompt_tokens: 10,
    completion_tokens: 5,
};

type Responder = Box<dyn Fn(&CompletionRequest) -> Result<CompletionResponse> + Send + Sync>;

enum Script {
    Queue(Mutex<VecDeque<Result<CompletionResponse>>>),
    Responder(Responder),
}

/// Provider that replays canned responses and records every request
pub struct ScriptedProvider {
    script: Script,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedProvider {
    /// Replay responses in order; an exhausted script is an error
    pub fn new(responses: impl IntoIterator<Item = CompletionResponse>) -> Self {
        Self::from_results(responses.into_iter().map(Ok))
    }

    /// Replay results in order, including errors
    pub fn from_results(results: impl IntoIterator<Item = Result<CompletionResponse>>) -> Self {
        Self {
            script: Script::Queue(Mutex::new(results.into_iter().collect())),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Compute each response from the request
    pub fn responding<F>(responder: F) -> Self
    where
        F: Fn(&CompletionRequest) -> Result<CompletionResponse> + Send + Sync + 'static,
    {
        Self {
            script: Script::Responder(Box::new(responder)),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let response = match &self.script {
            Script::Queue(queue) => queue
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .pop_front()
                .unwrap_or_else(|| {
                    Err(LLMError::UnexpectedResponse("script exhausted".to_string()))
                }),
            Script::Responder(responder) => responder(&request),
        };

        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);
        response
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// A final text answer costing 10 prompt and 5 completion tokens
pub fn text_response(text: impl Into<String>) -> CompletionResponse {
    CompletionResponse {
        message: Message::assistant(text),
        finish: FinishReason::Stop,
        usage: SCRIPTED_USAGE,
    }
}

/// A single tool call costing 10 prompt and 5 completion tokens
pub fn tool_call_response(
    id: impl Into<String>,
    name: impl Into<String>,
    arguments: serde_json::Value,
) -> CompletionResponse {
    CompletionResponse {
        message: Message::Assistant {
            text: None,
            calls: vec![ToolCall {
                id: id.into(),
                name: name.into(),
                arguments,
            }],
        },
        finish: FinishReason::ToolCalls,
        usage: SCRIPTED_USAGE,
    }
}
