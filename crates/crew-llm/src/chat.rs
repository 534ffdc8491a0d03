//! Chat turns exchanged with a provider
//!
//! A conversation is a list of [`Message`]s. The assistant may answer with
//! text, with tool calls, or both; each call is answered by one
//! [`Message::Tool`] carrying the call id.

use serde::Deserialize;
use serde_json::Value;

/// A tool invocation requested by the model
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    /// Provider-assigned id, echoed back with the result
    pub id: String,
    pub name: String,
    /// Parsed JSON arguments
    pub arguments: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    User(String),
    Assistant {
        text: Option<String>,
        calls: Vec<ToolCall>,
    },
    /// Result of one tool call
    Tool {
        call_id: String,
        content: String,
        is_error: bool,
    },
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self::User(text.into())
    }

    /// A plain assistant answer
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::Assistant {
            text: Some(text.into()),
            calls: Vec::new(),
        }
    }

    /// Successful output of call `call_id`
    pub fn tool_output(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::Tool {
            call_id: call_id.into(),
            content: content.into(),
            is_error: false,
        }
    }

    /// Failure of call `call_id`, reported to the model
    pub fn tool_failure(call_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Tool {
            call_id: call_id.into(),
            content: reason.into(),
            is_error: true,
        }
    }

    /// Text written by the user or the assistant
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::User(text) => Some(text),
            Self::Assistant { text, .. } => text.as_deref(),
            Self::Tool { .. } => None,
        }
    }

    /// Tool calls requested by the assistant
    pub fn calls(&self) -> &[ToolCall] {
        match self {
            Self::Assistant { calls, .. } => calls,
            _ => &[],
        }
    }
}

/// A tool the model may call
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema of the arguments
    pub parameters: Value,
}

/// One chat turn sent to a provider
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: String,
    pub system: Option<String>,
    pub messages: Vec<Message>,
    /// Empty when the model must answer in text
    pub tools: Vec<ToolDefinition>,
    pub max_tokens: usize,
    pub temperature: Option<f32>,
}

impl CompletionRequest {
    /// Request for `model` with no system prompt or tools and 1024 output tokens
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            system: None,
            messages,
            tools: Vec::new(),
            max_tokens: 1024,
            temperature: None,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    /// Cap the reply length and set the sampling temperature
    pub fn with_sampling(mut self, max_tokens: usize, temperature: Option<f32>) -> Self {
        self.max_tokens = max_tokens;
        self.temperature = temperature;
        self
    }
}

/// Why the model stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    /// Answer complete
    Stop,
    /// Waiting for tool results
    ToolCalls,
    /// Cut off at the token limit
    Length,
}

/// Token counts for one request, named as OpenAI reports them
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct TokenUsage {
    #[serde(default)]
    pub prompt_tokens: usize,
    #[serde(default)]
    pub completion_tokens: usize,
}

/// The assistant's reply to a [`CompletionRequest`]
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// Always a [`Message::Assistant`]
    pub message: Message,
    pub finish: FinishReason,
    pub usage: TokenUsage,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_and_calls() {
        let reply = Message::Assistant {
            text: Some("Let me look that up".to_string()),
            calls: vec![ToolCall {
                id: "call_1".to_string(),
                name: "stock_data".to_string(),
                arguments: json!({"ticker": "IBM"}),
            }],
        };

        assert_eq!(reply.text(), Some("Let me look that up"));
        assert_eq!(reply.calls()[0].name, "stock_data");
        assert!(Message::user("hi").calls().is_empty());
    }

    #[test]
    fn test_tool_messages_have_no_text() {
        let failure = Message::tool_failure("call_1", "boom");
        assert_eq!(failure.text(), None);
        assert!(matches!(failure, Message::Tool { is_error: true, .. }));
        assert!(matches!(
            Message::tool_output("call_1", "42"),
            Message::Tool { is_error: false, .. }
        ));
    }

    #[test]
    fn test_request_defaults() {
        let request = CompletionRequest::new("gpt-4o-mini", vec![Message::user("Hello")])
            .with_system("You are a financial analyst")
            .with_sampling(2048, Some(0.7));

        assert_eq!(request.max_tokens, 2048);
        assert_eq!(request.temperature, Some(0.7));
        assert!(request.tools.is_empty());
    }

    #[test]
    fn test_usage_tolerates_missing_counts() {
        let usage: TokenUsage = serde_json::from_value(json!({"prompt_tokens": 12})).unwrap();
        assert_eq!(usage.prompt_tokens, 12);
        assert_eq!(usage.completion_tokens, 0);
    }
}
