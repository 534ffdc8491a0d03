//! Chat-completion client layer for the crew engine
//!
//! [`LLMProvider`] is the only way the engine talks to a model. Requests and
//! replies use the small chat vocabulary in [`chat`]; [`providers`] holds the
//! OpenAI-compatible implementation.

pub mod chat;
pub mod error;
pub mod provider;
pub mod providers;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use chat::{
    CompletionRequest, CompletionResponse, FinishReason, Message, TokenUsage, ToolCall,
    ToolDefinition,
};
pub use error::{LLMError, Result};
pub use provider::LLMProvider;
