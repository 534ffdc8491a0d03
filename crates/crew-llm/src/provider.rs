//! Provider trait

use crate::{CompletionRequest, CompletionResponse, Result};
use async_trait::async_trait;

/// A chat model endpoint
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Send one chat turn and wait for the reply
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;

    /// Short name used in logs
    fn name(&self) -> &str;
}
