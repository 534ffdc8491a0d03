//! The agent seam between the crew and the LLM runtime

use crate::{Context, Result};
use async_trait::async_trait;

/// Something that turns a rendered prompt into an answer
///
/// Usage is recorded on the [`Context`], which keeps the trait
/// string-in, string-out.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Answer `input` on behalf of the run in `context`
    async fn process(&self, input: String, context: &mut Context) -> Result<String>;

    /// Role of the agent within its crew
    fn name(&self) -> &str;
}
