//! The tool seam

use async_trait::async_trait;
use crew_core::Result;
use serde_json::Value;

/// A function an agent may ask the model to call
///
/// The name, description and schema are sent to the model verbatim, so they
/// are written for the model to read.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Run with arguments shaped like [`Tool::input_schema`]
    ///
    /// String results reach the model as-is; other values as JSON.
    async fn execute(&self, params: Value) -> Result<Value>;

    /// Unique within a registry
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON Schema of the arguments, see [`crate::schema::InputSchema`]
    fn input_schema(&self) -> Value;
}
