//! Building tool argument schemas

use serde_json::{Map, Value, json};

/// JSON Schema of an object whose properties are scalar arguments
///
/// ```
/// use crew_tools::schema::InputSchema;
///
/// let schema = InputSchema::new()
///     .required("ticker", "string", "Stock ticker")
///     .optional("max_results", "integer", "How many hits")
///     .build();
///
/// assert_eq!(schema["required"], serde_json::json!(["ticker"]));
/// assert_eq!(schema["properties"]["max_results"]["type"], "integer");
/// ```
#[derive(Debug, Default)]
pub struct InputSchema {
    properties: Map<String, Value>,
    required: Vec<String>,
}

impl InputSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an argument the model must supply
    pub fn required(mut self, name: &str, kind: &str, description: &str) -> Self {
        self.required.push(name.to_string());
        self.optional(name, kind, description)
    }

    /// Add an argument the model may leave out
    pub fn optional(mut self, name: &str, kind: &str, description: &str) -> Self {
        self.properties.insert(
            name.to_string(),
            json!({ "type": kind, "description": description }),
        );
        self
    }

    pub fn build(self) -> Value {
        json!({
            "type": "object",
            "properties": self.properties,
            "required": self.required,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object() {
        let schema = InputSchema::new().build();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["required"], json!([]));
        assert_eq!(schema["properties"], json!({}));
    }

    #[test]
    fn test_required_and_optional() {
        let schema = InputSchema::new()
            .required("query", "string", "Search query")
            .optional("max_results", "integer", "Result count")
            .build();

        assert_eq!(schema["required"], json!(["query"]));
        assert_eq!(schema["properties"]["query"]["description"], "Search query");
        assert_eq!(schema["properties"]["max_results"]["type"], "integer");
    }
}
