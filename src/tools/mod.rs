//! Tool system for handler interactions
//!
//! Every capability a handler can invoke mid-turn implements `Tool` and is
//! registered by name in a `ToolRegistry`. The registry is built once at
//! startup and shared read-only afterwards.

mod bmi;
mod clock;
mod context;
mod faq;
mod finalize;
mod registry;
mod search;

pub use bmi::{BmiCategory, BmiReading, BmiTool, calculate_bmi};
pub use clock::{ClockTool, describe_moment};
pub use context::ToolContext;
pub use faq::{FaqTool, html_to_text};
pub use finalize::{FINALIZE_TOOL, FinalizeTool};
pub use registry::ToolRegistry;
pub use search::{HttpSearch, SearchBackend, SearchProvider, WebSearchTool};

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::llm::ToolDefinition;

/// A tool that can be called by the model
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name (matches the model's tool_use name)
    fn name(&self) -> &'static str;

    /// Human-readable description
    fn description(&self) -> &'static str;

    /// JSON Schema for input parameters
    fn input_schema(&self) -> Value;

    /// Execute the tool
    async fn execute(&self, input: Value, ctx: &ToolContext) -> Result<ToolOutput>;

    /// Definition advertised to the model
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(self.name(), self.description(), self.input_schema())
    }
}

/// Result from tool execution
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    pub content: String,
    pub is_error: bool,
}

impl ToolOutput {
    pub fn success(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
        }
    }

    /// A recovered failure: reported to the model as text, not raised
    pub fn error(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: true,
        }
    }
}

/// Errors that can occur during tool execution
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Unknown tool: {name}")]
    UnknownTool { name: String },

    #[error("Invalid argument for {tool}: {message}")]
    InvalidArgument { tool: String, message: String },

    #[error("Fetch failed for {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("Search unavailable: {reason}")]
    SearchUnavailable { reason: String },
}

impl ToolError {
    pub fn invalid(tool: &str, message: impl Into<String>) -> Self {
        ToolError::InvalidArgument {
            tool: tool.to_string(),
            message: message.into(),
        }
    }
}

/// Required string argument
pub(crate) fn required_str<'a>(input: &'a Value, tool: &str, key: &str) -> std::result::Result<&'a str, ToolError> {
    match input.get(key) {
        Some(Value::String(s)) => Ok(s),
        Some(other) => Err(ToolError::invalid(tool, format!("{} must be a string, got {}", key, other))),
        None => Err(ToolError::invalid(tool, format!("{} is required", key))),
    }
}

/// Required numeric argument; numeric strings are coerced
pub(crate) fn required_f64(input: &Value, tool: &str, key: &str) -> std::result::Result<f64, ToolError> {
    let value = input
        .get(key)
        .ok_or_else(|| ToolError::invalid(tool, format!("{} is required", key)))?;

    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    number
        .filter(|n| n.is_finite())
        .ok_or_else(|| ToolError::invalid(tool, format!("{} must be a number, got {}", key, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_output_success() {
        let result = ToolOutput::success("Operation completed");
        assert_eq!(result.content, "Operation completed");
        assert!(!result.is_error);
    }

    #[test]
    fn test_tool_output_error() {
        let result = ToolOutput::error("Something went wrong");
        assert!(result.is_error);
    }

    #[test]
    fn test_required_str() {
        let input = json!({"query": "refund policy", "count": 3});
        assert_eq!(required_str(&input, "browse_faq", "query").unwrap(), "refund policy");
        assert!(matches!(
            required_str(&input, "browse_faq", "count"),
            Err(ToolError::InvalidArgument { .. })
        ));
        assert!(required_str(&input, "browse_faq", "missing").is_err());
    }

    #[test]
    fn test_required_f64_coerces_strings() {
        let input = json!({"a": 70, "b": "1.75", "c": "tall", "d": null});
        assert_eq!(required_f64(&input, "calculate_bmi", "a").unwrap(), 70.0);
        assert_eq!(required_f64(&input, "calculate_bmi", "b").unwrap(), 1.75);

        let err = required_f64(&input, "calculate_bmi", "c").unwrap_err();
        assert!(err.to_string().contains("must be a number"));
        assert!(required_f64(&input, "calculate_bmi", "d").is_err());
        assert!(required_f64(&input, "calculate_bmi", "e").is_err());
    }

    #[test]
    fn test_tool_error_display() {
        let err = ToolError::Fetch {
            url: "https://example.com/faqs/".to_string(),
            reason: "HTTP 503".to_string(),
        };
        assert_eq!(err.to_string(), "Fetch failed for https://example.com/faqs/: HTTP 503");
    }
}
