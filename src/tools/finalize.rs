//! finalize tool - the only way a handler's turn ends

use async_trait::async_trait;
use serde_json::Value;

use super::{Tool, ToolContext, ToolError, ToolOutput, required_str};
use crate::error::Result;

/// Reserved tool name
pub const FINALIZE_TOOL: &str = "finalize";

pub struct FinalizeTool;

impl FinalizeTool {
    /// Extract the answer from finalize arguments
    pub fn answer(input: &Value) -> std::result::Result<String, ToolError> {
        let answer = required_str(input, FINALIZE_TOOL, "final_answer")?;
        if answer.trim().is_empty() {
            return Err(ToolError::invalid(FINALIZE_TOOL, "final_answer must not be empty"));
        }
        Ok(answer.to_string())
    }
}

#[async_trait]
impl Tool for FinalizeTool {
    fn name(&self) -> &'static str {
        FINALIZE_TOOL
    }

    fn description(&self) -> &'static str {
        "Deliver the complete, formatted answer to the user. Must be called exactly once, and nothing is shown to the user except this argument."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "final_answer": {
                    "type": "string",
                    "description": "The full answer shown to the user"
                }
            },
            "required": ["final_answer"]
        })
    }

    async fn execute(&self, input: Value, _ctx: &ToolContext) -> Result<ToolOutput> {
        Ok(ToolOutput::success(Self::answer(&input)?))
    }
}
