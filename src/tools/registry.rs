//! Tool registry - name-keyed lookup of a handler's tools

use std::collections::HashMap;

use log::{debug, warn};

use super::{Tool, ToolContext, ToolError, ToolOutput};
use crate::error::{ConciergeError, Result};
use crate::llm::{ToolCall, ToolDefinition, ToolResult};

/// Tools available to one handler, listed in registration order
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
    order: Vec<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool; a later registration under the same name replaces it
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), tool).is_none() {
            self.order.push(name);
        }
    }

    /// Builder form of `register`
    pub fn with(mut self, tool: impl Tool + 'static) -> Self {
        self.register(Box::new(tool));
        self
    }

    /// Get tool definitions for the generation request
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|t| t.definition())
            .collect()
    }

    /// Invoke a tool call
    ///
    /// Unknown names and bad arguments fail the call. Fetch and search
    /// failures are recovered into an error result the model can read.
    pub async fn invoke(&self, call: &ToolCall, ctx: &ToolContext) -> Result<ToolResult> {
        let tool = self.tools.get(&call.name).ok_or_else(|| ToolError::UnknownTool {
            name: call.name.clone(),
        })?;

        debug!("ToolRegistry::invoke: session={} tool={} args={}", ctx.session_id, call.name, call.arguments);

        let output = match tool.execute(call.arguments.clone(), ctx).await {
            Ok(output) => output,
            Err(ConciergeError::Tool(e @ (ToolError::Fetch { .. } | ToolError::SearchUnavailable { .. }))) => {
                warn!("ToolRegistry::invoke: {} recovered: {}", call.name, e);
                ToolOutput::error(e.to_string())
            }
            Err(e) => return Err(e),
        };

        Ok(ToolResult {
            tool_use_id: call.id.clone(),
            tool_name: call.name.clone(),
            output: output.content,
            is_error: output.is_error,
        })
    }

    /// Check if a tool exists
    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Get the list of tool names
    pub fn tool_names(&self) -> Vec<&str> {
        self.order.iter().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry").field("tools", &self.order).finish()
    }
}
