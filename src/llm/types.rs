//! Message and event types exchanged with the generation capability
//!
//! Messages mirror the Anthropic content-block layout so a handler's working
//! context (tool_use / tool_result pairs) can be sent back verbatim.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Role in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A message in the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: MessageContent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },

    #[serde(rename = "tool_use")]
    ToolUse { id: String, name: String, input: Value },

    #[serde(rename = "tool_result")]
    ToolResult {
        tool_use_id: String,
        content: String,
        is_error: bool,
    },
}

impl Message {
    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Text(content.into()),
        }
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: MessageContent::Text(content.into()),
        }
    }

    /// Assistant message recording a tool request (plus any text that preceded it)
    pub fn tool_use(preamble: &str, call: &ToolCall) -> Self {
        let mut blocks = Vec::with_capacity(2);
        if !preamble.is_empty() {
            blocks.push(ContentBlock::Text {
                text: preamble.to_string(),
            });
        }
        blocks.push(ContentBlock::ToolUse {
            id: call.id.clone(),
            name: call.name.clone(),
            input: call.arguments.clone(),
        });
        Self {
            role: Role::Assistant,
            content: MessageContent::Blocks(blocks),
        }
    }

    /// User message carrying a tool result back to the model
    pub fn tool_result(result: &ToolResult) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Blocks(vec![ContentBlock::ToolResult {
                tool_use_id: result.tool_use_id.clone(),
                content: result.output.clone(),
                is_error: result.is_error,
            }]),
        }
    }

    /// Plain text of the message, if it is a text message
    pub fn text(&self) -> Option<&str> {
        match &self.content {
            MessageContent::Text(text) => Some(text),
            MessageContent::Blocks(_) => None,
        }
    }
}

/// Tool definition for the generation capability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

impl ToolDefinition {
    /// Create a new tool definition
    pub fn new(name: impl Into<String>, description: impl Into<String>, input_schema: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }

    /// Convert to Anthropic API schema format
    pub fn to_anthropic_schema(&self) -> Value {
        serde_json::json!({
            "name": self.name,
            "description": self.description,
            "input_schema": self.input_schema
        })
    }
}

/// A tool invocation requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

impl ToolCall {
    /// Create a new tool call
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// Output of one tool invocation, fed back to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub tool_use_id: String,
    pub tool_name: String,
    pub output: String,
    pub is_error: bool,
}

/// One unit of the generation capability's output sequence
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Free text fragment
    PartialText(String),
    /// The model wants a tool invoked
    ToolRequest(ToolCall),
    /// A tool has produced its output
    ToolResult(ToolResult),
    /// End of this model step
    TurnComplete,
}

/// Everything needed for one model step
#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerationRequest {
    pub system: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl GenerationRequest {
    /// Create a new request with system instructions
    pub fn new(system: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            ..Default::default()
        }
    }

    /// Append messages to the request
    pub fn with_messages(mut self, messages: impl IntoIterator<Item = Message>) -> Self {
        self.messages.extend(messages);
        self
    }

    /// Add tools to the request
    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    /// Set max tokens
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Whether a tool with this name is offered in the request
    pub fn offers_tool(&self, name: &str) -> bool {
        self.tools.iter().any(|t| t.name == name)
    }

    /// Text of the most recent plain-text user message
    pub fn last_user_text(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .filter(|m| m.role == Role::User)
            .find_map(Message::text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_role_serialization() {
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
        assert_eq!(serde_json::to_string(&Role::Assistant).unwrap(), "\"assistant\"");
    }

    #[test]
    fn test_text_message_serializes_as_string() {
        let msg = Message::user("Hello");
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["role"], "user");
        assert_eq!(value["content"], "Hello");
    }

    #[test]
    fn test_tool_use_message_blocks() {
        let call = ToolCall::new("toolu_1", "calculate_bmi", json!({"weight_kg": 70, "height_m": 1.75}));
        let msg = Message::tool_use("Let me compute that.", &call);
        let value = serde_json::to_value(&msg).unwrap();

        assert_eq!(value["role"], "assistant");
        assert_eq!(value["content"][0]["type"], "text");
        assert_eq!(value["content"][1]["type"], "tool_use");
        assert_eq!(value["content"][1]["name"], "calculate_bmi");
        assert_eq!(value["content"][1]["input"]["height_m"], 1.75);
    }

    #[test]
    fn test_tool_use_without_preamble_has_single_block() {
        let call = ToolCall::new("toolu_1", "get_current_day_and_time", json!({}));
        let msg = Message::tool_use("", &call);
        match msg.content {
            MessageContent::Blocks(blocks) => assert_eq!(blocks.len(), 1),
            MessageContent::Text(_) => panic!("expected blocks"),
        }
    }

    #[test]
    fn test_tool_result_message() {
        let result = ToolResult {
            tool_use_id: "toolu_1".to_string(),
            tool_name: "browse_faq".to_string(),
            output: "Error retrieving FAQ content".to_string(),
            is_error: true,
        };
        let value = serde_json::to_value(Message::tool_result(&result)).unwrap();
        assert_eq!(value["role"], "user");
        assert_eq!(value["content"][0]["type"], "tool_result");
        assert_eq!(value["content"][0]["tool_use_id"], "toolu_1");
        assert_eq!(value["content"][0]["is_error"], true);
    }

    #[test]
    fn test_tool_definition_to_anthropic_schema() {
        let tool = ToolDefinition::new(
            "finalize",
            "Return the final answer",
            json!({
                "type": "object",
                "properties": { "final_answer": { "type": "string" } },
                "required": ["final_answer"]
            }),
        );

        let schema = tool.to_anthropic_schema();
        assert_eq!(schema["name"], "finalize");
        assert!(schema["input_schema"].is_object());
    }

    #[test]
    fn test_request_builder() {
        let req = GenerationRequest::new("route")
            .with_messages(vec![Message::user("first"), Message::assistant("reply"), Message::user("second")])
            .with_max_tokens(512);

        assert_eq!(req.system, "route");
        assert_eq!(req.messages.len(), 3);
        assert_eq!(req.max_tokens, Some(512));
        assert_eq!(req.last_user_text(), Some("second"));
        assert!(!req.offers_tool("finalize"));
    }
}
