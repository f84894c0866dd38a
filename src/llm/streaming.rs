//! Streaming support for Anthropic responses.
//!
//! Decodes server-sent `data:` payloads into `StreamEvent`s and folds them into
//! the crate's `Event` sequence: text deltas pass through as partial text,
//! tool_use blocks are buffered until their `content_block_stop`.

use serde::Deserialize;
use serde_json::Value;

use super::client::GenerationError;
use super::types::{Event, ToolCall};

/// Events received during streaming from the Anthropic API.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Start of message
    MessageStart {
        #[serde(default)]
        message: Value,
    },
    /// A new content block begins
    ContentBlockStart { index: u32, content_block: BlockStart },
    /// Incremental content for the block at `index`
    ContentBlockDelta { index: u32, delta: BlockDelta },
    /// End of a content block
    ContentBlockStop { index: u32 },
    /// Message delta (stop reason, usage)
    MessageDelta {
        #[serde(default)]
        delta: Value,
    },
    /// Message complete
    MessageStop,
    /// Keep-alive
    Ping,
    /// Error event
    Error { error: ApiErrorDetail },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockStart {
    Text {
        #[serde(default)]
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockDelta {
    TextDelta { text: String },
    InputJsonDelta { partial_json: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ApiErrorDetail {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub message: String,
}

/// Parse one SSE `data:` payload into a StreamEvent.
///
/// Unknown event types and keep-alive noise yield `None`.
pub fn parse_sse_event(data: &str) -> Option<StreamEvent> {
    if data.is_empty() || data == "[DONE]" {
        return None;
    }

    serde_json::from_str(data).ok()
}

/// Tool_use block being assembled from JSON fragments
#[derive(Debug)]
struct PendingTool {
    index: u32,
    id: String,
    name: String,
    input: String,
}

/// State tracker for one streamed model step.
#[derive(Debug, Default)]
pub struct StreamParser {
    pending_tool: Option<PendingTool>,
    finished: bool,
}

impl StreamParser {
    /// Create a new stream parser.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `message_stop` has been seen
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Feed one raw SSE payload
    pub fn process_data(&mut self, data: &str) -> Result<Vec<Event>, GenerationError> {
        match parse_sse_event(data) {
            Some(event) => self.process_event(event),
            None => Ok(Vec::new()),
        }
    }

    /// Process a stream event and emit crate events.
    pub fn process_event(&mut self, event: StreamEvent) -> Result<Vec<Event>, GenerationError> {
        let mut events = Vec::new();

        match event {
            StreamEvent::ContentBlockStart { index, content_block } => match content_block {
                BlockStart::Text { text } if !text.is_empty() => events.push(Event::PartialText(text)),
                BlockStart::ToolUse { id, name } => {
                    self.pending_tool = Some(PendingTool {
                        index,
                        id,
                        name,
                        input: String::new(),
                    });
                }
                _ => {}
            },
            StreamEvent::ContentBlockDelta { index, delta } => match delta {
                BlockDelta::TextDelta { text } => events.push(Event::PartialText(text)),
                BlockDelta::InputJsonDelta { partial_json } => {
                    if let Some(tool) = self.pending_tool.as_mut().filter(|t| t.index == index) {
                        tool.input.push_str(&partial_json);
                    }
                }
                BlockDelta::Other => {}
            },
            StreamEvent::ContentBlockStop { index } => {
                if self.pending_tool.as_ref().is_some_and(|t| t.index == index)
                    && let Some(tool) = self.pending_tool.take()
                {
                    let arguments = if tool.input.trim().is_empty() {
                        Value::Object(Default::default())
                    } else {
                        serde_json::from_str(&tool.input)?
                    };
                    events.push(Event::ToolRequest(ToolCall::new(tool.id, tool.name, arguments)));
                }
            }
            StreamEvent::MessageStop => {
                self.finished = true;
                events.push(Event::TurnComplete);
            }
            StreamEvent::Error { error } => {
                let status = match error.kind.as_str() {
                    "overloaded_error" => 529,
                    "rate_limit_error" => 429,
                    "invalid_request_error" => 400,
                    _ => 500,
                };
                return Err(GenerationError::ApiError {
                    status,
                    message: error.message,
                });
            }
            StreamEvent::MessageStart { .. } | StreamEvent::MessageDelta { .. } | StreamEvent::Ping => {}
        }

        Ok(events)
    }
}
