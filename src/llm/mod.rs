//! Generation layer - the opaque model capability behind every handler
//!
//! This module provides:
//! - Message, tool and event types exchanged with the model
//! - The `Generator` trait and its error type
//! - `AnthropicClient`, a streaming Messages API backend
//! - `ScriptedGenerator`, a replaying backend for tests

pub mod anthropic;
pub mod client;
pub mod streaming;
pub mod types;

pub use anthropic::{AnthropicClient, AnthropicConfig};
pub use client::{EventStream, GenerationError, Generator, ScriptedGenerator};
pub use streaming::{StreamEvent, StreamParser, parse_sse_event};
pub use types::{
    ContentBlock, Event, GenerationRequest, Message, MessageContent, Role, ToolCall, ToolDefinition, ToolResult,
};
