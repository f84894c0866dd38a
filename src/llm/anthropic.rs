//! Anthropic API client implementation
//!
//! Implements the `Generator` trait against the Messages API using
//! server-sent events, so each model step is consumed lazily.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use log::{debug, warn};
use reqwest::Client;
use reqwest_eventsource::{Event as SseEvent, EventSource, retry};
use serde_json::{Value, json};

use super::client::{EventStream, GenerationError, Generator};
use super::streaming::StreamParser;
use super::types::{GenerationRequest, Message, MessageContent};
use crate::config::LlmConfig;

/// Anthropic API base URL
const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";

/// Anthropic API version
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Default model to use
const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

/// Default max tokens
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Configuration for the Anthropic client
#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    pub model: String,
    pub max_tokens: u32,
    pub timeout: Duration,
    pub api_url: String,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout: Duration::from_secs(120),
            api_url: ANTHROPIC_API_URL.to_string(),
        }
    }
}

impl AnthropicConfig {
    /// Create a new config with a specific model
    pub fn with_model(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }
}

impl From<&LlmConfig> for AnthropicConfig {
    fn from(config: &LlmConfig) -> Self {
        Self {
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            timeout: Duration::from_millis(config.timeout_ms),
            api_url: config.api_url.clone(),
        }
    }
}

/// Anthropic API client
pub struct AnthropicClient {
    client: Client,
    api_key: String,
    config: AnthropicConfig,
}

impl AnthropicClient {
    /// Create a client reading the API key from the named environment variable
    pub fn from_env(env_var: &str, config: AnthropicConfig) -> Result<Self, GenerationError> {
        let api_key = std::env::var(env_var).map_err(|_| GenerationError::MissingApiKey {
            env_var: env_var.to_string(),
        })?;

        Self::with_api_key(api_key, config)
    }

    /// Create a client with an explicit API key
    pub fn with_api_key(api_key: String, config: AnthropicConfig) -> Result<Self, GenerationError> {
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            api_key,
            config,
        })
    }

    /// Build the request body for the Anthropic API
    fn build_request(&self, request: &GenerationRequest) -> Value {
        let max_tokens = request.max_tokens.unwrap_or(self.config.max_tokens);
        let messages = coalesce(&request.messages);

        let mut body = json!({
            "model": self.config.model,
            "max_tokens": max_tokens,
            "messages": messages,
            "stream": true
        });

        if !request.system.is_empty() {
            body["system"] = json!(request.system);
        }

        if !request.tools.is_empty() {
            let tools: Vec<Value> = request.tools.iter().map(|t| t.to_anthropic_schema()).collect();
            body["tools"] = json!(tools);
        }

        body
    }

    /// Whether an API key is configured
    pub fn is_ready(&self) -> bool {
        !self.api_key.is_empty()
    }
}

/// Merge adjacent plain-text messages from the same role.
///
/// A failed turn leaves a user turn without its agent reply, and the API
/// rejects two consecutive user text messages.
fn coalesce(messages: &[Message]) -> Vec<Message> {
    let mut merged: Vec<Message> = Vec::with_capacity(messages.len());
    for message in messages {
        if let Some(last) = merged.last_mut()
            && last.role == message.role
            && let (MessageContent::Text(prev), MessageContent::Text(next)) = (&mut last.content, &message.content)
        {
            prev.push_str("\n\n");
            prev.push_str(next);
            continue;
        }
        merged.push(message.clone());
    }
    merged
}

/// Stream state threaded through `unfold`
struct SseState {
    source: EventSource,
    parser: StreamParser,
    pending: VecDeque<super::types::Event>,
    done: bool,
}

async fn next_event(mut state: SseState) -> Option<(Result<super::types::Event, GenerationError>, SseState)> {
    loop {
        if let Some(event) = state.pending.pop_front() {
            return Some((Ok(event), state));
        }
        if state.done {
            state.source.close();
            return None;
        }

        let failure = match state.source.next().await {
            Some(Ok(SseEvent::Open)) => continue,
            Some(Ok(SseEvent::Message(message))) => match state.parser.process_data(&message.data) {
                Ok(events) => {
                    state.done = state.parser.is_finished();
                    state.pending.extend(events);
                    continue;
                }
                Err(e) => e,
            },
            Some(Err(reqwest_eventsource::Error::StreamEnded)) | None => {
                if !state.parser.is_finished() {
                    warn!("Generation stream ended before message_stop");
                }
                return None;
            }
            Some(Err(reqwest_eventsource::Error::InvalidStatusCode(status, response))) => {
                if status.as_u16() == 429 {
                    let retry_after = response
                        .headers()
                        .get("retry-after")
                        .and_then(|h| h.to_str().ok())
                        .and_then(|s| s.parse::<u64>().ok())
                        .unwrap_or(60);
                    GenerationError::RateLimited {
                        retry_after: Duration::from_secs(retry_after),
                    }
                } else {
                    let message = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
                    GenerationError::ApiError {
                        status: status.as_u16(),
                        message,
                    }
                }
            }
            Some(Err(reqwest_eventsource::Error::Transport(e))) => GenerationError::Network(e),
            Some(Err(e)) => GenerationError::EventSource(e.to_string()),
        };

        state.done = true;
        state.pending.clear();
        state.source.close();
        return Some((Err(failure), state));
    }
}

#[async_trait]
impl Generator for AnthropicClient {
    async fn generate(&self, request: GenerationRequest) -> Result<EventStream, GenerationError> {
        let body = self.build_request(&request);
        debug!(
            "Anthropic request: model={} messages={} tools={}",
            self.config.model,
            request.messages.len(),
            request.tools.len()
        );

        let builder = self
            .client
            .post(&self.config.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body);

        let mut source = EventSource::new(builder).map_err(|e| GenerationError::EventSource(e.to_string()))?;
        source.set_retry_policy(Box::new(retry::Never));

        let state = SseState {
            source,
            parser: StreamParser::new(),
            pending: VecDeque::new(),
            done: false,
        };

        Ok(futures::stream::unfold(state, next_event).boxed())
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

impl std::fmt::Debug for AnthropicClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicClient")
            .field("model", &self.config.model)
            .field("max_tokens", &self.config.max_tokens)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ToolCall, ToolDefinition, ToolResult};

    fn client() -> AnthropicClient {
        AnthropicClient::with_api_key("test-key".to_string(), AnthropicConfig::default()).unwrap()
    }

    #[test]
    fn test_config_default() {
        let config = AnthropicConfig::default();
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.max_tokens, DEFAULT_MAX_TOKENS);
        assert_eq!(config.api_url, ANTHROPIC_API_URL);
    }

    #[test]
    fn test_config_with_model() {
        let config = AnthropicConfig::with_model("claude-3-haiku-20240307");
        assert_eq!(config.model, "claude-3-haiku-20240307");
        assert_eq!(config.max_tokens, DEFAULT_MAX_TOKENS);
    }

    #[test]
    fn test_config_from_llm_config() {
        let llm = LlmConfig {
            timeout_ms: 5000,
            ..Default::default()
        };
        let config = AnthropicConfig::from(&llm);
        assert_eq!(config.timeout, Duration::from_millis(5000));
        assert_eq!(config.model, llm.model);
    }

    #[test]
    fn test_client_missing_env_var() {
        let result = AnthropicClient::from_env("CONCIERGE_TEST_KEY_THAT_IS_NEVER_SET", AnthropicConfig::default());
        assert!(matches!(result, Err(GenerationError::MissingApiKey { .. })));
    }

    #[test]
    fn test_build_request_basic() {
        let request = GenerationRequest::new("You are helpful").with_messages(vec![Message::user("Hello")]);
        let body = client().build_request(&request);

        assert_eq!(body["model"], DEFAULT_MODEL);
        assert_eq!(body["max_tokens"], DEFAULT_MAX_TOKENS);
        assert_eq!(body["stream"], true);
        assert_eq!(body["system"], "You are helpful");
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "Hello");
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn test_build_request_with_tools_and_max_tokens() {
        let tool = ToolDefinition::new(
            "finalize",
            "Return the final answer",
            json!({"type": "object", "properties": {"final_answer": {"type": "string"}}}),
        );
        let request = GenerationRequest::new("test")
            .with_messages(vec![Message::user("hi")])
            .with_tools(vec![tool])
            .with_max_tokens(256);

        let body = client().build_request(&request);
        assert_eq!(body["tools"][0]["name"], "finalize");
        assert_eq!(body["max_tokens"], 256);
    }

    #[test]
    fn test_build_request_keeps_tool_blocks() {
        let call = ToolCall::new("toolu_1", "browse_faq", json!({"query": "refunds"}));
        let result = ToolResult {
            tool_use_id: "toolu_1".to_string(),
            tool_name: "browse_faq".to_string(),
            output: "FAQ text".to_string(),
            is_error: false,
        };
        let request = GenerationRequest::new("support").with_messages(vec![
            Message::user("Can I get a refund?"),
            Message::tool_use("", &call),
            Message::tool_result(&result),
        ]);

        let body = client().build_request(&request);
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1]["content"][0]["type"], "tool_use");
        assert_eq!(messages[2]["content"][0]["type"], "tool_result");
        assert_eq!(messages[2]["content"][0]["content"], "FAQ text");
    }

    #[test]
    fn test_coalesce_merges_consecutive_user_text() {
        let merged = coalesce(&[
            Message::user("first question"),
            Message::user("second question"),
            Message::assistant("answer"),
        ]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].text(), Some("first question\n\nsecond question"));
        assert_eq!(merged[1].text(), Some("answer"));
    }

    #[test]
    fn test_coalesce_leaves_blocks_alone() {
        let call = ToolCall::new("toolu_1", "get_current_day_and_time", json!({}));
        let merged = coalesce(&[Message::assistant("Checking."), Message::tool_use("", &call)]);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_debug_impl_hides_key() {
        let debug_str = format!("{:?}", client());
        assert!(debug_str.contains("AnthropicClient"));
        assert!(debug_str.contains(DEFAULT_MODEL));
        assert!(!debug_str.contains("test-key"));
    }

    #[test]
    fn test_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AnthropicClient>();
    }

    #[test]
    fn test_empty_api_key_not_ready() {
        let client = AnthropicClient::with_api_key(String::new(), AnthropicConfig::default()).unwrap();
        assert!(!client.is_ready());
        assert_eq!(client.model(), DEFAULT_MODEL);
    }
}
