//! Generation capability trait, errors, and a scripted implementation

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::BoxStream;
use serde_json::Value;
use tokio::sync::Mutex;

use super::types::{Event, GenerationRequest, ToolCall};

/// Lazy, finite, non-restartable sequence of events for one model step
pub type EventStream = BoxStream<'static, Result<Event, GenerationError>>;

/// Opaque text-generation capability: given instructions, history and tools,
/// emits partial text and/or tool requests.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Start one model step
    async fn generate(&self, request: GenerationRequest) -> Result<EventStream, GenerationError>;

    /// Model identifier, for logging
    fn model(&self) -> &str;
}

/// Errors that can occur during generation
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Missing API key: environment variable {env_var} not set")]
    MissingApiKey { env_var: String },

    #[error("Event source error: {0}")]
    EventSource(String),
}

impl GenerationError {
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, GenerationError::RateLimited { .. })
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            GenerationError::RateLimited { .. } => true,
            GenerationError::ApiError { status, .. } => *status >= 500,
            GenerationError::Network(_) => true,
            GenerationError::InvalidResponse(_) => false,
            GenerationError::JsonError(_) => false,
            GenerationError::MissingApiKey { .. } => false,
            GenerationError::EventSource(_) => true,
        }
    }
}

/// One scripted model step
#[derive(Debug, Clone)]
enum ScriptStep {
    Events(Vec<Event>),
    Failure(String),
}

/// Generator that replays pre-scripted steps in order and records every request.
///
/// Used by tests and demos to drive handlers without a network.
#[derive(Debug, Default)]
pub struct ScriptedGenerator {
    steps: Mutex<VecDeque<ScriptStep>>,
    requests: Mutex<Vec<GenerationRequest>>,
    next_id: std::sync::atomic::AtomicU64,
}

impl ScriptedGenerator {
    /// Create a generator from a list of steps, each a list of events
    pub fn new(steps: Vec<Vec<Event>>) -> Self {
        Self {
            steps: Mutex::new(steps.into_iter().map(ScriptStep::Events).collect()),
            ..Default::default()
        }
    }

    /// Queue another step
    pub async fn push_step(&self, events: Vec<Event>) {
        self.steps.lock().await.push_back(ScriptStep::Events(events));
    }

    /// Queue a step that fails the generation call
    pub async fn push_failure(&self, message: impl Into<String>) {
        self.steps.lock().await.push_back(ScriptStep::Failure(message.into()));
    }

    /// Requests seen so far
    pub async fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().await.clone()
    }

    /// Steps not yet consumed
    pub async fn remaining(&self) -> usize {
        self.steps.lock().await.len()
    }

    /// A step that only emits text, then completes
    pub fn text_step(text: &str) -> Vec<Event> {
        vec![Event::PartialText(text.to_string()), Event::TurnComplete]
    }

    /// A step that requests one tool, then completes
    pub fn tool_step(name: &str, arguments: Value) -> Vec<Event> {
        vec![
            Event::ToolRequest(ToolCall::new(format!("call_{}", name), name, arguments)),
            Event::TurnComplete,
        ]
    }

    /// A step that calls finalize with the given answer
    pub fn finalize_step(answer: &str) -> Vec<Event> {
        Self::tool_step(
            crate::tools::FINALIZE_TOOL,
            serde_json::json!({ "final_answer": answer }),
        )
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn generate(&self, request: GenerationRequest) -> Result<EventStream, GenerationError> {
        self.requests.lock().await.push(request);

        let step = self
            .steps
            .lock()
            .await
            .pop_front()
            .ok_or_else(|| GenerationError::InvalidResponse("script exhausted".to_string()))?;

        match step {
            ScriptStep::Events(events) => {
                let seq = self.next_id.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                let events: Vec<Result<Event, GenerationError>> = events
                    .into_iter()
                    .map(|event| match event {
                        Event::ToolRequest(mut call) => {
                            call.id = format!("{}_{}", call.id, seq);
                            Ok(Event::ToolRequest(call))
                        }
                        other => Ok(other),
                    })
                    .collect();
                Ok(futures::stream::iter(events).boxed())
            }
            ScriptStep::Failure(message) => Err(GenerationError::ApiError { status: 500, message }),
        }
    }

    fn model(&self) -> &str {
        "scripted"
    }
}
