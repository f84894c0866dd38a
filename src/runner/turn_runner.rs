//! Turn runner - one request end-to-end.
//!
//! The runner owns the per-session discipline: turns for one session are
//! serialized by the session's turn lock, the user turn is recorded before
//! routing, and the agent turn is recorded only when a finalized answer exists.

use std::sync::Arc;

use log::{debug, error, info};
use tokio::sync::mpsc;

use crate::agents::{Router, build_router};
use crate::config::Config;
use crate::error::{ConciergeError, Result};
use crate::llm::{AnthropicClient, AnthropicConfig, Event, Generator};
use crate::session::{SessionStore, Turn};
use crate::tools::ToolContext;

/// Capacity of the per-turn event channel
const EVENT_BUFFER: usize = 64;

pub struct TurnRunner {
    sessions: Arc<SessionStore>,
    router: Router,
    /// Most recent turns handed to the model; 0 means all
    history_window: usize,
}

impl TurnRunner {
    pub fn new(router: Router, sessions: Arc<SessionStore>) -> Self {
        Self {
            sessions,
            router,
            history_window: 0,
        }
    }

    pub fn with_history_window(mut self, history_window: usize) -> Self {
        self.history_window = history_window;
        self
    }

    /// Build against the Anthropic backend named in the config
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = AnthropicClient::from_env(&config.llm.api_key_env, AnthropicConfig::from(&config.llm))?;
        Self::with_generator(config, Arc::new(client))
    }

    /// Build against any generation backend
    pub fn with_generator(config: &Config, generator: Arc<dyn Generator>) -> Result<Self> {
        config.validate()?;
        let router = build_router(config, generator)?;
        Ok(Self::new(router, Arc::new(SessionStore::new())).with_history_window(config.sessions.history_window))
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Serve one query and return the aggregated final answer.
    ///
    /// Dropping the returned future cancels the in-flight turn and releases
    /// the session's turn lock.
    pub async fn handle(&self, session_id: &str, query: &str) -> Result<String> {
        if query.trim().is_empty() {
            return Err(ConciergeError::Validation("query must not be empty".to_string()));
        }

        let handle = self.sessions.ensure(session_id).await;
        let _turn = handle.begin_turn().await;

        let history = handle.snapshot().await.window(self.history_window).to_vec();
        self.sessions.append(session_id, Turn::user(query)).await?;

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let ctx = ToolContext::new(session_id, history).with_events(tx);

        let route = async move {
            let outcome = self.router.classify_and_delegate(&ctx, query).await;
            drop(ctx);
            outcome
        };
        let (outcome, aggregated) = tokio::join!(route, aggregate(rx, session_id));

        let answer = outcome.map_err(|e| {
            error!("TurnRunner: session={} turn failed ({}): {}", session_id, e.kind(), e);
            e
        })?;

        let text = if aggregated.is_empty() { answer.text } else { aggregated };
        self.sessions.append(session_id, Turn::agent(text.as_str())).await?;

        info!(
            "TurnRunner: session={} served by {} ({} chars)",
            session_id,
            answer.route,
            text.len()
        );
        Ok(text)
    }
}

/// Concatenate text fragments in emission order until every sender is gone
async fn aggregate(mut rx: mpsc::Receiver<Event>, session_id: &str) -> String {
    let mut text = String::new();

    while let Some(event) = rx.recv().await {
        match event {
            Event::PartialText(fragment) => text.push_str(&fragment),
            Event::ToolRequest(call) => debug!("TurnRunner: session={} tool request {}", session_id, call.name),
            Event::ToolResult(result) => debug!(
                "TurnRunner: session={} tool result {} ({} chars, error={})",
                session_id,
                result.tool_name,
                result.output.len(),
                result.is_error
            ),
            Event::TurnComplete => debug!("TurnRunner: session={} turn complete", session_id),
        }
    }

    text
}
