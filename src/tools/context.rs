//! Tool execution context - scoped to a single in-flight turn

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::llm::{Event, Message};
use crate::session::Turn;

/// Execution context for tools - scoped to one turn of one session
#[derive(Debug, Clone)]
pub struct ToolContext {
    /// Session the turn belongs to
    pub session_id: String,

    /// Prior turns visible to the model (already windowed)
    history: Arc<Vec<Turn>>,

    /// Outward event sink, drained by the turn runner
    events: Option<mpsc::Sender<Event>>,
}

impl ToolContext {
    pub fn new(session_id: impl Into<String>, history: Vec<Turn>) -> Self {
        Self {
            session_id: session_id.into(),
            history: Arc::new(history),
            events: None,
        }
    }

    /// Attach the channel the turn runner aggregates from
    pub fn with_events(mut self, events: mpsc::Sender<Event>) -> Self {
        self.events = Some(events);
        self
    }

    /// Context with no history, for standalone tool or handler use
    pub fn detached(session_id: impl Into<String>) -> Self {
        Self::new(session_id, Vec::new())
    }

    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    /// History as model messages
    pub fn history_messages(&self) -> Vec<Message> {
        self.history.iter().map(Turn::to_message).collect()
    }

    /// Publish an event; a closed receiver is not an error
    pub async fn emit(&self, event: Event) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event).await;
        }
    }
}
