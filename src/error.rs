//! Error types for Concierge
//!
//! Centralized error handling using thiserror. Subsystems own focused error
//! enums (tools, generation, sessions) that fold into `ConciergeError`.

use serde::Serialize;
use thiserror::Error;

use crate::llm::GenerationError;
use crate::session::SessionError;
use crate::tools::ToolError;

/// All error types that can occur while serving a turn
#[derive(Debug, Error)]
pub enum ConciergeError {
    /// Query rejected before dispatch (empty or whitespace-only)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Tool registry or tool execution error
    #[error(transparent)]
    Tool(#[from] ToolError),

    /// Session store invariant violation
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The generation capability itself failed
    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    /// A handler ran out of tool cycles without calling finalize
    #[error("Loop budget exceeded: {handler} ran {cycles} tool cycles without finalizing")]
    LoopBudgetExceeded { handler: String, cycles: u32 },

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ConciergeError {
    /// Stable tag used in structured error bodies
    pub fn kind(&self) -> &'static str {
        match self {
            ConciergeError::Validation(_) => "validation_error",
            ConciergeError::Tool(ToolError::UnknownTool { .. }) => "unknown_tool_error",
            ConciergeError::Tool(ToolError::InvalidArgument { .. }) => "argument_error",
            ConciergeError::Tool(ToolError::Fetch { .. }) => "fetch_error",
            ConciergeError::Tool(ToolError::SearchUnavailable { .. }) => "search_unavailable_error",
            ConciergeError::Session(SessionError::NotFound(_)) => "session_not_found_error",
            ConciergeError::Generation(_) => "generation_capability_error",
            ConciergeError::LoopBudgetExceeded { .. } => "loop_budget_exceeded_error",
            ConciergeError::Config(_) => "config_error",
            ConciergeError::Io(_) => "io_error",
            ConciergeError::Json(_) => "json_error",
        }
    }

    /// HTTP status a front end should answer with
    pub fn status(&self) -> u16 {
        match self {
            ConciergeError::Validation(_) => 400,
            _ => 500,
        }
    }

    /// Whether the caller may retry the same request unchanged
    pub fn is_retryable(&self) -> bool {
        match self {
            ConciergeError::Generation(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Structured body for collaborators (kind tag + message)
    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            kind: self.kind().to_string(),
            message: self.to_string(),
        }
    }
}

/// Structured error handed to external callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub kind: String,
    pub message: String,
}

/// Result type alias for Concierge operations
pub type Result<T> = std::result::Result<T, ConciergeError>;
