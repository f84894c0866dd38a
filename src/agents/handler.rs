//! Bounded tool-use loop shared by every specialist
//!
//! A handler walks `AwaitingModel -> (ToolRequested -> ToolExecuted)* -> Finalized`.
//! The loop ends only when the model calls `finalize`. Free text the model
//! produces along the way is kept out of the answer, and a step that requests
//! no tool is answered with a reminder and still counts against the budget.

use std::sync::Arc;

use futures::StreamExt;
use log::{debug, error, warn};

use crate::error::{ConciergeError, Result};
use crate::llm::{Event, GenerationRequest, Generator, Message, ToolCall};
use crate::tools::{FINALIZE_TOOL, FinalizeTool, ToolContext, ToolRegistry};

/// Sent back to the model when a step ends without a tool request
pub const FINALIZE_REMINDER: &str =
    "Your reply was not delivered. Call the finalize tool with the complete answer as final_answer.";

/// Per-handler iteration and token limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopLimits {
    pub max_tool_cycles: u32,
    pub max_tokens: u32,
}

impl Default for LoopLimits {
    fn default() -> Self {
        Self {
            max_tool_cycles: 8,
            max_tokens: 4096,
        }
    }
}

#[derive(Debug)]
enum HandlerState {
    AwaitingModel,
    ToolRequested(ToolCall),
    ToolExecuted,
    Finalized(String),
}

/// What one model step produced
#[derive(Debug, Default)]
pub struct ModelStep {
    /// Buffered free text, never surfaced
    pub text: String,
    /// First tool request of the step
    pub request: Option<ToolCall>,
}

/// Run one generation call and fold its event stream into a step
pub async fn model_step(generator: &dyn Generator, request: GenerationRequest) -> Result<ModelStep> {
    let mut stream = generator.generate(request).await.map_err(|e| {
        error!("model_step: generation failed on {}: {}", generator.model(), e);
        e
    })?;

    let mut step = ModelStep::default();
    while let Some(event) = stream.next().await {
        match event.map_err(|e| {
            error!("model_step: stream failed on {}: {}", generator.model(), e);
            e
        })? {
            Event::PartialText(fragment) => step.text.push_str(&fragment),
            Event::ToolRequest(call) => {
                if step.request.is_none() {
                    step.request = Some(call);
                } else {
                    warn!("model_step: ignoring extra tool request {} in the same step", call.name);
                }
            }
            Event::ToolResult(_) => {}
            Event::TurnComplete => break,
        }
    }

    Ok(step)
}

/// Outcome of a completed handler loop
#[derive(Debug, Clone, PartialEq)]
pub struct LoopOutcome {
    pub answer: String,
    pub tool_cycles: u32,
    /// Tools invoked, in order, excluding finalize
    pub tools_used: Vec<String>,
    /// Tools whose result came back as an error
    pub failed_tools: Vec<String>,
}

impl LoopOutcome {
    pub fn used(&self, tool: &str) -> bool {
        self.tools_used.iter().any(|t| t == tool)
    }

    pub fn failed(&self, tool: &str) -> bool {
        self.failed_tools.iter().any(|t| t == tool)
    }
}

/// The state machine itself, parameterized by instructions and tools
pub struct ToolLoop {
    name: &'static str,
    instructions: String,
    generator: Arc<dyn Generator>,
    tools: ToolRegistry,
    limits: LoopLimits,
}

impl ToolLoop {
    pub fn new(
        name: &'static str,
        instructions: impl Into<String>,
        generator: Arc<dyn Generator>,
        tools: ToolRegistry,
        limits: LoopLimits,
    ) -> Self {
        Self {
            name,
            instructions: instructions.into(),
            generator,
            tools,
            limits,
        }
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub async fn run(&self, ctx: &ToolContext, query: &str) -> Result<LoopOutcome> {
        let mut working = ctx.history_messages();
        working.push(Message::user(query));

        let mut cycles = 0u32;
        let mut tools_used = Vec::new();
        let mut failed_tools = Vec::new();
        let mut state = HandlerState::AwaitingModel;

        loop {
            state = match state {
                HandlerState::AwaitingModel => {
                    if cycles >= self.limits.max_tool_cycles {
                        warn!("{}: no finalize after {} cycles", self.name, cycles);
                        return Err(ConciergeError::LoopBudgetExceeded {
                            handler: self.name.to_string(),
                            cycles,
                        });
                    }
                    cycles += 1;

                    let request = GenerationRequest::new(self.instructions.clone())
                        .with_messages(working.iter().cloned())
                        .with_tools(self.tools.definitions())
                        .with_max_tokens(self.limits.max_tokens);
                    let step = model_step(self.generator.as_ref(), request).await?;

                    if !step.text.is_empty() {
                        debug!("{}: buffered {} chars of unfinalized text", self.name, step.text.len());
                    }

                    match step.request {
                        Some(call) => {
                            working.push(Message::tool_use(&step.text, &call));
                            HandlerState::ToolRequested(call)
                        }
                        None => {
                            if !step.text.is_empty() {
                                working.push(Message::assistant(step.text));
                            }
                            working.push(Message::user(FINALIZE_REMINDER));
                            HandlerState::AwaitingModel
                        }
                    }
                }
                HandlerState::ToolRequested(call) if call.name == FINALIZE_TOOL => {
                    let answer = FinalizeTool::answer(&call.arguments)?;
                    ctx.emit(Event::ToolRequest(call)).await;
                    HandlerState::Finalized(answer)
                }
                HandlerState::ToolRequested(call) => {
                    debug!("{}: cycle {} calls {}", self.name, cycles, call.name);
                    ctx.emit(Event::ToolRequest(call.clone())).await;

                    let result = self.tools.invoke(&call, ctx).await?;
                    ctx.emit(Event::ToolResult(result.clone())).await;

                    working.push(Message::tool_result(&result));
                    if result.is_error {
                        failed_tools.push(call.name.clone());
                    }
                    tools_used.push(call.name);
                    HandlerState::ToolExecuted
                }
                HandlerState::ToolExecuted => HandlerState::AwaitingModel,
                HandlerState::Finalized(answer) => {
                    debug!("{}: finalized after {} cycles", self.name, cycles);
                    return Ok(LoopOutcome {
                        answer,
                        tool_cycles: cycles,
                        tools_used,
                        failed_tools,
                    });
                }
            };
        }
    }

    /// End the turn with a fixed answer, still through the finalize contract
    pub async fn finalize_with(&self, ctx: &ToolContext, answer: &str) -> Result<LoopOutcome> {
        let call = ToolCall::new(
            format!("{}-finalize", ctx.session_id),
            FINALIZE_TOOL,
            serde_json::json!({ "final_answer": answer }),
        );
        let answer = FinalizeTool::answer(&call.arguments)?;
        ctx.emit(Event::ToolRequest(call)).await;
        debug!("{}: finalized without a model step", self.name);

        Ok(LoopOutcome {
            answer,
            tool_cycles: 0,
            tools_used: Vec::new(),
            failed_tools: Vec::new(),
        })
    }
}
