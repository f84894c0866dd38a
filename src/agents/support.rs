//! Support specialist - answers strictly from the FAQ document

use std::sync::Arc;

use async_trait::async_trait;
use log::{info, warn};

use super::handler::{LoopLimits, ToolLoop};
use super::{FinalAnswer, Route, Specialist};
use crate::error::Result;
use crate::llm::Generator;
use crate::tools::{FaqTool, FinalizeTool, ToolContext, ToolRegistry};

const FAQ_TOOL: &str = "browse_faq";

/// Heading the model is told to use for follow-up questions
pub const FOLLOW_UP_HEADING: &str = "Suggested next questions";

const INSTRUCTIONS: &str = "\
You are the customer support specialist for NuGenomics.

- Always call browse_faq first and answer ONLY from the document it returns.
- If the document does not cover the question, say you cannot answer it and suggest contacting the support team.
- If browse_faq returns an error, tell the user the information could not be retrieved right now.
- Decline anything unrelated to NuGenomics services.
- When your answer states facts from the document, end it with a section titled \
\"Suggested next questions\" listing one or two follow-up questions.
- Deliver the complete answer by calling finalize exactly once. Text outside finalize is never shown.";

pub struct SupportHandler {
    tool_loop: ToolLoop,
}

impl SupportHandler {
    pub fn new(generator: Arc<dyn Generator>, faq: FaqTool, limits: LoopLimits) -> Self {
        Self {
            tool_loop: ToolLoop::new("SupportHandler", INSTRUCTIONS, generator, Self::tool_registry(faq), limits),
        }
    }

    pub fn tool_registry(faq: FaqTool) -> ToolRegistry {
        ToolRegistry::new().with(faq).with(FinalizeTool)
    }
}

fn has_follow_ups(answer: &str) -> bool {
    answer.to_lowercase().contains(&FOLLOW_UP_HEADING.to_lowercase())
}

#[async_trait]
impl Specialist for SupportHandler {
    fn route(&self) -> Route {
        Route::Support
    }

    fn tools(&self) -> &ToolRegistry {
        self.tool_loop.tools()
    }

    async fn run(&self, ctx: &ToolContext, query: &str) -> Result<FinalAnswer> {
        let outcome = self.tool_loop.run(ctx, query).await?;

        if outcome.used(FAQ_TOOL) && !outcome.failed(FAQ_TOOL) && !has_follow_ups(&outcome.answer) {
            warn!(
                "SupportHandler: session={} answer drawn from the FAQ has no '{}' section",
                ctx.session_id, FOLLOW_UP_HEADING
            );
        }

        info!(
            "SupportHandler: session={} finalized in {} cycles (tools: {:?})",
            ctx.session_id, outcome.tool_cycles, outcome.tools_used
        );
        Ok(FinalAnswer::new(outcome.answer, Route::Support))
    }
}
