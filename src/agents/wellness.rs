//! Wellness specialist - nutrition, fitness and lifestyle guidance

use std::sync::Arc;

use async_trait::async_trait;
use log::{info, warn};

use super::format::{is_structured, reshape};
use super::handler::{LoopLimits, ToolLoop};
use super::policy::is_service_query;
use super::{FinalAnswer, Route, Specialist};
use crate::error::Result;
use crate::llm::Generator;
use crate::tools::{BmiTool, ClockTool, FinalizeTool, ToolContext, ToolRegistry, WebSearchTool};

const INSTRUCTIONS: &str = "\
You are a wellness coach giving general nutrition, fitness, sleep and lifestyle guidance.

- Use calculate_bmi for any BMI question and get_current_day_and_time for time-sensitive advice.
- Use web_search for current general information; if it is unavailable, answer from general knowledge.
- Never answer questions about NuGenomics products, pricing, test results, billing or policies. \
Decline them and say the Support specialist should handle them.
- Structure every answer with a bold heading and bulleted points. Never reply with a single paragraph.
- Deliver the complete answer by calling finalize exactly once. Text outside finalize is never shown.";

/// Answer used when a product or service question reaches this handler
pub const DECLINE_ANSWER: &str = "\
**Outside Wellness Guidance**

* Questions about NuGenomics products, pricing, test results, billing or policies are handled by our Support specialist.
* Please ask the Support specialist so you get accurate, official information.
* I can still help with general nutrition, fitness, sleep and lifestyle questions.";

const RESHAPE_HEADING: &str = "Wellness Guidance";

pub struct WellnessHandler {
    tool_loop: ToolLoop,
}

impl WellnessHandler {
    pub fn new(generator: Arc<dyn Generator>, search: WebSearchTool, limits: LoopLimits) -> Self {
        Self {
            tool_loop: ToolLoop::new("WellnessHandler", INSTRUCTIONS, generator, Self::tool_registry(search), limits),
        }
    }

    pub fn tool_registry(search: WebSearchTool) -> ToolRegistry {
        ToolRegistry::new()
            .with(BmiTool)
            .with(ClockTool)
            .with(search)
            .with(FinalizeTool)
    }
}

#[async_trait]
impl Specialist for WellnessHandler {
    fn route(&self) -> Route {
        Route::Wellness
    }

    fn tools(&self) -> &ToolRegistry {
        self.tool_loop.tools()
    }

    async fn run(&self, ctx: &ToolContext, query: &str) -> Result<FinalAnswer> {
        if is_service_query(query) {
            info!("WellnessHandler: session={} declined a service query", ctx.session_id);
            let outcome = self.tool_loop.finalize_with(ctx, DECLINE_ANSWER).await?;
            return Ok(FinalAnswer::new(outcome.answer, Route::Wellness));
        }

        let outcome = self.tool_loop.run(ctx, query).await?;

        let text = if is_structured(&outcome.answer) {
            outcome.answer
        } else {
            warn!("WellnessHandler: session={} answer was unstructured, reshaping", ctx.session_id);
            reshape(&outcome.answer, RESHAPE_HEADING)
        };

        info!(
            "WellnessHandler: session={} finalized in {} cycles (tools: {:?})",
            ctx.session_id, outcome.tool_cycles, outcome.tools_used
        );
        Ok(FinalAnswer::new(text, Route::Wellness))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedGenerator;
    use serde_json::json;

    fn handler(generator: Arc<ScriptedGenerator>) -> WellnessHandler {
        WellnessHandler::new(generator, WebSearchTool::new(None, 5), LoopLimits::default())
    }

    #[tokio::test]
    async fn test_pricing_query_declined_without_model_call() {
        let generator = Arc::new(ScriptedGenerator::default());
        let answer = handler(generator.clone())
            .run(&ToolContext::detached("s1"), "What is the price of the NuGenomics genetic test?")
            .await
            .unwrap();

        assert_eq!(answer.text, DECLINE_ANSWER);
        assert!(answer.text.contains("Support specialist"));
        assert!(!answer.text.contains('₹'));
        assert!(generator.requests().await.is_empty());
    }

    #[tokio::test]
    async fn test_everyday_cost_question_reaches_model() {
        let generator = Arc::new(ScriptedGenerator::new(vec![ScriptedGenerator::finalize_step(
            "**Keto Diet**\n\n* Groceries can cost more\n* Benefits vary by person",
        )]));
        let answer = handler(generator.clone())
            .run(&ToolContext::detached("s1"), "Is a keto diet worth the cost?")
            .await
            .unwrap();

        assert_ne!(answer.text, DECLINE_ANSWER);
        assert!(answer.text.starts_with("**Keto Diet**"));
        assert_eq!(generator.requests().await.len(), 1);
    }

    #[tokio::test]
    async fn test_structured_answer_kept() {
        let structured = "**Muscle Gain Diet**\n\n* Eat 1.6 g protein per kg\n* Add complex carbs";
        let generator = Arc::new(ScriptedGenerator::new(vec![ScriptedGenerator::finalize_step(structured)]));
        let answer = handler(generator)
            .run(&ToolContext::detached("s1"), "What's a good diet for muscle gain?")
            .await
            .unwrap();
        assert_eq!(answer.text, structured);
    }

    #[tokio::test]
    async fn test_unstructured_answer_reshaped() {
        let generator = Arc::new(ScriptedGenerator::new(vec![ScriptedGenerator::finalize_step(
            "Sleep seven hours. Walk daily.",
        )]));
        let answer = handler(generator)
            .run(&ToolContext::detached("s1"), "How do I feel better?")
            .await
            .unwrap();
        assert_eq!(answer.text, "**Wellness Guidance**\n\n* Sleep seven hours.\n* Walk daily.");
    }

    #[tokio::test]
    async fn test_bmi_then_search_unavailable() {
        let generator = Arc::new(ScriptedGenerator::new(vec![
            ScriptedGenerator::tool_step("calculate_bmi", json!({"weight_kg": 70, "height_m": 1.75})),
            ScriptedGenerator::tool_step("web_search", json!({"query": "healthy bmi"})),
            ScriptedGenerator::finalize_step("**BMI**\n\n* 22.86, Normal (Healthy Weight)"),
        ]));
        let answer = handler(generator.clone())
            .run(&ToolContext::detached("s1"), "My weight is 70kg and height 1.75m. BMI?")
            .await
            .unwrap();
        assert!(answer.text.contains("Normal (Healthy Weight)"));

        let requests = generator.requests().await;
        let fed_back = serde_json::to_string(&requests[2].messages).unwrap();
        assert!(fed_back.contains("Search unavailable"));
    }

    #[tokio::test]
    async fn test_zero_height_fails_turn() {
        let generator = Arc::new(ScriptedGenerator::new(vec![ScriptedGenerator::tool_step(
            "calculate_bmi",
            json!({"weight_kg": 50, "height_m": 0}),
        )]));
        let err = handler(generator)
            .run(&ToolContext::detached("s1"), "BMI for 50kg and 0m?")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "argument_error");
    }

    #[test]
    fn test_registry_contents() {
        let registry = WellnessHandler::tool_registry(WebSearchTool::new(None, 5));
        assert_eq!(
            registry.tool_names(),
            vec!["calculate_bmi", "get_current_day_and_time", "web_search", "finalize"]
        );
    }
}
