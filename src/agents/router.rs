//! Router - picks exactly one specialist and relays its answer
//!
//! Specialists are exposed to the router as tools, so delegation goes through
//! the same registry invocation path a handler uses for its own tools.

use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::handler::model_step;
use super::policy::{Route, RoutingPolicy};
use super::{FinalAnswer, Specialist};
use crate::error::Result;
use crate::llm::{Event, GenerationRequest, Generator, Message, ToolCall};
use crate::tools::{Tool, ToolContext, ToolOutput, ToolRegistry, required_str};

const INSTRUCTIONS: &str = "\
You route customer queries. Call exactly one tool and pass the user's query unchanged.

- support_tool: NuGenomics products, genetic tests, blood reports, pricing, billing, refunds, \
subscriptions, test results, bookings, rescheduling and policies.
- wellness_tool: general diet, nutrition, fitness, sleep, stress, BMI and lifestyle questions.
- If a query mentions specific NuGenomics services, always choose support_tool.";

/// How the router decides
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouterMode {
    /// Ask the model, with the keyword policy enforcing the specificity rule
    #[default]
    Model,
    /// Keyword policy only, no model call
    Keywords,
}

/// A specialist presented to the router as a callable tool
pub struct SpecialistTool {
    specialist: Arc<dyn Specialist>,
}

impl SpecialistTool {
    pub fn new(specialist: Arc<dyn Specialist>) -> Self {
        Self { specialist }
    }
}

#[async_trait]
impl Tool for SpecialistTool {
    fn name(&self) -> &'static str {
        self.specialist.route().tool_name()
    }

    fn description(&self) -> &'static str {
        match self.specialist.route() {
            Route::Support => "Hand the query to the customer support specialist (products, tests, billing, scheduling).",
            Route::Wellness => "Hand the query to the wellness specialist (nutrition, fitness, lifestyle).",
        }
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The user's query, unchanged"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, input: Value, ctx: &ToolContext) -> Result<ToolOutput> {
        let query = required_str(&input, self.name(), "query")?;
        let answer = self.specialist.run(ctx, query).await?;
        Ok(ToolOutput::success(answer.text))
    }
}

pub struct Router {
    mode: RouterMode,
    policy: RoutingPolicy,
    generator: Arc<dyn Generator>,
    max_tokens: u32,
    specialists: Vec<Arc<dyn Specialist>>,
    delegates: ToolRegistry,
}

impl Router {
    pub fn new(
        generator: Arc<dyn Generator>,
        support: Arc<dyn Specialist>,
        wellness: Arc<dyn Specialist>,
        policy: RoutingPolicy,
        mode: RouterMode,
        max_tokens: u32,
    ) -> Self {
        let specialists = vec![support, wellness];
        let delegates = specialists
            .iter()
            .fold(ToolRegistry::new(), |registry, s| registry.with(SpecialistTool::new(s.clone())));

        Self {
            mode,
            policy,
            generator,
            max_tokens,
            specialists,
            delegates,
        }
    }

    pub fn mode(&self) -> RouterMode {
        self.mode
    }

    pub fn policy(&self) -> &RoutingPolicy {
        &self.policy
    }

    pub fn specialists(&self) -> &[Arc<dyn Specialist>] {
        &self.specialists
    }

    /// Pick one specialist, run it on the unmodified query, annotate its answer
    pub async fn classify_and_delegate(&self, ctx: &ToolContext, query: &str) -> Result<FinalAnswer> {
        let route = match self.mode {
            RouterMode::Keywords => self.policy.classify(query).route,
            RouterMode::Model => self.model_route(ctx, query).await?,
        };
        info!("Router: session={} route={}", ctx.session_id, route);

        let call = ToolCall::new(
            format!("route_{}", route),
            route.tool_name(),
            serde_json::json!({ "query": query }),
        );
        ctx.emit(Event::ToolRequest(call.clone())).await;

        let result = self.delegates.invoke(&call, ctx).await?;
        ctx.emit(Event::ToolResult(result.clone())).await;

        let text = format!("[Served by {}]\n{}", route.label(), result.output);
        ctx.emit(Event::PartialText(text.clone())).await;
        ctx.emit(Event::TurnComplete).await;

        Ok(FinalAnswer::new(text, route))
    }

    /// One model step; its first delegation wins, subject to the specificity rule
    async fn model_route(&self, ctx: &ToolContext, query: &str) -> Result<Route> {
        let request = GenerationRequest::new(INSTRUCTIONS)
            .with_messages(ctx.history_messages())
            .with_messages([Message::user(query)])
            .with_tools(self.delegates.definitions())
            .with_max_tokens(self.max_tokens);

        let step = model_step(self.generator.as_ref(), request).await?;
        let picked = step.request.as_ref().and_then(|call| Route::from_tool_name(&call.name));

        match picked {
            Some(route) => {
                let enforced = self.policy.enforce(query, route);
                if enforced != route {
                    info!("Router: model picked {}, specificity terms force {}", route, enforced);
                }
                Ok(enforced)
            }
            None => {
                let fallback = self.policy.classify(query);
                match &step.request {
                    Some(call) => warn!("Router: model requested non-delegate tool {}", call.name),
                    None => debug!("Router: model made no delegation"),
                }
                info!("Router: keyword policy picked {} (matched {:?})", fallback.route, fallback.matched);
                Ok(fallback.route)
            }
        }
    }
}
