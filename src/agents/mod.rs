//! Specialists and the router that chooses between them
//!
//! This module provides:
//! - The shared bounded tool loop (`handler`)
//! - Support and Wellness specialists
//! - The keyword routing policy and the router meta-handler

mod format;
pub mod handler;
mod policy;
mod router;
mod support;
mod wellness;

pub use format::{is_structured, reshape};
pub use handler::{FINALIZE_REMINDER, LoopLimits, LoopOutcome, ToolLoop};
pub use policy::{
    ACCOUNT_TERMS, Classification, PRODUCT_ANCHORS, Route, RoutingPolicy, SPECIFICITY_TERMS, WELLNESS_TERMS, is_service_query,
};
pub use router::{Router, RouterMode, SpecialistTool};
pub use support::{FOLLOW_UP_HEADING, SupportHandler};
pub use wellness::{DECLINE_ANSWER, WellnessHandler};

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::Config;
use crate::error::Result;
use crate::llm::Generator;
use crate::tools::{FaqTool, ToolContext, ToolRegistry, WebSearchTool};

/// The one finalized answer a turn produces
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalAnswer {
    pub text: String,
    pub route: Route,
}

impl FinalAnswer {
    pub fn new(text: impl Into<String>, route: Route) -> Self {
        Self {
            text: text.into(),
            route,
        }
    }
}

/// A handler the router can delegate a query to
#[async_trait]
pub trait Specialist: Send + Sync {
    fn route(&self) -> Route;

    /// Tools this specialist offers the model
    fn tools(&self) -> &ToolRegistry;

    /// Run one turn and return exactly one finalized answer
    async fn run(&self, ctx: &ToolContext, query: &str) -> Result<FinalAnswer>;
}

impl From<&Config> for LoopLimits {
    fn from(config: &Config) -> Self {
        Self {
            max_tool_cycles: config.handlers.max_tool_cycles,
            max_tokens: config.llm.max_tokens,
        }
    }
}

/// Wire both specialists and the router from configuration
pub fn build_router(config: &Config, generator: Arc<dyn Generator>) -> Result<Router> {
    let limits = LoopLimits::from(config);

    let faq = FaqTool::new(
        config.tools.faq_url.clone(),
        config.tools.fetch_timeout(),
        config.tools.max_document_chars,
    )?;
    let search = WebSearchTool::from_env(config.tools.search_timeout(), config.tools.search_max_results);

    let support: Arc<dyn Specialist> = Arc::new(SupportHandler::new(generator.clone(), faq, limits));
    let wellness: Arc<dyn Specialist> = Arc::new(WellnessHandler::new(generator.clone(), search, limits));

    Ok(Router::new(
        generator,
        support,
        wellness,
        RoutingPolicy::new(config.router.default_route),
        config.router.mode,
        config.llm.max_tokens,
    ))
}
