//! web_search tool - best-effort general web search

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use serde_json::Value;

use super::{Tool, ToolContext, ToolError, ToolOutput, required_str};
use crate::error::Result;

const TOOL_NAME: &str = "web_search";

/// Opaque `search(query) -> text` capability
#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> std::result::Result<String, ToolError>;
}

/// Supported search APIs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchProvider {
    Tavily,
    Brave,
    SerpApi,
}

impl SearchProvider {
    /// Environment variable holding the provider's key
    pub fn env_var(&self) -> &'static str {
        match self {
            SearchProvider::Tavily => "TAVILY_API_KEY",
            SearchProvider::Brave => "BRAVE_API_KEY",
            SearchProvider::SerpApi => "SERPAPI_KEY",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            SearchProvider::Tavily => "Tavily",
            SearchProvider::Brave => "Brave",
            SearchProvider::SerpApi => "SerpAPI",
        }
    }

    /// Pull (title, url, snippet) out of a provider response
    fn hits(&self, body: &Value) -> Vec<(String, String, String)> {
        let (list, url_key, snippet_key) = match self {
            SearchProvider::Tavily => (&body["results"], "url", "content"),
            SearchProvider::Brave => (&body["web"]["results"], "url", "description"),
            SearchProvider::SerpApi => (&body["organic_results"], "link", "snippet"),
        };

        list.as_array()
            .map(|items| {
                items
                    .iter()
                    .map(|r| {
                        (
                            r["title"].as_str().unwrap_or("(no title)").to_string(),
                            r[url_key].as_str().unwrap_or("").to_string(),
                            r[snippet_key].as_str().unwrap_or("").to_string(),
                        )
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Search over one of the HTTP providers
pub struct HttpSearch {
    provider: SearchProvider,
    api_key: String,
    client: reqwest::Client,
}

impl HttpSearch {
    pub fn new(provider: SearchProvider, api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ToolError::SearchUnavailable {
                reason: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            provider,
            api_key: api_key.into(),
            client,
        })
    }

    /// First provider with a key set, in Tavily, Brave, SerpAPI order
    pub fn from_env(timeout: Duration) -> Option<Self> {
        for provider in [SearchProvider::Tavily, SearchProvider::Brave, SearchProvider::SerpApi] {
            if let Ok(api_key) = std::env::var(provider.env_var())
                && !api_key.trim().is_empty()
            {
                debug!("HttpSearch::from_env: found {}", provider.env_var());
                return Self::new(provider, api_key, timeout).ok();
            }
        }

        debug!("HttpSearch::from_env: no API key found");
        None
    }

    pub fn provider(&self) -> SearchProvider {
        self.provider
    }

    fn request(&self, query: &str, max_results: usize) -> reqwest::RequestBuilder {
        let count = max_results.to_string();
        match self.provider {
            SearchProvider::Tavily => self.client.post("https://api.tavily.com/search").json(&serde_json::json!({
                "api_key": self.api_key,
                "query": query,
                "max_results": max_results,
                "search_depth": "basic"
            })),
            SearchProvider::Brave => self
                .client
                .get("https://api.search.brave.com/res/v1/web/search")
                .header("X-Subscription-Token", &self.api_key)
                .query(&[("q", query), ("count", count.as_str())]),
            SearchProvider::SerpApi => self.client.get("https://serpapi.com/search").query(&[
                ("q", query),
                ("api_key", self.api_key.as_str()),
                ("num", count.as_str()),
                ("engine", "google"),
            ]),
        }
    }
}

#[async_trait]
impl SearchBackend for HttpSearch {
    async fn search(&self, query: &str, max_results: usize) -> std::result::Result<String, ToolError> {
        let unavailable = |reason: String| ToolError::SearchUnavailable { reason };

        let response = self
            .request(query, max_results)
            .send()
            .await
            .map_err(|e| unavailable(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(unavailable(format!(
                "{} API error {}: {}",
                self.provider.label(),
                status,
                truncate(&error_text, 200)
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| unavailable(format!("failed to parse response: {}", e)))?;

        Ok(format_hits(&self.provider.hits(&body), max_results))
    }
}

fn format_hits(hits: &[(String, String, String)], max_results: usize) -> String {
    if hits.is_empty() {
        return "No results found".to_string();
    }

    hits.iter()
        .take(max_results)
        .enumerate()
        .map(|(i, (title, url, snippet))| format!("{}. {}\n   {}\n   {}\n", i + 1, title, url, truncate(snippet, 200)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Truncate on a char boundary
fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

/// Search tool; a missing backend or failing provider yields readable text
pub struct WebSearchTool {
    backend: Option<Arc<dyn SearchBackend>>,
    max_results: usize,
}

impl WebSearchTool {
    pub fn new(backend: Option<Arc<dyn SearchBackend>>, max_results: usize) -> Self {
        Self {
            backend,
            max_results: max_results.max(1),
        }
    }

    /// Provider picked from environment keys
    pub fn from_env(timeout: Duration, max_results: usize) -> Self {
        let backend = HttpSearch::from_env(timeout).map(|b| Arc::new(b) as Arc<dyn SearchBackend>);
        Self::new(backend, max_results)
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &'static str {
        TOOL_NAME
    }

    fn description(&self) -> &'static str {
        "Search the web for current, general health and wellness information. Results are best-effort and may be unavailable."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Search query"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, input: Value, _ctx: &ToolContext) -> Result<ToolOutput> {
        let query = required_str(&input, TOOL_NAME, "query")?;

        let outcome = match &self.backend {
            Some(backend) => backend.search(query, self.max_results).await,
            None => Err(ToolError::SearchUnavailable {
                reason: "no search API configured (set TAVILY_API_KEY, BRAVE_API_KEY, or SERPAPI_KEY)".to_string(),
            }),
        };

        match outcome {
            Ok(text) => Ok(ToolOutput::success(text)),
            Err(e) => {
                warn!("WebSearchTool: {}", e);
                Ok(ToolOutput::error(e.to_string()))
            }
        }
    }
}
