//! browse_faq tool - fetches the one document the Support handler may answer from

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use scraper::{ElementRef, Html, Node};
use serde_json::Value;

use super::{Tool, ToolContext, ToolError, ToolOutput};
use crate::error::Result;

const TOOL_NAME: &str = "browse_faq";

/// Tags whose boundaries should become line breaks
const BLOCK_TAGS: &[&str] = &[
    "p", "br", "div", "li", "ul", "ol", "tr", "table", "section", "article", "h1", "h2", "h3", "h4", "h5", "h6",
    "dt", "dd", "summary", "details",
];

/// Elements whose text is never visible
const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript", "template", "head"];

/// Fetch tool bound to a single fixed URL
pub struct FaqTool {
    url: String,
    client: reqwest::Client,
    max_chars: usize,
}

impl FaqTool {
    pub fn new(url: impl Into<String>, timeout: Duration, max_chars: usize) -> Result<Self> {
        let url = url.into();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ToolError::Fetch {
                url: url.clone(),
                reason: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self { url, client, max_chars })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// GET the document and reduce it to visible text
    pub async fn fetch(&self) -> std::result::Result<String, ToolError> {
        let failed = |reason: String| ToolError::Fetch {
            url: self.url.clone(),
            reason,
        };

        let response = self.client.get(&self.url).send().await.map_err(|e| {
            if e.is_timeout() {
                failed("request timed out".to_string())
            } else {
                failed(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(failed(format!("HTTP {}", status)));
        }

        let body = response.text().await.map_err(|e| failed(e.to_string()))?;
        let text = html_to_text(&body);
        debug!("FaqTool::fetch: {} bytes of html -> {} chars of text", body.len(), text.chars().count());

        Ok(truncate_document(text, self.max_chars))
    }
}

#[async_trait]
impl Tool for FaqTool {
    fn name(&self) -> &'static str {
        TOOL_NAME
    }

    fn description(&self) -> &'static str {
        "Fetch the official FAQ document. Answer only from its content; the document is the same regardless of the query."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "What the user is asking about (informational only)"
                }
            }
        })
    }

    async fn execute(&self, input: Value, _ctx: &ToolContext) -> Result<ToolOutput> {
        if let Some(query) = input.get("query").and_then(Value::as_str) {
            debug!("FaqTool::execute: query={:?}", query);
        }

        match self.fetch().await {
            Ok(text) => Ok(ToolOutput::success(text)),
            Err(ToolError::Fetch { reason, .. }) => {
                warn!("FaqTool::execute: fetch from {} failed: {}", self.url, reason);
                Ok(ToolOutput::error(format!(
                    "Error retrieving FAQ content: {}. Cannot answer the query.",
                    reason
                )))
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn truncate_document(text: String, max_chars: usize) -> String {
    if max_chars == 0 {
        return text;
    }
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}\n[document truncated]", &text[..idx]),
        None => text,
    }
}

/// Reduce HTML to whitespace-normalized visible text
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut raw = String::with_capacity(html.len() / 2);
    collect_text(document.root_element(), &mut raw);

    raw.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    let name = element.value().name();
    if SKIPPED_TAGS.contains(&name) {
        return;
    }

    let block = BLOCK_TAGS.contains(&name);
    if block {
        out.push('\n');
    }
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    collect_text(child, out);
                }
            }
            _ => {}
        }
    }
    if block {
        out.push('\n');
    }
}
