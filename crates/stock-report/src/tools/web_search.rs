//! Web search over an HTML results page

use crew_core::Result as CrewResult;
use crew_tools::Tool;
use crew_tools::schema::InputSchema;
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::fmt::Write as _;
use std::time::Duration;
use tracing::{debug, instrument};

use super::html::{HtmlCleaner, decode_entities};
use crate::error::{ReportError, Result};

/// Tool for searching the web and returning result titles and links
pub struct WebSearchTool {
    client: reqwest::Client,
    endpoint: String,
    result_anchor: Regex,
    href: Regex,
    cleaner: HtmlCleaner,
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    query: String,
    #[serde(default = "default_max_results")]
    max_results: usize,
}

fn default_max_results() -> usize {
    5
}

/// One search hit
#[derive(Debug, Clone, PartialEq, Eq)]
struct SearchHit {
    title: String,
    link: String,
}

impl WebSearchTool {
    /// Create a search tool against an HTML results endpoint
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent("Mozilla/5.0 (compatible; stock-report/0.1)")
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            result_anchor: Regex::new(
                r#"(?is)<a\s([^>]*class="[^"]*result__a[^"]*"[^>]*)>(.*?)</a>"#,
            )
            .map_err(|e| ReportError::ConfigError(e.to_string()))?,
            href: Regex::new(r#"href="([^"]*)""#)
                .map_err(|e| ReportError::ConfigError(e.to_string()))?,
            cleaner: HtmlCleaner::new().map_err(|e| ReportError::ConfigError(e.to_string()))?,
        })
    }

    #[instrument(skip(self))]
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("q", query)])
            .send()
            .await?
            .error_for_status()?;
        let body = response.text().await?;

        let hits = self.parse_results(&body, max_results);
        debug!(count = hits.len(), "Parsed search results");
        Ok(hits)
    }

    fn parse_results(&self, body: &str, max_results: usize) -> Vec<SearchHit> {
        self.result_anchor
            .captures_iter(body)
            .filter_map(|caps| {
                let attrs = caps.get(1)?.as_str();
                let raw_href = self.href.captures(attrs)?.get(1)?.as_str();
                let link = resolve_link(&decode_entities(raw_href))?;
                let title = self.cleaner.inline(caps.get(2)?.as_str());
                Some(SearchHit { title, link })
            })
            .take(max_results)
            .collect()
    }
}

/// Unwraps redirect links (`/l/?uddg=<encoded>`) to the target URL
fn resolve_link(href: &str) -> Option<String> {
    if let Some(start) = href.find("uddg=") {
        let encoded = &href[start + 5..];
        let encoded = encoded.split('&').next().unwrap_or(encoded);
        return urlencoding::decode(encoded).ok().map(|s| s.into_owned());
    }

    if href.starts_with("//") {
        return Some(format!("https:{href}"));
    }
    if href.starts_with("http://") || href.starts_with("https://") {
        return Some(href.to_string());
    }
    None
}

fn format_hits(query: &str, hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return format!("No results found for '{query}'.");
    }

    let mut output = format!("Search results for '{query}':\n");
    for (i, hit) in hits.iter().enumerate() {
        let _ = write!(output, "\n{}. {}\n   {}\n", i + 1, hit.title, hit.link);
    }
    output
}

#[async_trait]
impl Tool for WebSearchTool {
    async fn execute(&self, params: Value) -> CrewResult<Value> {
        let params: SearchParams = serde_json::from_value(params)
            .map_err(|e| crew_core::Error::ProcessingFailed(format!("Invalid parameters: {e}")))?;

        let query = params.query.trim();
        if query.is_empty() {
            return Err(crew_core::Error::ProcessingFailed(
                "query must not be empty".to_string(),
            ));
        }

        let hits = self.search(query, params.max_results).await?;
        Ok(Value::String(format_hits(query, &hits)))
    }

    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web and return the titles and links of the top results. \
         Use scrape_website to read a result."
    }

    fn input_schema(&self) -> Value {
        InputSchema::new()
            .required("query", "string", "Search query")
            .optional("max_results", "integer", "Maximum number of results (default 5)")
            .build()
    }
}
