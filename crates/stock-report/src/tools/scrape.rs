//! Tool for reading the visible text of a web page

use crew_core::Result as CrewResult;
use crew_tools::Tool;
use crew_tools::schema::InputSchema;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

use super::html::HtmlCleaner;
use crate::error::{ReportError, Result};

/// Tool for scraping a page into plain text
pub struct ScrapeWebsiteTool {
    client: reqwest::Client,
    max_chars: usize,
    cleaner: HtmlCleaner,
}

#[derive(Debug, Deserialize)]
struct ScrapeParams {
    website_url: String,
}

impl ScrapeWebsiteTool {
    /// Create a scrape tool returning at most `max_chars` characters per page
    pub fn new(max_chars: usize, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent("Mozilla/5.0 (compatible; stock-report/0.1)")
            .build()?;

        Ok(Self {
            client,
            max_chars,
            cleaner: HtmlCleaner::new().map_err(|e| ReportError::ConfigError(e.to_string()))?,
        })
    }

    #[instrument(skip(self), fields(url = %url))]
    async fn scrape(&self, url: Url) -> Result<String> {
        let response = self.client.get(url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ReportError::Other(format!("{url} returned HTTP {status}")));
        }

        let body = response.text().await?;
        let text = self.cleaner.text(&body, self.max_chars);
        debug!(chars = text.chars().count(), "Scraped page");
        Ok(text)
    }
}

/// Accepts absolute http(s) URLs only
fn parse_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim())
        .map_err(|e| ReportError::Other(format!("Invalid URL '{raw}': {e}")))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(ReportError::Other(format!(
            "Invalid URL '{raw}': unsupported scheme '{scheme}'"
        ))),
    }
}

#[async_trait]
impl Tool for ScrapeWebsiteTool {
    async fn execute(&self, params: Value) -> CrewResult<Value> {
        let params: ScrapeParams = serde_json::from_value(params)
            .map_err(|e| crew_core::Error::ProcessingFailed(format!("Invalid parameters: {e}")))?;

        let url = parse_url(&params.website_url)?;
        let text = self.scrape(url).await?;
        Ok(Value::String(text))
    }

    fn name(&self) -> &str {
        "scrape_website"
    }

    fn description(&self) -> &str {
        "Read the visible text content of a web page."
    }

    fn input_schema(&self) -> Value {
        InputSchema::new()
            .required("website_url", "string", "Absolute http(s) URL of the page to read")
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use httpmock::prelude::*;

    fn tool(max_chars: usize) -> ScrapeWebsiteTool {
        ScrapeWebsiteTool::new(max_chars, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_parse_url() {
        assert!(parse_url("https://www.reuters.com/markets").is_ok());
        assert!(parse_url("not a url").is_err());
        assert!(parse_url("ftp://example.com/file").is_err());
        assert!(parse_url("/relative/path").is_err());
    }

    #[tokio::test]
    async fn test_scrape_returns_visible_text() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/article");
                then.status(200).body(
                    "<html><head><style>p{}</style></head>\
                     <body><script>track()</script><p>IBM   beat\n estimates</p></body></html>",
                );
            })
            .await;

        let result = tool(100)
            .execute(json!({"website_url": server.url("/article")}))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(result, "IBM beat estimates");
    }

    #[tokio::test]
    async fn test_scrape_truncates() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/long");
                then.status(200).body(format!("<p>{}</p>", "a".repeat(50)));
            })
            .await;

        let result = tool(10)
            .execute(json!({"website_url": server.url("/long")}))
            .await
            .unwrap();

        assert_eq!(result, "aaaaaaaaaa...");
    }

    #[tokio::test]
    async fn test_scrape_http_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/missing");
                then.status(404);
            })
            .await;

        let result = tool(100)
            .execute(json!({"website_url": server.url("/missing")}))
            .await;

        assert!(matches!(result, Err(crew_core::Error::ProcessingFailed(msg)) if msg.contains("404")));
    }

    #[tokio::test]
    async fn test_invalid_url_rejected() {
        let result = tool(100).execute(json!({"website_url": "javascript:alert(1)"})).await;
        assert!(matches!(result, Err(crew_core::Error::ProcessingFailed(msg)) if msg.contains("Invalid URL")));
    }
}
