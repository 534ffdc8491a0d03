//! Tool for fetching recent company news

use crew_core::Result as CrewResult;
use crew_tools::Tool;
use async_trait::async_trait;
use serde_json::Value;

use super::{parse_ticker, ticker_schema};
use crate::cache::{CacheKey, StockCache};
use crate::fetcher::DataFetcher;

/// Tool for the latest headlines about a ticker
pub struct StockNewsTool {
    fetcher: DataFetcher,
    cache: StockCache,
}

impl StockNewsTool {
    /// Create a new news tool
    pub fn new(fetcher: DataFetcher, cache: StockCache) -> Self {
        Self { fetcher, cache }
    }
}

#[async_trait]
impl Tool for StockNewsTool {
    async fn execute(&self, params: Value) -> CrewResult<Value> {
        let ticker = parse_ticker(params)?;

        let text = self
            .cache
            .get_or_fetch(CacheKey::new(&ticker, "stock_news"), || {
                self.fetcher.fetch_stock_news(&ticker)
            })
            .await?;

        Ok(Value::String(text))
    }

    fn name(&self) -> &str {
        "stock_news"
    }

    fn description(&self) -> &str {
        "Fetch up to five recent news articles about the company behind a stock ticker, \
         with title, publisher and link."
    }

    fn input_schema(&self) -> Value {
        ticker_schema()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockMarketDataProvider;
    use crate::fetcher::FetchOptions;
    use crate::model::NewsItem;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_execute() {
        let mut mock = MockMarketDataProvider::new();
        mock.expect_news().returning(|_| {
            Ok(vec![NewsItem {
                title: Some("IBM raises guidance".to_string()),
                publisher: None,
                link: Some("https://example.com/ibm".to_string()),
            }])
        });

        let fetcher = DataFetcher::new(Arc::new(mock), FetchOptions::default());
        let tool = StockNewsTool::new(fetcher, StockCache::new(Duration::from_secs(60)));

        assert_eq!(tool.name(), "stock_news");
        let result = tool.execute(json!({"ticker": "IBM"})).await.unwrap();
        assert_eq!(
            result,
            "Recent News:\nIBM raises guidance - Published by Unknown publisher. \
             Read more: https://example.com/ibm"
        );
    }

    #[tokio::test]
    async fn test_missing_ticker() {
        let fetcher = DataFetcher::new(
            Arc::new(MockMarketDataProvider::new()),
            FetchOptions::default(),
        );
        let tool = StockNewsTool::new(fetcher, StockCache::new(Duration::from_secs(60)));

        let result = tool.execute(json!({})).await;
        assert!(matches!(result, Err(crew_core::Error::ProcessingFailed(_))));
    }
}
