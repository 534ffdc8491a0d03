//! Tool for fetching snapshot metrics and recent prices

use crew_core::Result as CrewResult;
use crew_tools::Tool;
use async_trait::async_trait;
use serde_json::Value;

use super::{parse_ticker, ticker_schema};
use crate::cache::{CacheKey, StockCache};
use crate::fetcher::DataFetcher;

/// Tool for key stock metrics and the past month of prices
pub struct StockDataTool {
    fetcher: DataFetcher,
    cache: StockCache,
}

impl StockDataTool {
    /// Create a new stock data tool
    pub fn new(fetcher: DataFetcher, cache: StockCache) -> Self {
        Self { fetcher, cache }
    }
}

#[async_trait]
impl Tool for StockDataTool {
    async fn execute(&self, params: Value) -> CrewResult<Value> {
        let ticker = parse_ticker(params)?;

        let text = self
            .cache
            .get_or_fetch(CacheKey::new(&ticker, "stock_data"), || {
                self.fetcher.fetch_stock_data(&ticker)
            })
            .await?;

        Ok(Value::String(text))
    }

    fn name(&self) -> &str {
        "stock_data"
    }

    fn description(&self) -> &str {
        "Fetch key stock metrics (P/E ratio, EPS, revenue, debt to equity, market cap, \
         dividend yield, open/close, day range, volume) and daily prices for the past month."
    }

    fn input_schema(&self) -> Value {
        ticker_schema()
    }
}
