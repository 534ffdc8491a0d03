//! Tool for fetching annual financial statements

use crew_core::Result as CrewResult;
use crew_tools::Tool;
use async_trait::async_trait;
use serde_json::Value;

use super::{parse_ticker, ticker_schema};
use crate::cache::{CacheKey, StockCache};
use crate::fetcher::DataFetcher;

/// Tool for the income statement, balance sheet and cash flow statement
pub struct StockFinancialsTool {
    fetcher: DataFetcher,
    cache: StockCache,
}

impl StockFinancialsTool {
    /// Create a new financial statements tool
    pub fn new(fetcher: DataFetcher, cache: StockCache) -> Self {
        Self { fetcher, cache }
    }
}

#[async_trait]
impl Tool for StockFinancialsTool {
    async fn execute(&self, params: Value) -> CrewResult<Value> {
        let ticker = parse_ticker(params)?;

        let text = self
            .cache
            .get_or_fetch(CacheKey::new(&ticker, "stock_financials"), || {
                self.fetcher.fetch_stock_financials(&ticker)
            })
            .await?;

        Ok(Value::String(text))
    }

    fn name(&self) -> &str {
        "stock_financials"
    }

    fn description(&self) -> &str {
        "Fetch the annual income statement, balance sheet and cash flow statement \
         for a stock ticker."
    }

    fn input_schema(&self) -> Value {
        ticker_schema()
    }
}
