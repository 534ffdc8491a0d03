//! Market data providers

pub mod yahoo;

pub use yahoo::{YahooClient, YahooEndpoints};

use crate::error::Result;
use crate::model::{FinancialStatementSet, MetricSnapshot, NewsItem, PricePoint};
use async_trait::async_trait;

/// Source of per-ticker market data
///
/// Implementations return the provider's error unchanged; callers decide
/// whether a failure is fatal.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Latest snapshot metrics
    async fn snapshot(&self, ticker: &str) -> Result<MetricSnapshot>;

    /// Daily prices over the trailing month, oldest first
    async fn history(&self, ticker: &str) -> Result<Vec<PricePoint>>;

    /// Annual income statement, balance sheet and cash flow
    async fn statements(&self, ticker: &str) -> Result<FinancialStatementSet>;

    /// Recent news, most recent first
    async fn news(&self, ticker: &str) -> Result<Vec<NewsItem>>;
}
