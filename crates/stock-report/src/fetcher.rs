//! Formats provider data into the text blocks agents read
//!
//! Every snapshot label is always present; a missing value prints as `N/A`
//! so the output has the same shape for every ticker.

use crate::api::MarketDataProvider;
use crate::error::Result;
use crate::model::{MetricSnapshot, NOT_AVAILABLE, NewsItem, PricePoint};
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Most news items included in `fetch_stock_news`
pub const MAX_NEWS_ITEMS: usize = 5;

/// What `fetch_stock_data` includes beyond the snapshot
#[derive(Debug, Clone, Copy)]
pub struct FetchOptions {
    /// Append the trailing month of daily prices
    pub include_history: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            include_history: true,
        }
    }
}

/// Fetches market data and renders it as text
#[derive(Clone)]
pub struct DataFetcher {
    provider: Arc<dyn MarketDataProvider>,
    options: FetchOptions,
}

impl DataFetcher {
    /// Create a fetcher over `provider`
    pub fn new(provider: Arc<dyn MarketDataProvider>, options: FetchOptions) -> Self {
        Self { provider, options }
    }

    /// Snapshot metrics and, if enabled, the past month of prices
    #[instrument(skip(self))]
    pub async fn fetch_stock_data(&self, ticker: &str) -> Result<String> {
        let snapshot = self.provider.snapshot(ticker).await?;
        let history = if self.options.include_history {
            Some(self.provider.history(ticker).await?)
        } else {
            None
        };

        debug!(
            history_points = history.as_ref().map_or(0, Vec::len),
            "Formatting stock data"
        );
        Ok(format_stock_data(ticker, &snapshot, history.as_deref()))
    }

    /// The three annual financial statements
    #[instrument(skip(self))]
    pub async fn fetch_stock_financials(&self, ticker: &str) -> Result<String> {
        let statements = self.provider.statements(ticker).await?;

        Ok(format!(
            "Financial Statements for {ticker}:\n\n\
             Income Statement (Annual):\n{}\n\n\
             Balance Sheet (Annual):\n{}\n\n\
             Cash Flow Statement (Annual):\n{}\n",
            statements.income.render(),
            statements.balance_sheet.render(),
            statements.cash_flow.render(),
        ))
    }

    /// Up to five recent headlines, in provider order
    #[instrument(skip(self))]
    pub async fn fetch_stock_news(&self, ticker: &str) -> Result<String> {
        let news = self.provider.news(ticker).await?;
        Ok(format_news(&news))
    }
}

fn format_stock_data(ticker: &str, snapshot: &MetricSnapshot, history: Option<&[PricePoint]>) -> String {
    let mut output = format!("Stock Data for {ticker}:\n");
    for (metric, value) in snapshot.iter() {
        match value {
            Some(v) => {
                let _ = writeln!(output, "{}: {v}", metric.label());
            }
            None => {
                let _ = writeln!(output, "{}: {NOT_AVAILABLE}", metric.label());
            }
        }
    }

    if let Some(history) = history {
        output.push_str("\nHistorical Stock Prices (Past Month):\n");
        for point in history {
            let _ = writeln!(output, "{point}");
        }
    }

    output
}

fn format_news(news: &[NewsItem]) -> String {
    let entries: Vec<String> = news
        .iter()
        .take(MAX_NEWS_ITEMS)
        .map(ToString::to_string)
        .collect();
    format!("Recent News:\n{}", entries.join("\n\n"))
}
