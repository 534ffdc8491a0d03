//! Market data types returned by providers and rendered by the fetcher

use chrono::NaiveDate;
use comfy_table::{Table, presets};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Placeholder for a value the provider did not return
pub const NOT_AVAILABLE: &str = "N/A";

/// The snapshot metrics, in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Metric {
    ForwardPe,
    TrailingEps,
    TotalRevenue,
    DebtToEquity,
    MarketCap,
    DividendYield,
    Open,
    PreviousClose,
    DayHigh,
    DayLow,
    Volume,
}

impl Metric {
    /// Every metric, in display order
    pub const ALL: [Metric; 11] = [
        Metric::ForwardPe,
        Metric::TrailingEps,
        Metric::TotalRevenue,
        Metric::DebtToEquity,
        Metric::MarketCap,
        Metric::DividendYield,
        Metric::Open,
        Metric::PreviousClose,
        Metric::DayHigh,
        Metric::DayLow,
        Metric::Volume,
    ];

    /// Human-readable label
    pub fn label(self) -> &'static str {
        match self {
            Metric::ForwardPe => "P/E Ratio",
            Metric::TrailingEps => "EPS",
            Metric::TotalRevenue => "Revenue",
            Metric::DebtToEquity => "Debt to Equity",
            Metric::MarketCap => "Market Cap",
            Metric::DividendYield => "Dividend Yield",
            Metric::Open => "Open Price",
            Metric::PreviousClose => "Close Price",
            Metric::DayHigh => "Day High",
            Metric::DayLow => "Day Low",
            Metric::Volume => "Volume",
        }
    }

    /// Field name in Yahoo's quoteSummary modules
    pub fn yahoo_key(self) -> &'static str {
        match self {
            Metric::ForwardPe => "forwardPE",
            Metric::TrailingEps => "trailingEps",
            Metric::TotalRevenue => "totalRevenue",
            Metric::DebtToEquity => "debtToEquity",
            Metric::MarketCap => "marketCap",
            Metric::DividendYield => "dividendYield",
            Metric::Open => "open",
            Metric::PreviousClose => "previousClose",
            Metric::DayHigh => "dayHigh",
            Metric::DayLow => "dayLow",
            Metric::Volume => "volume",
        }
    }
}

/// Point-in-time metrics for one ticker
///
/// A metric the provider did not return is absent, never zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricSnapshot {
    values: HashMap<Metric, f64>,
}

impl MetricSnapshot {
    /// Snapshot with no values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `metric`, ignoring non-finite values
    pub fn with(mut self, metric: Metric, value: f64) -> Self {
        self.set(metric, value);
        self
    }

    /// Set `metric`, ignoring non-finite values
    pub fn set(&mut self, metric: Metric, value: f64) {
        if value.is_finite() {
            self.values.insert(metric, value);
        }
    }

    /// Value of `metric`, if the provider returned one
    pub fn get(&self, metric: Metric) -> Option<f64> {
        self.values.get(&metric).copied()
    }

    /// Every metric with its value, in display order
    pub fn iter(&self) -> impl Iterator<Item = (Metric, Option<f64>)> + '_ {
        Metric::ALL.into_iter().map(|m| (m, self.get(m)))
    }
}

/// One trading day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl fmt::Display for PricePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Date: {}, Open: {:.2}, High: {:.2}, Low: {:.2}, Close: {:.2}, Volume: {}",
            self.date, self.open, self.high, self.low, self.close, self.volume
        )
    }
}

/// A news headline
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: Option<String>,
    pub publisher: Option<String>,
    pub link: Option<String>,
}

impl fmt::Display for NewsItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - Published by {}. Read more: {}",
            self.title.as_deref().unwrap_or("No title available"),
            self.publisher.as_deref().unwrap_or("Unknown publisher"),
            self.link.as_deref().unwrap_or("No link available"),
        )
    }
}

/// A financial statement: line items by reporting period
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatementTable {
    /// Column headers, newest period first
    pub periods: Vec<String>,
    /// Line item name and one cell per period
    pub rows: Vec<(String, Vec<Option<f64>>)>,
}

impl StatementTable {
    /// Whether the statement has no line items
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Render as a text table, missing cells as `N/A`
    pub fn render(&self) -> String {
        if self.is_empty() {
            return "Empty statement".to_string();
        }

        let mut table = Table::new();
        table.load_preset(presets::ASCII_MARKDOWN);

        let mut header = vec![String::new()];
        header.extend(self.periods.iter().cloned());
        table.set_header(header);

        for (item, cells) in &self.rows {
            let mut row = vec![item.clone()];
            row.extend((0..self.periods.len()).map(|i| {
                cells
                    .get(i)
                    .copied()
                    .flatten()
                    .map_or_else(|| NOT_AVAILABLE.to_string(), |v| v.to_string())
            }));
            table.add_row(row);
        }

        table.to_string()
    }
}

/// The three annual statements
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FinancialStatementSet {
    pub income: StatementTable,
    pub balance_sheet: StatementTable,
    pub cash_flow: StatementTable,
}
