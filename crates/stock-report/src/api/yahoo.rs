//! Yahoo Finance client
//!
//! Snapshot metrics, statements and news come from the JSON query endpoints,
//! which need a session cookie and a matching crumb. The cookie lives in the
//! client's jar; the crumb is fetched once and reused until Yahoo rejects it.
//! Daily price history goes through `yahoo_finance_api`.

use super::MarketDataProvider;
use crate::error::{ReportError, Result};
use crate::model::{
    FinancialStatementSet, Metric, MetricSnapshot, NOT_AVAILABLE, NewsItem, PricePoint,
    StatementTable,
};
use async_trait::async_trait;
use chrono::DateTime;
use reqwest::{Client, StatusCode, header};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};
use yahoo_finance_api as yahoo;

const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";
const REFERER: &str = "https://finance.yahoo.com/";
const PROVIDER: &str = "Yahoo Finance";

const SNAPSHOT_MODULES: [&str; 4] = ["summaryDetail", "defaultKeyStatistics", "financialData", "price"];
const STATEMENT_MODULES: &str = "incomeStatementHistory,balanceSheetHistory,cashflowStatementHistory";
const NEWS_COUNT: usize = 5;
const MAX_CRUMB_LEN: usize = 100;

const HISTORY_INTERVAL: &str = "1d";
const HISTORY_RANGE: &str = "1mo";

/// Where the client sends requests
#[derive(Debug, Clone)]
pub struct YahooEndpoints {
    /// Page that sets the session cookie
    pub cookie: String,
    /// Query hosts, tried in order for the crumb; the first serves data
    pub query: Vec<String>,
}

impl Default for YahooEndpoints {
    fn default() -> Self {
        Self {
            cookie: "https://fc.yahoo.com".to_string(),
            query: vec![
                "https://query1.finance.yahoo.com".to_string(),
                "https://query2.finance.yahoo.com".to_string(),
            ],
        }
    }
}

/// Yahoo Finance API client
pub struct YahooClient {
    http: Client,
    /// Chart endpoint client, used for price history
    charts: yahoo::YahooConnector,
    endpoints: YahooEndpoints,
    crumb: Mutex<Option<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteSummaryResponse {
    quote_summary: QuoteSummary,
}

#[derive(Debug, Deserialize)]
struct QuoteSummary {
    #[serde(default)]
    result: Option<Vec<Map<String, Value>>>,
    #[serde(default)]
    error: Option<YahooApiError>,
}

#[derive(Debug, Deserialize)]
struct YahooApiError {
    code: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    news: Vec<SearchNews>,
}

#[derive(Debug, Deserialize)]
struct SearchNews {
    title: Option<String>,
    publisher: Option<String>,
    link: Option<String>,
}

impl YahooClient {
    /// Create a client for the public Yahoo endpoints
    pub fn new(timeout: Duration) -> Result<Self> {
        Self::with_endpoints(timeout, YahooEndpoints::default())
    }

    /// Create a client for custom endpoints
    pub fn with_endpoints(timeout: Duration, endpoints: YahooEndpoints) -> Result<Self> {
        if endpoints.query.is_empty() {
            return Err(ReportError::ConfigError(
                "at least one Yahoo query endpoint is required".to_string(),
            ));
        }

        let http = Client::builder()
            .cookie_store(true)
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        let charts = yahoo::YahooConnector::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ReportError::YahooFinanceError(e.to_string()))?;

        Ok(Self {
            http,
            charts,
            endpoints,
            crumb: Mutex::new(None),
        })
    }

    fn data_host(&self) -> &str {
        self.endpoints.query[0].trim_end_matches('/')
    }

    /// Cached crumb, fetching a new one if needed
    async fn crumb(&self) -> Result<String> {
        let mut crumb = self.crumb.lock().await;
        if let Some(value) = crumb.as_ref() {
            return Ok(value.clone());
        }

        let fresh = self.fetch_crumb().await?;
        *crumb = Some(fresh.clone());
        Ok(fresh)
    }

    async fn fetch_crumb(&self) -> Result<String> {
        // The cookie page answers 404 but still sets the session cookie
        self.http
            .get(&self.endpoints.cookie)
            .header(header::REFERER, REFERER)
            .send()
            .await?;

        for host in &self.endpoints.query {
            let url = format!("{}/v1/test/getcrumb", host.trim_end_matches('/'));
            let response = match self.http.get(&url).header(header::REFERER, REFERER).send().await {
                Ok(response) => response,
                Err(e) => {
                    warn!(url = %url, error = %e, "Crumb request failed");
                    continue;
                }
            };

            if response.status() == StatusCode::TOO_MANY_REQUESTS {
                return Err(ReportError::RateLimitExceeded {
                    provider: PROVIDER.to_string(),
                });
            }
            if !response.status().is_success() {
                continue;
            }

            let body = response.text().await?;
            let body = body.trim();
            if body.contains("<html") || body.contains("<!DOCTYPE") {
                continue;
            }
            if body.to_lowercase().contains("too many requests") {
                return Err(ReportError::RateLimitExceeded {
                    provider: PROVIDER.to_string(),
                });
            }
            if !body.is_empty() && body.len() < MAX_CRUMB_LEN && !body.contains(' ') {
                debug!(url = %url, "Fetched Yahoo crumb");
                return Ok(body.to_string());
            }
        }

        Err(ReportError::YahooFinanceError(
            "failed to fetch crumb from all endpoints".to_string(),
        ))
    }

    async fn invalidate_crumb(&self) {
        *self.crumb.lock().await = None;
    }

    /// GET `url`, mapping rate limiting and auth rejection
    async fn send(&self, url: &str) -> Result<reqwest::Response> {
        let response = self
            .http
            .get(url)
            .header(header::REFERER, REFERER)
            .send()
            .await?;

        match response.status() {
            StatusCode::TOO_MANY_REQUESTS => Err(ReportError::RateLimitExceeded {
                provider: PROVIDER.to_string(),
            }),
            status @ (StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) => {
                self.invalidate_crumb().await;
                Err(ReportError::YahooFinanceError(format!(
                    "request rejected with {status}"
                )))
            }
            _ => Ok(response),
        }
    }

    /// First quoteSummary result for `ticker` with the given modules
    async fn quote_summary(&self, ticker: &str, modules: &str) -> Result<Map<String, Value>> {
        let crumb = self.crumb().await?;
        let url = format!(
            "{}/v10/finance/quoteSummary/{}?modules={}&crumb={}",
            self.data_host(),
            urlencoding::encode(ticker),
            modules,
            urlencoding::encode(&crumb)
        );

        let response = self.send(&url).await?;
        let status = response.status();
        let body = response.text().await?;

        let parsed: QuoteSummaryResponse = serde_json::from_str(&body).map_err(|e| {
            if status.is_success() {
                ReportError::JsonError(e)
            } else {
                ReportError::YahooFinanceError(format!("quoteSummary returned {status}"))
            }
        })?;

        if let Some(error) = parsed.quote_summary.error {
            return Err(ReportError::DataUnavailable {
                ticker: ticker.to_string(),
                reason: error
                    .description
                    .or(error.code)
                    .unwrap_or_else(|| "unknown error".to_string()),
            });
        }

        parsed
            .quote_summary
            .result
            .and_then(|results| results.into_iter().next())
            .ok_or_else(|| ReportError::DataUnavailable {
                ticker: ticker.to_string(),
                reason: "empty quoteSummary result".to_string(),
            })
    }
}

#[async_trait]
impl MarketDataProvider for YahooClient {
    #[instrument(skip(self))]
    async fn snapshot(&self, ticker: &str) -> Result<MetricSnapshot> {
        let result = self.quote_summary(ticker, &SNAPSHOT_MODULES.join(",")).await?;
        Ok(parse_snapshot(&result))
    }

    #[instrument(skip(self))]
    async fn history(&self, ticker: &str) -> Result<Vec<PricePoint>> {
        let response = self
            .charts
            .get_quote_range(ticker, HISTORY_INTERVAL, HISTORY_RANGE)
            .await
            .map_err(|e| ReportError::YahooFinanceError(e.to_string()))?;

        let quotes = response
            .quotes()
            .map_err(|e| ReportError::YahooFinanceError(e.to_string()))?;

        let mut points: Vec<PricePoint> = quotes
            .iter()
            .filter_map(|q| {
                let date = DateTime::from_timestamp(q.timestamp as i64, 0)?.date_naive();
                Some(PricePoint {
                    date,
                    open: q.open,
                    high: q.high,
                    low: q.low,
                    close: q.close,
                    volume: q.volume,
                })
            })
            .collect();
        points.sort_by_key(|p| p.date);

        debug!(points = points.len(), "Fetched price history");
        Ok(points)
    }

    #[instrument(skip(self))]
    async fn statements(&self, ticker: &str) -> Result<FinancialStatementSet> {
        let result = self.quote_summary(ticker, STATEMENT_MODULES).await?;
        Ok(FinancialStatementSet {
            income: parse_statement(&result, "incomeStatementHistory", "incomeStatementHistory"),
            balance_sheet: parse_statement(&result, "balanceSheetHistory", "balanceSheetStatements"),
            cash_flow: parse_statement(&result, "cashflowStatementHistory", "cashflowStatements"),
        })
    }

    #[instrument(skip(self))]
    async fn news(&self, ticker: &str) -> Result<Vec<NewsItem>> {
        let crumb = self.crumb().await?;
        let url = format!(
            "{}/v1/finance/search?q={}&quotesCount=0&newsCount={}&crumb={}",
            self.data_host(),
            urlencoding::encode(ticker),
            NEWS_COUNT,
            urlencoding::encode(&crumb)
        );

        let response = self.send(&url).await?;
        if !response.status().is_success() {
            return Err(ReportError::YahooFinanceError(format!(
                "search returned {}",
                response.status()
            )));
        }

        let parsed: SearchResponse = response.json().await?;
        Ok(parsed
            .news
            .into_iter()
            .take(NEWS_COUNT)
            .map(|n| NewsItem {
                title: n.title,
                publisher: n.publisher,
                link: n.link,
            })
            .collect())
    }
}

/// Number from a Yahoo field, either `{"raw": x, "fmt": ..}` or bare
fn raw_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Object(o) => o.get("raw").and_then(Value::as_f64),
        _ => None,
    }
}

fn parse_snapshot(result: &Map<String, Value>) -> MetricSnapshot {
    let mut snapshot = MetricSnapshot::new();
    for metric in Metric::ALL {
        let value = SNAPSHOT_MODULES.iter().find_map(|module| {
            result
                .get(*module)?
                .get(metric.yahoo_key())
                .and_then(raw_number)
        });
        if let Some(value) = value {
            snapshot.set(metric, value);
        }
    }
    snapshot
}

fn parse_statement(result: &Map<String, Value>, module: &str, list_key: &str) -> StatementTable {
    let Some(entries) = result
        .get(module)
        .and_then(|m| m.get(list_key))
        .and_then(Value::as_array)
    else {
        return StatementTable::default();
    };

    let periods = entries
        .iter()
        .map(|entry| {
            entry
                .get("endDate")
                .and_then(|d| d.get("fmt"))
                .and_then(Value::as_str)
                .map_or_else(|| NOT_AVAILABLE.to_string(), str::to_string)
        })
        .collect();

    let mut items: Vec<&str> = Vec::new();
    for entry in entries.iter().filter_map(Value::as_object) {
        for key in entry.keys() {
            if key != "maxAge" && key != "endDate" && !items.contains(&key.as_str()) {
                items.push(key);
            }
        }
    }

    let rows = items
        .into_iter()
        .map(|item| {
            let cells = entries
                .iter()
                .map(|entry| entry.get(item).and_then(raw_number))
                .collect();
            (title_case(item), cells)
        })
        .collect();

    StatementTable { periods, rows }
}

/// `totalRevenue` -> `Total Revenue`
fn title_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for (i, c) in key.chars().enumerate() {
        if i == 0 {
            out.extend(c.to_uppercase());
        } else {
            if c.is_uppercase() {
                out.push(' ');
            }
            out.push(c);
        }
    }
    out
}
