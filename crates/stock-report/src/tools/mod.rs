//! Tools the report agents can call

pub mod financials;
mod html;
pub mod news;
pub mod scrape;
pub mod stock_data;
pub mod web_search;

pub use financials::StockFinancialsTool;
pub use news::StockNewsTool;
pub use scrape::ScrapeWebsiteTool;
pub use stock_data::StockDataTool;
pub use web_search::WebSearchTool;

use crew_tools::schema::InputSchema;
use serde::Deserialize;
use serde_json::Value;

/// Input shared by the ticker tools
#[derive(Debug, Deserialize)]
struct TickerParams {
    ticker: String,
}

/// Trimmed ticker from tool input
fn parse_ticker(params: Value) -> crew_core::Result<String> {
    let params: TickerParams = serde_json::from_value(params)
        .map_err(|e| crew_core::Error::ProcessingFailed(format!("Invalid parameters: {e}")))?;

    let ticker = params.ticker.trim();
    if ticker.is_empty() {
        return Err(crew_core::Error::ProcessingFailed(
            "ticker must not be empty".to_string(),
        ));
    }
    Ok(ticker.to_string())
}

fn ticker_schema() -> Value {
    InputSchema::new()
        .required("ticker", "string", "Stock ticker symbol (e.g., 'IBM', 'AAPL')")
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_ticker_trims() {
        assert_eq!(parse_ticker(json!({"ticker": "  IBM "})).unwrap(), "IBM");
    }

    #[test]
    fn test_parse_ticker_rejects_empty_and_missing() {
        assert!(parse_ticker(json!({"ticker": "   "})).is_err());
        assert!(parse_ticker(json!({"symbol": "IBM"})).is_err());
    }

    #[test]
    fn test_ticker_schema() {
        let schema = ticker_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["required"][0], "ticker");
    }
}
