//! Full report runs against in-process fakes

use async_trait::async_trait;
use chrono::NaiveDate;
use crew_llm::testing::{ScriptedProvider, text_response, tool_call_response};
use crew_llm::{CompletionRequest, CompletionResponse, Message};
use lettre::transport::stub::AsyncStubTransport;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use stock_report::model::{
    FinancialStatementSet, Metric, MetricSnapshot, NewsItem, PricePoint, StatementTable,
};
use stock_report::{
    DeliveryStatus, DocumentRenderer, EmailRequest, MarketDataProvider, ReportConfig,
    ReportDispatcher, ReportGraph, ReportPipeline, Result,
};

const REPORT: &str = "# IBM Stock Analysis\n\n\
| Metric | Value |\n|---|---|\n| P/E Ratio | 17.2 |\n\n\
## Conclusion\n\nHold.\n";

struct FakeMarket;

#[async_trait]
impl MarketDataProvider for FakeMarket {
    async fn snapshot(&self, _ticker: &str) -> Result<MetricSnapshot> {
        Ok(MetricSnapshot::new()
            .with(Metric::ForwardPe, 17.2)
            .with(Metric::TrailingEps, 8.14)
            .with(Metric::MarketCap, 1.7e11))
    }

    async fn history(&self, _ticker: &str) -> Result<Vec<PricePoint>> {
        Ok(vec![PricePoint {
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap_or_default(),
            open: 185.5,
            high: 188.0,
            low: 184.9,
            close: 187.1,
            volume: 3_200_000,
        }])
    }

    async fn statements(&self, _ticker: &str) -> Result<FinancialStatementSet> {
        Ok(FinancialStatementSet {
            income: StatementTable {
                periods: vec!["2023-12-31".to_string()],
                rows: vec![("Total Revenue".to_string(), vec![Some(61_860.0)])],
            },
            ..FinancialStatementSet::default()
        })
    }

    async fn news(&self, _ticker: &str) -> Result<Vec<NewsItem>> {
        Ok(vec![NewsItem {
            title: Some("IBM beats estimates".to_string()),
            publisher: Some("Reuters".to_string()),
            link: Some("https://example.com/ibm".to_string()),
        }])
    }
}

struct CopyRenderer;

#[async_trait]
impl DocumentRenderer for CopyRenderer {
    async fn render(&self, html: &Path, pdf: &Path) -> Result<()> {
        tokio::fs::copy(html, pdf).await?;
        Ok(())
    }

    fn name(&self) -> &str {
        "copy"
    }
}

fn role_of(request: &CompletionRequest) -> String {
    request
        .system
        .as_deref()
        .and_then(|s| s.strip_prefix("You are "))
        .and_then(|s| s.split('.').next())
        .unwrap_or("unknown")
        .to_string()
}

/// Content of the latest tool result, if the agent already called a tool
fn last_tool_result(request: &CompletionRequest) -> Option<String> {
    match request.messages.last()? {
        Message::Tool { content, .. } => Some(content.clone()),
        _ => None,
    }
}

/// Collector and reader call one tool each and echo its result
fn agent_answer(request: &CompletionRequest) -> crew_llm::Result<CompletionResponse> {
    let role = role_of(request);
    let tool = match role.as_str() {
        "Stock Data Collector" => Some("stock_data"),
        "News Reader" => Some("stock_news"),
        _ => None,
    };

    if let Some(tool) = tool {
        return Ok(match last_tool_result(request) {
            Some(result) => text_response(result),
            None => tool_call_response("call-1", tool, json!({"ticker": "IBM"})),
        });
    }

    Ok(match role.as_str() {
        "Project Manager" => text_response("data_collection"),
        "Task Execution Planner" => text_response("1. Collect data. 2. Read news. 3. Write."),
        "Financial Analyst" => text_response(REPORT),
        other => text_response(format!("{other} notes")),
    })
}

fn config(graph: ReportGraph, planning: bool, dir: &Path) -> ReportConfig {
    ReportConfig::builder()
        .graph(graph)
        .planning(planning)
        .output_dir(dir)
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_ibm_report_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let provider = Arc::new(ScriptedProvider::responding(agent_answer));
    let dispatcher = Arc::new(ReportDispatcher::new(
        AsyncStubTransport::new_ok(),
        "bot@example.com",
    ));

    let pipeline = ReportPipeline::builder(config(ReportGraph::Reduced, false, dir.path()))
        .llm(provider.clone())
        .market(Arc::new(FakeMarket))
        .renderer(Arc::new(CopyRenderer))
        .mailer(dispatcher)
        .build()
        .unwrap();

    let outcome = pipeline
        .run("  IBM ", Some(&EmailRequest::to("analyst@example.com")))
        .await
        .unwrap();

    assert_eq!(outcome.ticker, "IBM");

    let data = outcome.crew.task("data_collection").unwrap();
    assert!(data.raw.starts_with("Stock Data for IBM:\n"));
    for metric in Metric::ALL {
        assert!(data.raw.contains(&format!("\n{}: ", metric.label())));
    }
    assert!(data.raw.contains("P/E Ratio: 17.2\n"));
    assert!(data.raw.contains("Dividend Yield: N/A\n"));
    assert!(data.raw.contains("Date: 2024-03-01, Open: 185.50"));

    let news = outcome.crew.task("news_reading").unwrap();
    assert!(news.raw.contains("IBM beats estimates - Published by Reuters."));

    let analyst_prompt = provider
        .requests()
        .iter()
        .find(|r| role_of(r) == "Financial Analyst")
        .and_then(|r| r.messages[0].text().map(str::to_string))
        .unwrap();
    assert!(analyst_prompt.contains("P/E Ratio: 17.2"));
    assert!(analyst_prompt.contains("IBM beats estimates"));

    assert_eq!(outcome.crew.raw, REPORT);
    assert_eq!(std::fs::read_to_string(&outcome.report).unwrap(), REPORT);

    let html = std::fs::read_to_string(&outcome.converted.html).unwrap();
    assert!(html.contains("<h1>IBM Stock Analysis</h1>"));
    assert!(html.contains("<table>"));
    assert!(outcome.converted.pdf.exists());

    assert_eq!(outcome.delivery, Some(DeliveryStatus::Delivered));
}

#[tokio::test]
async fn test_full_graph_runs_every_stage() {
    let dir = tempfile::tempdir().unwrap();
    let provider = Arc::new(ScriptedProvider::responding(agent_answer));

    let pipeline = ReportPipeline::builder(config(ReportGraph::Full, true, dir.path()))
        .llm(provider.clone())
        .market(Arc::new(FakeMarket))
        .renderer(Arc::new(CopyRenderer))
        .build()
        .unwrap();

    let outcome = pipeline.run("IBM", None).await.unwrap();

    let names: Vec<&str> = outcome
        .crew
        .tasks_output
        .iter()
        .map(|t| t.name.as_str())
        .collect();
    assert_eq!(names.len(), 4);
    assert_eq!(names.last(), Some(&"financial_analysis"));
    assert!(names.contains(&"market_research"));
    assert!(outcome.delivery.is_none());

    let roles: Vec<String> = provider.requests().iter().map(role_of).collect();
    assert_eq!(roles[0], "Task Execution Planner");
    assert!(roles.iter().any(|r| r == "Project Manager"));
    assert_eq!(roles.last().map(String::as_str), Some("Financial Analyst"));
}

#[tokio::test]
async fn test_failed_delivery_does_not_fail_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let dispatcher = Arc::new(ReportDispatcher::new(
        AsyncStubTransport::new_error(),
        "bot@example.com",
    ));

    let pipeline = ReportPipeline::builder(config(ReportGraph::Reduced, false, dir.path()))
        .llm(Arc::new(ScriptedProvider::responding(agent_answer)))
        .market(Arc::new(FakeMarket))
        .renderer(Arc::new(CopyRenderer))
        .mailer(dispatcher)
        .build()
        .unwrap();

    let outcome = pipeline
        .run("IBM", Some(&EmailRequest::to("analyst@example.com")))
        .await
        .unwrap();

    assert!(matches!(outcome.delivery, Some(DeliveryStatus::Failed(_))));
    assert!(outcome.converted.html.exists());
}
