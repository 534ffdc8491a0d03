//! The report crew: agents, tasks and how they are wired
//!
//! Four stages feed the final report:
//!
//! ```text
//! data_collection ──┐
//! news_reading ─────┼──> financial_analysis ──> stock_report.txt
//! market_research ──┘
//! ```
//!
//! [`ReportGraph::Reduced`] drops `market_research` and runs sequentially.
//! [`ReportGraph::Full`] lets the Project Manager pick among ready stages.

use crate::api::MarketDataProvider;
use crate::cache::StockCache;
use crate::config::ReportConfig;
use crate::error::Result;
use crate::fetcher::{DataFetcher, FetchOptions};
use crate::tools::{
    ScrapeWebsiteTool, StockDataTool, StockFinancialsTool, StockNewsTool, WebSearchTool,
};
use crew_runtime::AgentRuntime;
use crew_tools::ToolRegistry;
use crew_workflow::{AgentSpec, Crew, CrewEventHandler, Process, TaskSpec};
use std::sync::Arc;
use tracing::{debug, info};

/// File the final stage writes, relative to the output directory
pub const REPORT_FILE: &str = "stock_report.txt";

/// Template input holding the company name or ticker
pub const COMPANY_INPUT: &str = "company_stock";

/// Task names, in declaration order
pub mod stage {
    pub const DATA_COLLECTION: &str = "data_collection";
    pub const NEWS_READING: &str = "news_reading";
    pub const MARKET_RESEARCH: &str = "market_research";
    pub const FINANCIAL_ANALYSIS: &str = "financial_analysis";
}

const DATA_COLLECTOR: &str = "Stock Data Collector";
const NEWS_READER: &str = "News Reader";
const MARKET_RESEARCHER: &str = "Stock Market Researcher";
const FINANCIAL_ANALYST: &str = "Financial Analyst";
const PROJECT_MANAGER: &str = "Project Manager";

const MARKET_RESEARCH_DESCRIPTION: &str = "\
Conduct research on {{ company_stock }} focusing on these topics:
- General market trends effecting the company.
- Industry comparisons between competitors and recent events affecting the company.
- Risks and opportunities related to current market conditions.
Rules: Perform up to 3 different search queries per topic. Do not repeat the same queries \
if the result is not helpful. If the information is unavailable after the 3 attempts then \
skip to the next topic. IMPORTANT: If the website returns a cookie consent information \
prevents scraping content after 1 attempt then never search that website again.";

/// Which stages make up the report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ReportGraph {
    /// Four stages, coordinated by a manager
    #[default]
    Full,
    /// Three stages without market research, in declaration order
    Reduced,
}

impl ReportGraph {
    /// Agent definitions used by this graph
    pub fn agents(self) -> Vec<AgentSpec> {
        let mut agents = vec![
            AgentSpec::new(
                DATA_COLLECTOR,
                "Efficiently gather stock market data for financial analysis.",
                "A reliable financial data collector who has access to stock data APIs and tools.",
            )
            .with_tools(["stock_data", "stock_financials"])
            .max_iter(5),
            AgentSpec::new(
                NEWS_READER,
                "Find and summarize the latest news articles about the company.",
                "A diligent researcher who keeps an eye on the latest financial news and trends \
                 that impact stock performance.",
            )
            .with_tools(["stock_news", "web_search", "scrape_website"])
            .max_iter(5),
        ];

        if self == Self::Full {
            agents.push(
                AgentSpec::new(
                    MARKET_RESEARCHER,
                    "Research stock performance, market trends and industry movements to \
                     provide insights.",
                    "An experienced stock market researcher who gathers information from \
                     sources to offer insights about the performance of the company.",
                )
                .with_tools(["web_search", "scrape_website"])
                .max_iter(10)
                .max_execution_time(180)
                .max_retry_limit(2),
            );
        }

        agents.push(
            AgentSpec::new(
                FINANCIAL_ANALYST,
                "Analyze financial stock data and use information about the company to write \
                 a comprehensive stock analysis report.",
                "A skilled financial analyst who analyzes company data and provides detailed \
                 stock reports.",
            )
            .max_iter(5),
        );

        agents
    }

    /// Task definitions, templated on `company_stock`
    pub fn tasks(self) -> Vec<TaskSpec> {
        let mut tasks = vec![
            TaskSpec::new(
                stage::DATA_COLLECTION,
                "Collect key stock data metrics for {{ company_stock }} using its ticker format. \
                 Use only the data provided and do not request for more metrics.",
                "Data about most relevant financial metrics for stock analysis.",
                DATA_COLLECTOR,
            ),
            TaskSpec::new(
                stage::NEWS_READING,
                "Find the latest financial news for {{ company_stock }} and summarize the key \
                 points from recent articles.",
                "A summary of the most recent and relevant news articles about {{ company_stock }}.",
                NEWS_READER,
            ),
        ];
        let mut context = vec![stage::DATA_COLLECTION, stage::NEWS_READING];

        if self == Self::Full {
            tasks.push(TaskSpec::new(
                stage::MARKET_RESEARCH,
                MARKET_RESEARCH_DESCRIPTION,
                "A clear analysis of {{ company_stock }} covering market trends, industry \
                 comparisons, risks and opportunities.",
                MARKET_RESEARCHER,
            ));
            context.push(stage::MARKET_RESEARCH);
        }

        tasks.push(
            TaskSpec::new(
                stage::FINANCIAL_ANALYSIS,
                "Analyze the research on {{ company_stock }} and write a comprehensive stock \
                 analysis report.",
                "A detailed report that includes analysis of the stock data, financial insights, \
                 recent news and market information followed by the conclusion.",
                FINANCIAL_ANALYST,
            )
            .with_context(context)
            .output_file(REPORT_FILE),
        );

        tasks
    }

    /// Scheduling discipline for this graph
    pub fn process(self) -> Process {
        match self {
            Self::Full => Process::Hierarchical {
                manager: project_manager(),
            },
            Self::Reduced => Process::Sequential,
        }
    }
}

fn project_manager() -> AgentSpec {
    AgentSpec::new(
        PROJECT_MANAGER,
        "Coordinate the entire stock analysis workflow, ensuring that all agents complete \
         their tasks efficiently and that the final report is comprehensive and accurate.",
        "An expert project manager with a deep understanding of financial analysis and stock \
         market trends. You are responsible for managing the flow of tasks, ensuring data \
         collection, research and report writing are done in a coordinated manner. You must \
         make sure that no tasks are repeated and only use the information provided.",
    )
    .allow_delegation(true)
}

/// Register every report tool in `registry`
///
/// The three market data tools share one cache.
pub fn register_tools(
    registry: &ToolRegistry,
    market: Arc<dyn MarketDataProvider>,
    config: &ReportConfig,
) -> Result<()> {
    let fetcher = DataFetcher::new(
        market,
        FetchOptions {
            include_history: config.include_history,
        },
    );
    let cache = StockCache::new(config.cache_ttl);

    registry.register(Arc::new(StockDataTool::new(fetcher.clone(), cache.clone())));
    registry.register(Arc::new(StockFinancialsTool::new(
        fetcher.clone(),
        cache.clone(),
    )));
    registry.register(Arc::new(StockNewsTool::new(fetcher, cache)));
    registry.register(Arc::new(WebSearchTool::new(
        config.search_endpoint.clone(),
        config.request_timeout,
    )?));
    registry.register(Arc::new(ScrapeWebsiteTool::new(
        config.scrape_max_chars,
        config.request_timeout,
    )?));

    debug!(tools = registry.len(), "Report tools registered");
    Ok(())
}

/// Build the report crew on `runtime`
///
/// The runtime's registry must already hold the report tools.
pub fn build_crew(
    runtime: Arc<AgentRuntime>,
    config: &ReportConfig,
    events: Arc<dyn CrewEventHandler>,
) -> Result<Crew> {
    let graph = config.graph;
    info!(?graph, planning = config.planning, "Assembling report crew");

    let crew = Crew::builder(runtime)
        .agents(graph.agents())
        .tasks(graph.tasks())
        .process(graph.process())
        .planning(config.planning)
        .output_dir(&config.output_dir)
        .event_handler(events)
        .build()?;

    Ok(crew)
}
