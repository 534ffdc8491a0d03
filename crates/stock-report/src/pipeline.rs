//! One report run, end to end
//!
//! ticker -> crew -> `stock_report.txt` -> HTML -> PDF -> optional email

use crate::api::{MarketDataProvider, YahooClient};
use crate::assembler::{self, COMPANY_INPUT};
use crate::config::ReportConfig;
use crate::dispatch::{DeliveryStatus, ReportDispatcher, ReportMailer};
use crate::error::{ReportError, Result};
use crate::report::{CommandRenderer, ConvertedReport, DocumentRenderer, ReportConverter};
use crew_llm::LLMProvider;
use crew_runtime::AgentRuntime;
use crew_workflow::{CrewEventHandler, CrewOutput, NoOpCrewEventHandler};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Where and how to email the finished report
#[derive(Debug, Clone)]
pub struct EmailRequest {
    pub receiver: String,
    pub subject: Option<String>,
    pub body: Option<String>,
}

impl EmailRequest {
    pub fn to(receiver: impl Into<String>) -> Self {
        Self {
            receiver: receiver.into(),
            subject: None,
            body: None,
        }
    }
}

/// Everything a run produced
#[derive(Debug, Clone)]
pub struct ReportOutcome {
    pub ticker: String,
    pub crew: CrewOutput,
    pub report: PathBuf,
    pub converted: ConvertedReport,
    /// `None` when no email was requested
    pub delivery: Option<DeliveryStatus>,
}

/// Runs the report crew and post-processes its output
pub struct ReportPipeline {
    config: ReportConfig,
    llm: Arc<dyn LLMProvider>,
    market: Arc<dyn MarketDataProvider>,
    converter: ReportConverter,
    mailer: Option<Arc<dyn ReportMailer>>,
    events: Arc<dyn CrewEventHandler>,
}

impl ReportPipeline {
    pub fn builder(config: ReportConfig) -> ReportPipelineBuilder {
        ReportPipelineBuilder::new(config)
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    /// Produce the report for `ticker`, emailing it if `email` is given
    ///
    /// Only surrounding whitespace is removed from the ticker. An empty
    /// ticker fails before any agent runs. Delivery problems are reported in
    /// [`ReportOutcome::delivery`], never as an error.
    #[instrument(skip(self, email))]
    pub async fn run(&self, ticker: &str, email: Option<&EmailRequest>) -> Result<ReportOutcome> {
        let ticker = ticker.trim();
        if ticker.is_empty() {
            return Err(ReportError::InvalidTicker(
                "please enter a company name or ticker".to_string(),
            ));
        }

        let runtime = AgentRuntime::builder()
            .provider(self.llm.clone())
            .default_model(&self.config.model)
            .build()?;
        assembler::register_tools(runtime.tools(), self.market.clone(), &self.config)?;
        let crew = assembler::build_crew(Arc::new(runtime), &self.config, self.events.clone())?;

        let crew_output = crew.kickoff([(COMPANY_INPUT, ticker)]).await?;
        info!(
            tasks = crew_output.tasks_output.len(),
            total_tokens = crew_output.token_usage.total_tokens(),
            "Report written"
        );

        let report = self.config.report_path();
        let converted = self.converter.convert(&report).await?;

        let delivery = match email {
            Some(request) => Some(self.deliver(ticker, request, &converted).await),
            None => None,
        };

        Ok(ReportOutcome {
            ticker: ticker.to_string(),
            crew: crew_output,
            report,
            converted,
            delivery,
        })
    }

    async fn deliver(
        &self,
        ticker: &str,
        request: &EmailRequest,
        converted: &ConvertedReport,
    ) -> DeliveryStatus {
        let Some(mailer) = &self.mailer else {
            warn!("Email requested but no sender is configured");
            return DeliveryStatus::Failed(
                "no sender configured (set SENDER_EMAIL and EMAIL_PASSWORD)".to_string(),
            );
        };

        let subject = request
            .subject
            .clone()
            .unwrap_or_else(|| format!("Stock Analysis Report: {ticker}"));
        let body = request.body.clone().unwrap_or_else(|| {
            format!("Please find attached the stock analysis report for {ticker}.")
        });

        mailer
            .send(&request.receiver, &subject, &body, &converted.pdf)
            .await
    }
}

/// Builder for [`ReportPipeline`]
///
/// Only the LLM provider is required. Market data defaults to Yahoo
/// Finance, rendering to the configured program, and mail to SMTP when the
/// configuration carries a sender.
pub struct ReportPipelineBuilder {
    config: ReportConfig,
    llm: Option<Arc<dyn LLMProvider>>,
    market: Option<Arc<dyn MarketDataProvider>>,
    renderer: Option<Arc<dyn DocumentRenderer>>,
    mailer: Option<Arc<dyn ReportMailer>>,
    events: Option<Arc<dyn CrewEventHandler>>,
}

impl ReportPipelineBuilder {
    pub fn new(config: ReportConfig) -> Self {
        Self {
            config,
            llm: None,
            market: None,
            renderer: None,
            mailer: None,
            events: None,
        }
    }

    pub fn llm(mut self, llm: Arc<dyn LLMProvider>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn market(mut self, market: Arc<dyn MarketDataProvider>) -> Self {
        self.market = Some(market);
        self
    }

    pub fn renderer(mut self, renderer: Arc<dyn DocumentRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn mailer(mut self, mailer: Arc<dyn ReportMailer>) -> Self {
        self.mailer = Some(mailer);
        self
    }

    pub fn event_handler(mut self, events: Arc<dyn CrewEventHandler>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn build(self) -> Result<ReportPipeline> {
        self.config.validate()?;

        let llm = self
            .llm
            .ok_or_else(|| ReportError::ConfigError("LLM provider not set".to_string()))?;

        let market = match self.market {
            Some(market) => market,
            None => Arc::new(YahooClient::new(self.config.request_timeout)?),
        };

        let renderer = self
            .renderer
            .unwrap_or_else(|| Arc::new(CommandRenderer::for_program(&self.config.renderer)));

        let mailer = match (self.mailer, &self.config.email) {
            (Some(mailer), _) => Some(mailer),
            (None, Some(email)) => {
                Some(Arc::new(ReportDispatcher::smtp(email)?) as Arc<dyn ReportMailer>)
            }
            (None, None) => None,
        };

        Ok(ReportPipeline {
            config: self.config,
            llm,
            market,
            converter: ReportConverter::new(renderer),
            mailer,
            events: self
                .events
                .unwrap_or_else(|| Arc::new(NoOpCrewEventHandler)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockMarketDataProvider;
    use crate::assembler::ReportGraph;
    use crew_llm::testing::ScriptedProvider;

    fn config(dir: &std::path::Path) -> ReportConfig {
        ReportConfig::builder()
            .graph(ReportGraph::Reduced)
            .planning(false)
            .output_dir(dir)
            .build()
            .unwrap()
    }

    #[test]
    fn test_build_requires_llm() {
        let dir = tempfile::tempdir().unwrap();
        let result = ReportPipeline::builder(config(dir.path()))
            .market(Arc::new(MockMarketDataProvider::new()))
            .build();
        assert!(matches!(result, Err(ReportError::ConfigError(_))));
    }

    #[tokio::test]
    async fn test_empty_ticker_rejected_before_any_request() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(ScriptedProvider::new([]));
        let pipeline = ReportPipeline::builder(config(dir.path()))
            .llm(provider.clone())
            .market(Arc::new(MockMarketDataProvider::new()))
            .build()
            .unwrap();

        let result = pipeline.run("   ", None).await;

        assert!(matches!(result, Err(ReportError::InvalidTicker(_))));
        assert!(provider.requests().is_empty());
        assert!(!pipeline.config().report_path().exists());
    }

    #[tokio::test]
    async fn test_email_without_sender_is_failed_status() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = ReportPipeline::builder(config(dir.path()))
            .llm(Arc::new(ScriptedProvider::new([])))
            .market(Arc::new(MockMarketDataProvider::new()))
            .build()
            .unwrap();
        let converted = ConvertedReport {
            html: dir.path().join("stock_report.html"),
            pdf: dir.path().join("stock_report.pdf"),
        };

        let status = pipeline
            .deliver("IBM", &EmailRequest::to("me@example.com"), &converted)
            .await;

        assert!(matches!(status, DeliveryStatus::Failed(reason) if reason.contains("SENDER_EMAIL")));
    }
}
