//! Stock analysis report crew
//!
//! Four agents research a company and write a report:
//!
//! - a data collector reads key metrics, prices and financial statements
//!   from Yahoo Finance,
//! - a news reader summarizes recent headlines,
//! - a market researcher searches and scrapes the web,
//! - a financial analyst writes the final report.
//!
//! The report is converted to HTML and PDF and can be emailed as an
//! attachment.
//!
//! # Example
//!
//! ```rust,ignore
//! use stock_report::{ReportConfig, ReportPipeline};
//! use crew_llm::providers::OpenAIProvider;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let pipeline = ReportPipeline::builder(ReportConfig::from_env()?)
//!         .llm(Arc::new(OpenAIProvider::from_env()?))
//!         .build()?;
//!
//!     let outcome = pipeline.run("IBM", None).await?;
//!     println!("{}", outcome.crew.raw);
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod assembler;
pub mod cache;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod fetcher;
pub mod model;
pub mod pipeline;
pub mod report;
pub mod tools;

// Re-export main types for convenience
pub use api::{MarketDataProvider, YahooClient};
pub use assembler::{REPORT_FILE, ReportGraph, build_crew, register_tools};
pub use config::{EmailConfig, ReportConfig};
pub use dispatch::{DeliveryStatus, ReportDispatcher, ReportMailer};
pub use error::{ReportError, Result};
pub use fetcher::{DataFetcher, FetchOptions};
pub use pipeline::{EmailRequest, ReportOutcome, ReportPipeline};
pub use report::{CommandRenderer, DocumentRenderer, ReportConverter};
