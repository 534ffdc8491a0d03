//! Stock report CLI
//!
//! # Usage
//!
//! ```bash
//! export OPENAI_API_KEY="sk-..."
//! export OPENAI_MODEL_NAME="gpt-4o-mini"
//!
//! # Optional email delivery
//! export SENDER_EMAIL="me@gmail.com"
//! export EMAIL_PASSWORD="app-password"
//!
//! cargo run --bin stock-report -- IBM --email-to analyst@example.com
//! ```

use async_trait::async_trait;
use clap::Parser;
use crew_llm::providers::{OpenAIConfig, OpenAIProvider};
use crew_utils::LogFormat;
use crew_workflow::{CrewEventHandler, TaskOutput};
use serde_json::Value;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use stock_report::{
    DeliveryStatus, EmailRequest, ReportConfig, ReportError, ReportGraph, ReportPipeline,
};
use tracing::info;

const PREVIEW_CHARS: usize = 200;

#[derive(Parser, Debug)]
#[command(name = "stock-report")]
#[command(about = "Research a company and write a stock analysis report", long_about = None)]
struct Args {
    /// Company name or ticker; read from stdin when omitted
    ticker: Option<String>,

    /// Directory for stock_report.txt, .html and .pdf
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Which stages to run
    #[arg(long, value_enum, default_value_t = ReportGraph::Full)]
    graph: ReportGraph,

    /// Skip the planning step
    #[arg(long)]
    no_planning: bool,

    /// Leave the past month of prices out of the stock data
    #[arg(long)]
    no_history: bool,

    /// Email the PDF to this address
    #[arg(long)]
    email_to: Option<String>,

    /// Email subject
    #[arg(long, requires = "email_to")]
    subject: Option<String>,

    /// Log as JSON lines
    #[arg(long)]
    json_logs: bool,
}

/// Prints crew progress as it happens
struct TracePrinter;

#[async_trait]
impl CrewEventHandler for TracePrinter {
    async fn on_plan(&self, plan: &str) {
        println!("\n== Plan ==\n{plan}\n");
    }

    async fn on_task_start(&self, task: &str, agent: &str) {
        println!("\n== {task} ({agent}) ==");
    }

    async fn on_task_retry(&self, task: &str, attempt: usize, error: &str) {
        println!("   {task} attempt {attempt} failed, retrying: {error}");
    }

    async fn on_task_complete(&self, output: &TaskOutput) {
        println!("   done: {}", preview(&output.raw));
    }

    async fn on_tool_start(&self, _task: &str, tool: &str, input: &Value) {
        println!("   -> {tool} {input}");
    }

    async fn on_tool_done(
        &self,
        _task: &str,
        tool: &str,
        result: Result<&Value, &str>,
        duration_ms: u64,
    ) {
        match result {
            Ok(_) => println!("   <- {tool} ok ({duration_ms} ms)"),
            Err(e) => println!("   <- {tool} failed ({duration_ms} ms): {e}"),
        }
    }
}

fn preview(text: &str) -> String {
    let line = text.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
    let short: String = line.chars().take(PREVIEW_CHARS).collect();
    if short.len() < line.len() {
        format!("{short}...")
    } else {
        short
    }
}

fn read_ticker() -> io::Result<String> {
    print!("Enter company name or ticker: ");
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().lock().read_line(&mut input)?;
    Ok(input)
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    let format = if args.json_logs {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    };
    crew_utils::init_tracing_with(format, "warn,stock_report=info,crew_workflow=info");

    let ticker = match args.ticker {
        Some(ticker) => ticker,
        None => read_ticker()?,
    };
    let ticker = ticker.trim().to_string();
    if ticker.is_empty() {
        eprintln!("Please enter a company name or ticker.");
        return Ok(ExitCode::from(2));
    }

    let mut config = ReportConfig::from_env()?;
    config.output_dir = args.output_dir;
    config.graph = args.graph;
    config.planning = !args.no_planning;
    config.include_history = !args.no_history;

    let provider = Arc::new(OpenAIProvider::with_config(OpenAIConfig::from_env()?)?);
    info!(model = %config.model, graph = ?config.graph, "Starting stock report");

    let pipeline = ReportPipeline::builder(config)
        .llm(provider)
        .event_handler(Arc::new(TracePrinter))
        .build()?;

    let email = args.email_to.map(|receiver| EmailRequest {
        subject: args.subject,
        ..EmailRequest::to(receiver)
    });

    let outcome = match pipeline.run(&ticker, email.as_ref()).await {
        Ok(outcome) => outcome,
        Err(ReportError::InvalidTicker(msg)) => {
            eprintln!("{msg}");
            return Ok(ExitCode::from(2));
        }
        Err(e) => return Err(e.into()),
    };

    println!("\n== Report ==\n{}\n", outcome.crew.raw);
    println!("Report: {}", outcome.report.display());
    println!("HTML:   {}", outcome.converted.html.display());
    println!("PDF:    {}", outcome.converted.pdf.display());

    let usage = &outcome.crew.token_usage;
    println!(
        "Tokens: {} prompt + {} completion = {} ({} requests)",
        usage.prompt_tokens,
        usage.completion_tokens,
        usage.total_tokens(),
        usage.successful_requests
    );

    match outcome.delivery {
        Some(DeliveryStatus::Delivered) => println!("Email sent successfully."),
        Some(status @ DeliveryStatus::Failed(_)) => println!("{status}"),
        None => {}
    }

    Ok(ExitCode::SUCCESS)
}
