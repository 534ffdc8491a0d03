//! Configuration for the report pipeline
//!
//! Everything the pipeline reads from the environment is collected once into
//! a [`ReportConfig`] and handed to each component at construction.

use crate::assembler::ReportGraph;
use crate::error::{ReportError, Result};
use secrecy::SecretString;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";
const DEFAULT_SMTP_PORT: u16 = 465;
const DEFAULT_RENDERER: &str = "wkhtmltopdf";
const DEFAULT_SEARCH_ENDPOINT: &str = "https://html.duckduckgo.com/html/";

/// Mail submission settings
#[derive(Debug)]
pub struct EmailConfig {
    /// Sender address, also the SMTP username
    pub sender: String,
    /// Account credential
    pub password: SecretString,
    /// Implicit-TLS submission host
    pub smtp_host: String,
    /// Implicit-TLS submission port
    pub smtp_port: u16,
}

impl EmailConfig {
    /// Settings for `sender` on the default relay
    pub fn new(sender: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            password: SecretString::from(password.into()),
            smtp_host: DEFAULT_SMTP_HOST.to_string(),
            smtp_port: DEFAULT_SMTP_PORT,
        }
    }

    /// Use a different relay
    pub fn with_relay(mut self, host: impl Into<String>, port: u16) -> Self {
        self.smtp_host = host.into();
        self.smtp_port = port;
        self
    }
}

/// Configuration for one report run
#[derive(Debug)]
pub struct ReportConfig {
    /// Language model used by every agent
    pub model: String,

    /// Directory for `stock_report.txt`, `.html` and `.pdf`
    pub output_dir: PathBuf,

    /// Which task graph to run
    pub graph: ReportGraph,

    /// Draft a plan before the crew starts
    pub planning: bool,

    /// Append the trailing month of prices to `stock_data` output
    pub include_history: bool,

    /// Timeout for data provider and web requests
    pub request_timeout: Duration,

    /// How long tool results stay cached
    pub cache_ttl: Duration,

    /// HTML search endpoint for `web_search`
    pub search_endpoint: String,

    /// Maximum characters `scrape_website` returns
    pub scrape_max_chars: usize,

    /// HTML to PDF renderer command
    pub renderer: String,

    /// Mail settings, absent when no sender is configured
    pub email: Option<EmailConfig>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            output_dir: PathBuf::from("."),
            graph: ReportGraph::Full,
            planning: true,
            include_history: true,
            request_timeout: Duration::from_secs(30),
            cache_ttl: Duration::from_secs(300),
            search_endpoint: DEFAULT_SEARCH_ENDPOINT.to_string(),
            scrape_max_chars: 8000,
            renderer: DEFAULT_RENDERER.to_string(),
            email: None,
        }
    }
}

impl ReportConfig {
    /// Create a new configuration builder
    pub fn builder() -> ReportConfigBuilder {
        ReportConfigBuilder::default()
    }

    /// Read settings through `lookup`
    ///
    /// Recognised variables: `OPENAI_MODEL_NAME`, `SENDER_EMAIL`,
    /// `EMAIL_PASSWORD`, `SMTP_HOST`, `SMTP_PORT`, `PDF_RENDERER`. Mail
    /// settings are only present when both sender and password are set.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut builder = Self::builder();

        if let Some(model) = lookup("OPENAI_MODEL_NAME") {
            builder = builder.model(model);
        }
        if let Some(renderer) = lookup("PDF_RENDERER") {
            builder = builder.renderer(renderer);
        }

        if let (Some(sender), Some(password)) = (lookup("SENDER_EMAIL"), lookup("EMAIL_PASSWORD")) {
            let mut email = EmailConfig::new(sender, password);
            if let Some(host) = lookup("SMTP_HOST") {
                email.smtp_host = host;
            }
            if let Some(port) = lookup("SMTP_PORT") {
                email.smtp_port = port.parse().map_err(|_| {
                    ReportError::ConfigError(format!("SMTP_PORT is not a port number: {port}"))
                })?;
            }
            builder = builder.email(email);
        }

        builder.build()
    }

    /// Read settings from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(ReportError::ConfigError("model must not be empty".to_string()));
        }

        if self.request_timeout.is_zero() {
            return Err(ReportError::ConfigError(
                "request_timeout must be greater than 0".to_string(),
            ));
        }

        if self.scrape_max_chars == 0 {
            return Err(ReportError::ConfigError(
                "scrape_max_chars must be greater than 0".to_string(),
            ));
        }

        if self.renderer.trim().is_empty() {
            return Err(ReportError::ConfigError("renderer must not be empty".to_string()));
        }

        if let Some(email) = &self.email {
            if !email.sender.contains('@') {
                return Err(ReportError::ConfigError(format!(
                    "sender is not an email address: {}",
                    email.sender
                )));
            }
            if email.smtp_port == 0 {
                return Err(ReportError::ConfigError("smtp_port must not be 0".to_string()));
            }
        }

        Ok(())
    }

    /// Path of the assembled report
    pub fn report_path(&self) -> PathBuf {
        self.output_dir.join(crate::assembler::REPORT_FILE)
    }
}

/// Builder for ReportConfig
#[derive(Debug, Default)]
pub struct ReportConfigBuilder {
    model: Option<String>,
    output_dir: Option<PathBuf>,
    graph: Option<ReportGraph>,
    planning: Option<bool>,
    include_history: Option<bool>,
    request_timeout: Option<Duration>,
    cache_ttl: Option<Duration>,
    search_endpoint: Option<String>,
    scrape_max_chars: Option<usize>,
    renderer: Option<String>,
    email: Option<EmailConfig>,
}

impl ReportConfigBuilder {
    /// Set the model
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the output directory
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    /// Set the task graph variant
    pub fn graph(mut self, graph: ReportGraph) -> Self {
        self.graph = Some(graph);
        self
    }

    /// Enable or disable planning
    pub fn planning(mut self, planning: bool) -> Self {
        self.planning = Some(planning);
        self
    }

    /// Enable or disable price history in `stock_data`
    pub fn include_history(mut self, include: bool) -> Self {
        self.include_history = Some(include);
        self
    }

    /// Set request timeout
    pub fn request_timeout(mut self, duration: Duration) -> Self {
        self.request_timeout = Some(duration);
        self
    }

    /// Set cache TTL
    pub fn cache_ttl(mut self, duration: Duration) -> Self {
        self.cache_ttl = Some(duration);
        self
    }

    /// Set the HTML search endpoint
    pub fn search_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.search_endpoint = Some(endpoint.into());
        self
    }

    /// Set the scrape length limit
    pub fn scrape_max_chars(mut self, max: usize) -> Self {
        self.scrape_max_chars = Some(max);
        self
    }

    /// Set the renderer command
    pub fn renderer(mut self, renderer: impl Into<String>) -> Self {
        self.renderer = Some(renderer.into());
        self
    }

    /// Set mail settings
    pub fn email(mut self, email: EmailConfig) -> Self {
        self.email = Some(email);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<ReportConfig> {
        let defaults = ReportConfig::default();

        let config = ReportConfig {
            model: self.model.unwrap_or(defaults.model),
            output_dir: self.output_dir.unwrap_or(defaults.output_dir),
            graph: self.graph.unwrap_or(defaults.graph),
            planning: self.planning.unwrap_or(defaults.planning),
            include_history: self.include_history.unwrap_or(defaults.include_history),
            request_timeout: self.request_timeout.unwrap_or(defaults.request_timeout),
            cache_ttl: self.cache_ttl.unwrap_or(defaults.cache_ttl),
            search_endpoint: self.search_endpoint.unwrap_or(defaults.search_endpoint),
            scrape_max_chars: self.scrape_max_chars.unwrap_or(defaults.scrape_max_chars),
            renderer: self.renderer.unwrap_or(defaults.renderer),
            email: self.email,
        };

        config.validate()?;
        Ok(config)
    }
}
