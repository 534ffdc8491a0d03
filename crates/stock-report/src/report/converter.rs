//! Markdown report to HTML and PDF

use super::renderer::DocumentRenderer;
use super::write_atomic;
use crate::error::{ReportError, Result};
use pulldown_cmark::{Options, Parser, html};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, instrument};

const HTML_HEAD: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>Stock Analysis Report</title>
<style>
body { font-family: Helvetica, Arial, sans-serif; margin: 2em; line-height: 1.5; }
table { border-collapse: collapse; }
th, td { border: 1px solid #999; padding: 4px 8px; }
</style>
</head>
<body>
"#;

const HTML_TAIL: &str = "</body>\n</html>\n";

/// Render Markdown as a complete HTML document
///
/// Tables and strikethrough are enabled. The output depends only on the input.
pub fn markdown_to_html(markdown: &str) -> String {
    let parser = Parser::new_ext(
        markdown,
        Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH,
    );

    let mut document = String::from(HTML_HEAD);
    html::push_html(&mut document, parser);
    document.push_str(HTML_TAIL);
    document
}

/// Paths written by a conversion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertedReport {
    pub html: PathBuf,
    pub pdf: PathBuf,
}

/// Turns the report text into HTML and PDF next to it
pub struct ReportConverter {
    renderer: Arc<dyn DocumentRenderer>,
}

impl ReportConverter {
    pub fn new(renderer: Arc<dyn DocumentRenderer>) -> Self {
        Self { renderer }
    }

    /// Convert `source` to `<stem>.html`, then to `<stem>.pdf`
    ///
    /// A missing source writes nothing. A renderer failure leaves the HTML
    /// in place and writes no PDF.
    #[instrument(skip(self), fields(source = %source.display()))]
    pub async fn convert(&self, source: &Path) -> Result<ConvertedReport> {
        let html = self.to_html(source).await?;
        let pdf = source.with_extension("pdf");
        self.renderer.render(&html, &pdf).await?;

        info!(pdf = %pdf.display(), renderer = self.renderer.name(), "PDF written");
        Ok(ConvertedReport { html, pdf })
    }

    /// Convert `source` to `<stem>.html` only
    pub async fn to_html(&self, source: &Path) -> Result<PathBuf> {
        let markdown = tokio::fs::read_to_string(source).await.map_err(|e| {
            ReportError::ConversionError(format!("cannot read {}: {e}", source.display()))
        })?;

        let html_path = source.with_extension("html");
        write_atomic(&html_path, markdown_to_html(&markdown).as_bytes()).await?;

        info!(html = %html_path.display(), bytes = markdown.len(), "HTML written");
        Ok(html_path)
    }
}
