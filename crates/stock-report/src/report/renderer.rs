//! HTML to PDF through an external program

use super::temp_sibling;
use crate::error::{ReportError, Result};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::Path;
use tokio::process::Command;
use tracing::{debug, instrument, warn};

/// Turns an HTML file into a paginated document
#[async_trait]
pub trait DocumentRenderer: Send + Sync {
    /// Render `html` into `pdf`; on error nothing is left at `pdf`
    async fn render(&self, html: &Path, pdf: &Path) -> Result<()>;

    fn name(&self) -> &str;
}

/// Runs `<program> <args..> <input> <output>`
#[derive(Debug, Clone)]
pub struct CommandRenderer {
    program: String,
    args: Vec<String>,
}

impl CommandRenderer {
    /// `wkhtmltopdf --quiet --encoding utf-8`
    pub fn wkhtmltopdf() -> Self {
        Self::new("wkhtmltopdf").with_args(["--quiet", "--encoding", "utf-8"])
    }

    /// A renderer invoking `program` with no extra arguments
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Arguments placed before the input and output paths
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Renderer for a configured program name, `wkhtmltopdf` getting its usual flags
    pub fn for_program(program: &str) -> Self {
        if program == "wkhtmltopdf" {
            Self::wkhtmltopdf()
        } else {
            Self::new(program)
        }
    }
}

#[async_trait]
impl DocumentRenderer for CommandRenderer {
    #[instrument(skip(self), fields(program = %self.program))]
    async fn render(&self, html: &Path, pdf: &Path) -> Result<()> {
        let tmp = temp_sibling(pdf);
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(html)
            .arg(&tmp)
            .output()
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => {
                    ReportError::RendererError(format!("'{}' is not installed", self.program))
                }
                _ => ReportError::RendererError(format!("cannot run '{}': {e}", self.program)),
            })?;

        if !output.status.success() {
            let _ = tokio::fs::remove_file(&tmp).await;
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(status = %output.status, "Renderer failed");
            return Err(ReportError::RendererError(format!(
                "'{}' exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        tokio::fs::rename(&tmp, pdf).await?;
        debug!(pdf = %pdf.display(), "Rendered");
        Ok(())
    }

    fn name(&self) -> &str {
        &self.program
    }
}
