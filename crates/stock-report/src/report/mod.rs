//! Report post-processing: Markdown to HTML to PDF

pub mod converter;
pub mod renderer;

pub use converter::{ConvertedReport, ReportConverter, markdown_to_html};
pub use renderer::{CommandRenderer, DocumentRenderer};

use crate::error::Result;
use std::path::{Path, PathBuf};

/// Write `contents` to a sibling temp file, then rename it over `path`
pub(crate) async fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let tmp = temp_sibling(path);
    if let Err(e) = tokio::fs::write(&tmp, contents).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    Ok(())
}

/// `dir/.name.tmp` for `dir/name`
pub(crate) fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map_or_else(|| "report".into(), |n| n.to_string_lossy().into_owned());
    path.with_file_name(format!(".{name}.tmp"))
}
