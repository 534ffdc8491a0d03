//! HTML to plain text for the web tools

use regex::Regex;

/// Strips markup from fetched pages
pub(crate) struct HtmlCleaner {
    blocks: Regex,
    comments: Regex,
    tags: Regex,
    whitespace: Regex,
}

impl HtmlCleaner {
    pub(crate) fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            blocks: Regex::new(r"(?is)<(script|style|noscript|head|svg)\b[^>]*>.*?</(script|style|noscript|head|svg)\s*>")?,
            comments: Regex::new(r"(?s)<!--.*?-->")?,
            tags: Regex::new(r"(?s)<[^>]*>")?,
            whitespace: Regex::new(r"\s+")?,
        })
    }

    /// Visible text with collapsed whitespace, at most `max_chars` characters
    pub(crate) fn text(&self, html: &str, max_chars: usize) -> String {
        let without_blocks = self.blocks.replace_all(html, " ");
        let without_comments = self.comments.replace_all(&without_blocks, " ");
        let without_tags = self.tags.replace_all(&without_comments, " ");
        let decoded = decode_entities(&without_tags);
        let collapsed = self.whitespace.replace_all(decoded.trim(), " ");

        truncate_chars(&collapsed, max_chars)
    }

    /// Tag-free inline text, used for link titles
    pub(crate) fn inline(&self, fragment: &str) -> String {
        let without_tags = self.tags.replace_all(fragment, "");
        let decoded = decode_entities(&without_tags);
        self.whitespace.replace_all(decoded.trim(), " ").into_owned()
    }
}

pub(crate) fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
