//! page_scrape tool - visible text of a page, in bounded chunks

use scraper::{ElementRef, Html};
use serde_json::{json, Value};

use crate::error::ToolError;
use crate::tool_params;
use crate::tools::{require_url, BoxFuture, Tool, ToolOutput};

use super::fetch_html;

const SKIPPED_ELEMENTS: &[&str] = &["head", "script", "style", "noscript", "template", "svg"];

/// Elements that start a new text block; everything else is inline
const BLOCK_ELEMENTS: &[&str] = &[
    "html", "body", "p", "div", "section", "article", "header", "footer", "nav", "aside", "main",
    "h1", "h2", "h3", "h4", "h5", "h6", "ul", "ol", "li", "dl", "dt", "dd", "table", "thead",
    "tbody", "tfoot", "tr", "td", "th", "caption", "blockquote", "pre", "figure", "figcaption",
    "form", "fieldset", "address", "hr", "br",
];

#[derive(Default)]
struct BlockCollector {
    blocks: Vec<String>,
    current: String,
}

impl BlockCollector {
    fn flush(&mut self) {
        let normalized = self.current.split_whitespace().collect::<Vec<_>>().join(" ");
        if !normalized.is_empty() {
            self.blocks.push(normalized);
        }
        self.current.clear();
    }

    fn visit(&mut self, element: ElementRef<'_>) {
        for child in element.children() {
            if let Some(text) = child.value().as_text() {
                self.current.push_str(text);
                continue;
            }
            let Some(child) = ElementRef::wrap(child) else {
                continue;
            };
            let name = child.value().name();
            if SKIPPED_ELEMENTS.contains(&name) {
                continue;
            }
            if BLOCK_ELEMENTS.contains(&name) {
                self.flush();
                self.visit(child);
                self.flush();
            } else {
                self.visit(child);
            }
        }
    }
}

/// Visible text blocks of a document joined by blank lines
///
/// Inline markup stays inside its block, so `<p>a <b>b</b></p>` is one block.
pub fn extract_text(html: &str) -> String {
    let doc = Html::parse_document(html);

    let mut collector = BlockCollector::default();
    collector.visit(doc.root_element());
    collector.flush();

    collector.blocks.join("\n\n")
}

/// Split text into consecutive chunks of at most `size` characters
pub fn chunk_text(text: &str, size: usize) -> Vec<String> {
    if size == 0 {
        return vec![text.to_string()];
    }

    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(size)
        .map(|chunk| chunk.iter().collect())
        .collect()
}

/// Tool returning the text content of a page in chunks
pub struct PageScrapeTool {
    chunk_size: usize,
}

impl PageScrapeTool {
    pub fn new(chunk_size: usize) -> Self {
        Self { chunk_size }
    }
}

impl Tool for PageScrapeTool {
    fn name(&self) -> &str {
        "page_scrape"
    }

    fn description(&self) -> &str {
        "Scrapes the content of a URL."
    }

    fn parameters_schema(&self) -> Value {
        tool_params!(url: "string" => "The URL of the page to scrape")
    }

    fn execute(&self, params: Value) -> BoxFuture<'_, Result<ToolOutput, ToolError>> {
        Box::pin(async move {
            let url = require_url(&params)?;
            let html = fetch_html(&url).await?;
            let chunks = chunk_text(&extract_text(&html), self.chunk_size);
            Ok(ToolOutput::success(json!(chunks)))
        })
    }
}
