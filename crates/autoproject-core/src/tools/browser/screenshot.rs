//! page_screenshot tool
//!
//! Captures a full-page screenshot in headless Chromium and stores it under
//! the configured screenshot directory, named after the page's site name.
//! The capture is scaled so it fits `max_long_edge x max_short_edge` in its
//! own orientation.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{json, Value};

use crate::config::BrowserConfig;
use crate::error::ToolError;
use crate::tool_params;
use crate::tools::web::{fetch_metadata, PageMetadata};
use crate::tools::{require_url, BoxFuture, Tool, ToolOutput};

static NON_SLUG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("static slug pattern"));

/// Lowercase ASCII slug with single dashes between words
pub fn slugify(text: &str) -> String {
    NON_SLUG
        .replace_all(&text.to_lowercase(), "-")
        .trim_matches('-')
        .to_string()
}

/// File stem for a page's screenshot: site name, then title, then host
pub fn screenshot_slug(metadata: &PageMetadata, url: &url::Url) -> String {
    [
        metadata.site_name.as_str(),
        metadata.title.as_str(),
        url.host_str().unwrap_or_default(),
    ]
    .iter()
    .map(|candidate| slugify(candidate))
    .find(|slug| !slug.is_empty())
    .unwrap_or_else(|| "screenshot".to_string())
}

/// Scale factor that fits `width x height` within the bounds for its
/// orientation. Never upscales.
pub fn fit_scale(width: f64, height: f64, max_long_edge: u32, max_short_edge: u32) -> f64 {
    if width <= 0.0 || height <= 0.0 {
        return 1.0;
    }

    let (max_width, max_height) = if width > height {
        (max_long_edge, max_short_edge)
    } else {
        (max_short_edge, max_long_edge)
    };

    (f64::from(max_width) / width)
        .min(f64::from(max_height) / height)
        .min(1.0)
}

/// Script returning the full document size as `[width, height]`
#[cfg(feature = "browser")]
const MEASURE_SCRIPT: &str =
    "[document.documentElement.scrollWidth, document.documentElement.scrollHeight]";

/// Parse the `[width, height]` pair produced by the page measurement script
pub fn page_dimensions(value: &Value) -> Result<(f64, f64), ToolError> {
    let invalid = || ToolError::ExecutionFailed(format!("Unexpected page size: {}", value));

    match value.as_array().map(Vec::as_slice) {
        Some([width, height]) => {
            let width = width.as_f64().ok_or_else(invalid)?;
            let height = height.as_f64().ok_or_else(invalid)?;
            Ok((width, height))
        }
        _ => Err(invalid()),
    }
}

/// Tool for screenshotting a URL
pub struct PageScreenshotTool {
    config: BrowserConfig,
}

impl PageScreenshotTool {
    pub fn new(config: BrowserConfig) -> Self {
        Self { config }
    }

    fn output_path(&self, slug: &str) -> PathBuf {
        self.config.screenshot_dir.join(format!("{}.png", slug))
    }

    #[cfg(feature = "browser")]
    async fn capture(&self, url: &url::Url, path: &Path) -> Result<(), ToolError> {
        use std::time::Duration;

        use chromiumoxide::browser::{Browser, BrowserConfig as ChromeConfig};
        use futures::StreamExt;

        let mut builder =
            ChromeConfig::builder().request_timeout(Duration::from_secs(self.config.timeout_secs));
        if !self.config.headless {
            builder = builder.with_head();
        }
        let chrome_config = builder.build().map_err(ToolError::ExecutionFailed)?;

        let (mut browser, mut handler) = Browser::launch(chrome_config)
            .await
            .map_err(|e| ToolError::ExecutionFailed(format!("Failed to launch browser: {}", e)))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let captured = self.capture_page(&browser, url).await;
        let closed = browser.close().await;
        handler_task.abort();

        let png = captured?;
        closed.map_err(|e| ToolError::ExecutionFailed(format!("Failed to close browser: {}", e)))?;

        tokio::fs::write(path, &png).await?;
        tracing::debug!("Saved {} byte screenshot of {} to {}", png.len(), url, path.display());
        Ok(())
    }

    #[cfg(feature = "browser")]
    async fn capture_page(
        &self,
        browser: &chromiumoxide::Browser,
        url: &url::Url,
    ) -> Result<Vec<u8>, ToolError> {
        use chromiumoxide::cdp::browser_protocol::page::{CaptureScreenshotFormat, Viewport};
        use chromiumoxide::page::ScreenshotParams;

        let failed = |what: &str, e: chromiumoxide::error::CdpError| {
            ToolError::ExecutionFailed(format!("{}: {}", what, e))
        };

        let page = browser
            .new_page(url.as_str())
            .await
            .map_err(|e| failed("Failed to open page", e))?;
        page.wait_for_navigation()
            .await
            .map_err(|e| failed("Navigation failed", e))?;

        let measured: Value = page
            .evaluate(MEASURE_SCRIPT)
            .await
            .map_err(|e| failed("Failed to measure page", e))?
            .into_value()
            .map_err(|e| ToolError::ExecutionFailed(format!("Failed to read page size: {}", e)))?;
        let (width, height) = page_dimensions(&measured)?;

        let scale = fit_scale(width, height, self.config.max_long_edge, self.config.max_short_edge);

        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .capture_beyond_viewport(true)
            .clip(Viewport {
                x: 0.0,
                y: 0.0,
                width,
                height,
                scale,
            })
            .build();

        page.screenshot(params)
            .await
            .map_err(|e| failed("Screenshot failed", e))
    }

    #[cfg(not(feature = "browser"))]
    async fn capture(&self, _url: &url::Url, _path: &Path) -> Result<(), ToolError> {
        Err(ToolError::ExecutionFailed(
            "Screenshots need the `browser` feature".into(),
        ))
    }
}

impl Tool for PageScreenshotTool {
    fn name(&self) -> &str {
        "page_screenshot"
    }

    fn description(&self) -> &str {
        "Creates a screenshot of a URL."
    }

    fn parameters_schema(&self) -> Value {
        tool_params!(url: "string" => "The URL of the page to capture")
    }

    fn execute(&self, params: Value) -> BoxFuture<'_, Result<ToolOutput, ToolError>> {
        Box::pin(async move {
            let url = require_url(&params)?;
            let metadata = fetch_metadata(&url).await?;
            let path = self.output_path(&screenshot_slug(&metadata, &url));

            tokio::fs::create_dir_all(&self.config.screenshot_dir).await?;
            self.capture(&url, &path).await?;

            Ok(ToolOutput::success(json!(path.display().to_string())))
        })
    }
}
