//! Browser automation tools

mod screenshot;

pub use screenshot::{fit_scale, screenshot_slug, slugify, PageScreenshotTool};
