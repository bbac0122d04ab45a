//! Markdown rendering.

use super::TransformError;
use markdown::Options;

/// Render GitHub-flavored markdown to HTML.
pub fn render(source: &str) -> Result<String, TransformError> {
    markdown::to_html_with_options(source, &Options::gfm())
        .map_err(|e| TransformError::Markdown(e.to_string()))
}
